//! Concurrency tests for the version coordinator.
//!
//! These run against a file-backed `SQLite` database in WAL mode so that
//! several pooled connections contend for the same rows.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    clippy::arithmetic_side_effects,
    clippy::panic
)]

use std::collections::HashSet;
use std::time::Duration;

use strata_db::{Database, DatabaseConfig, IdAllocator, PersonService, RetryPolicy, StoreError};
use strata_types::{PersonFields, PersonId, PersonPatch, Version};
use tempfile::TempDir;

async fn open_file_db(dir: &TempDir) -> Database {
    let path = dir.path().join("strata.db");
    let url = format!("sqlite://{}", path.display());
    let config = DatabaseConfig::new(&url).with_max_connections(4);

    let db = Database::connect(&config)
        .await
        .expect("Failed to open file-backed SQLite");
    db.run_migrations().await.expect("Failed to run migrations");
    db
}

async fn setup_file_db(dir: &TempDir) -> (Database, PersonService) {
    let db = open_file_db(dir).await;
    let service =
        PersonService::new(&db).with_retry_policy(RetryPolicy::new(100, Duration::from_millis(1)));
    (db, service)
}

fn fields(first_name: &str, age: i64) -> PersonFields {
    PersonFields {
        first_name: first_name.to_owned(),
        middle_name: None,
        last_name: String::from("L"),
        email: String::from("e@x"),
        age,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_overwrites_both_land() {
    let dir = TempDir::new().unwrap();
    let (_db, service) = setup_file_db(&dir).await;

    let id = service.create(&fields("Start", 1)).await.unwrap();

    let handles: Vec<_> = ["A", "B"]
        .into_iter()
        .map(|name| {
            let service = service.clone();
            tokio::spawn(async move { service.overwrite(id, &fields(name, 2)).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let person = service.read(id).await.unwrap();
    assert_eq!(person.version, Version::new(3));

    let v2 = service.read_version(id, Version::new(2)).await.unwrap();
    let v3 = service.read_version(id, Version::new(3)).await.unwrap();
    let names: HashSet<String> = [v2.fields.first_name, v3.fields.first_name.clone()]
        .into_iter()
        .collect();
    assert_eq!(names, HashSet::from([String::from("A"), String::from("B")]));
    assert_eq!(person.fields.first_name, v3.fields.first_name);

    let report = service.verify_history(id).await.unwrap();
    assert_eq!(report.snapshot_count, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_updates_produce_contiguous_versions() {
    let dir = TempDir::new().unwrap();
    let (_db, service) = setup_file_db(&dir).await;

    let id = service.create(&fields("E", 0)).await.unwrap();

    let tasks = 4_i64;
    let per_task = 5_i64;
    let handles: Vec<_> = (0..tasks)
        .map(|task| {
            let service = service.clone();
            tokio::spawn(async move {
                for n in 0..per_task {
                    let patch = PersonPatch {
                        age: Some(task * 100 + n),
                        ..PersonPatch::default()
                    };
                    service.update(id, &patch).await?;
                }
                Ok::<_, StoreError>(())
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let expected = Version::new(1 + tasks * per_task);
    let person = service.read(id).await.unwrap();
    assert_eq!(person.version, expected);

    let report = service.verify_history(id).await.unwrap();
    assert_eq!(report.latest_version, Some(expected));
    assert_eq!(report.live_version, Some(expected));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn default_policy_absorbs_contention_on_one_person() {
    let dir = TempDir::new().unwrap();
    let db = open_file_db(&dir).await;
    let service = PersonService::new(&db);

    let id = service.create(&fields("E", 0)).await.unwrap();

    let writers = 16_i64;
    let handles: Vec<_> = (0..writers)
        .map(|age| {
            let service = service.clone();
            tokio::spawn(async move {
                let patch = PersonPatch {
                    age: Some(age),
                    ..PersonPatch::default()
                };
                service.update(id, &patch).await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let expected = Version::new(1 + writers);
    assert_eq!(service.read(id).await.unwrap().version, expected);

    let report = service.verify_history(id).await.unwrap();
    assert_eq!(report.latest_version, Some(expected));
    assert_eq!(report.snapshot_count, 17);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_get_distinct_ids() {
    let dir = TempDir::new().unwrap();
    let (db, service) = setup_file_db(&dir).await;

    let handles: Vec<_> = (0..4)
        .map(|task| {
            let service = service.clone();
            tokio::spawn(async move {
                let mut ids = Vec::new();
                for n in 0..5 {
                    ids.push(service.create(&fields(&format!("T{task}-{n}"), n)).await?);
                }
                Ok::<_, StoreError>(ids)
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for handle in handles {
        for id in handle.await.unwrap().unwrap() {
            assert!(ids.insert(id), "id {id} allocated twice");
        }
    }

    let expected: HashSet<PersonId> = (1..=20).map(PersonId::new).collect();
    assert_eq!(ids, expected);
    assert_eq!(
        IdAllocator::new(db.pool()).high_water_mark().await.unwrap(),
        PersonId::new(20)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn update_racing_delete_never_resurrects() {
    let dir = TempDir::new().unwrap();
    let (_db, service) = setup_file_db(&dir).await;

    let id = service.create(&fields("E", 0)).await.unwrap();

    let updater = {
        let service = service.clone();
        tokio::spawn(async move {
            let patch = PersonPatch {
                age: Some(1),
                ..PersonPatch::default()
            };
            service.update(id, &patch).await
        })
    };
    let deleter = {
        let service = service.clone();
        tokio::spawn(async move { service.delete(id).await })
    };

    deleter.await.unwrap().unwrap();
    // Either the update landed before the delete or it saw no live row.
    match updater.await.unwrap() {
        Ok(()) | Err(StoreError::PersonNotFound(_)) => {}
        Err(other) => panic!("update failed unexpectedly: {other}"),
    }

    assert!(service.read(id).await.is_err());
    let report = service.verify_history(id).await.unwrap();
    assert_eq!(report.live_version, None);
    assert!(report.snapshot_count == 1 || report.snapshot_count == 2);
}
