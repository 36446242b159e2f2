// Multi-threaded tests for per-table serialization through one shared Store.
use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;

use flatstore::api::{Durability, ErrorKind, Predicate, Record, Store, StoreConfig};

fn shared_store(dir: &std::path::Path) -> Store {
    Store::new(StoreConfig::new(dir.join("csv")).with_durability(Durability::Fast))
}

#[test]
fn concurrent_creates_are_all_kept() {
    let temp = tempfile::tempdir().expect("tempdir");
    let store = shared_store(temp.path());
    let threads = 8;
    let per_thread = 25;
    let barrier = Arc::new(Barrier::new(threads));

    let handles = (0..threads)
        .map(|t| {
            let store = store.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..per_thread {
                    let id = format!("T{t}-{i}");
                    store
                        .create("events", &Record::new().with("id", id).with("thread", t as i64))
                        .expect("create");
                }
            })
        })
        .collect::<Vec<_>>();
    for handle in handles {
        handle.join().expect("join");
    }

    let rows = store.read_all("events").expect("read_all");
    assert_eq!(rows.len(), threads * per_thread);
    let ids = rows
        .iter()
        .map(|row| row.value("id").to_text().into_owned())
        .collect::<HashSet<_>>();
    assert_eq!(ids.len(), threads * per_thread);
}

#[test]
fn concurrent_increments_are_not_lost() {
    let temp = tempfile::tempdir().expect("tempdir");
    let store = shared_store(temp.path());
    store
        .create("users", &Record::new().with("id", "U1").with("xp", 0))
        .expect("create");

    let barrier = Arc::new(Barrier::new(2));
    let handles = (0..2)
        .map(|_| {
            let store = store.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..100 {
                    store
                        .increment_field("users", "U1", "id", "xp", 1)
                        .expect("incr");
                }
            })
        })
        .collect::<Vec<_>>();
    for handle in handles {
        handle.join().expect("join");
    }

    let row = store.read_by_id("users", "U1", "id").expect("read").expect("row");
    assert_eq!(row.value("xp").as_i64(), Some(200));
}

#[test]
fn generated_ids_are_unique_under_contention() {
    let temp = tempfile::tempdir().expect("tempdir");
    let store = shared_store(temp.path());
    let threads = 6;
    let per_thread = 10;
    let barrier = Arc::new(Barrier::new(threads));

    let handles = (0..threads)
        .map(|t| {
            let store = store.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                (0..per_thread)
                    .map(|_| {
                        store
                            .create_with_generated_id(
                                "scores",
                                "SCR",
                                "score_id",
                                &Record::new().with("thread", t as i64),
                            )
                            .expect("insert")
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect::<Vec<_>>();

    let mut seen = HashSet::new();
    for handle in handles {
        for generated in handle.join().expect("join") {
            assert!(!generated.is_fallback());
            assert!(seen.insert(generated.id));
        }
    }
    assert_eq!(seen.len(), threads * per_thread);
    assert!(seen.contains("SCR001"));
    assert!(seen.contains(&format!("SCR{:03}", threads * per_thread)));
}

#[test]
fn mixed_mutations_leave_a_consistent_table() {
    let temp = tempfile::tempdir().expect("tempdir");
    let store = shared_store(temp.path());
    for i in 0..40 {
        store
            .create(
                "jobs",
                &Record::new()
                    .with("id", format!("J{i:02}"))
                    .with("state", "queued"),
            )
            .expect("seed");
    }

    let barrier = Arc::new(Barrier::new(3));
    let updater = {
        let store = store.clone();
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            for i in (0..40).step_by(2) {
                store
                    .update_by_id(
                        "jobs",
                        format!("J{i:02}"),
                        &Record::new().with("state", "done"),
                        "id",
                    )
                    .expect("update");
            }
        })
    };
    let deleter = {
        let store = store.clone();
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            for i in (1..40).step_by(2) {
                store.delete_by_id("jobs", format!("J{i:02}"), "id").expect("delete");
            }
        })
    };
    let reader = {
        let store = store.clone();
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            for _ in 0..20 {
                let rows = store.read_all("jobs").expect("read never sees a torn file");
                assert!(rows.len() >= 20 && rows.len() <= 40);
            }
        })
    };
    for handle in [updater, deleter, reader] {
        handle.join().expect("join");
    }

    assert_eq!(store.count("jobs", &Predicate::any()).expect("count"), 20);
    assert_eq!(
        store
            .count("jobs", &Predicate::eq("state", "done"))
            .expect("count"),
        20
    );
    let err = store.delete_by_id("jobs", "J01", "id").expect_err("gone");
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn separate_tables_do_not_share_a_lock() {
    let temp = tempfile::tempdir().expect("tempdir");
    let store = shared_store(temp.path());
    let users = store.locks().get_lock("users");
    let _held = users.lock();

    // Another thread can still work on a different table while `users` is held.
    let other = store.clone();
    let handle = thread::spawn(move || {
        other
            .create("scores", &Record::new().with("id", "S1"))
            .expect("create");
        other.count("scores", &Predicate::any()).expect("count")
    });
    assert_eq!(handle.join().expect("join"), 1);
}
