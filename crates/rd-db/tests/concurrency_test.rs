//! Deletes racing a live writer on a file-backed database.

use rd_core::Admin;
use rd_core::events::EventRepository;
use rd_core::ids::IdSelection;
use rd_core::store::Store;
use rd_core::types::{EventFilter, NewEvent};
use rd_db::{DbStore, schema};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

fn open(path: &Path) -> DbStore {
    DbStore::open(path.to_str().unwrap(), schema::DEFAULT_BUSY_TIMEOUT).unwrap()
}

fn spawn_writer(path: &Path, stop: Arc<AtomicBool>) -> thread::JoinHandle<usize> {
    let path = path.to_path_buf();
    thread::spawn(move || {
        let store = open(&path);
        let mut inserted = 0;
        while !stop.load(Ordering::SeqCst) {
            store
                .events()
                .append(NewEvent::new("POST", "/live").client_ip("10.0.0.9"))
                .unwrap();
            inserted += 1;
            thread::sleep(Duration::from_millis(1));
        }
        inserted
    })
}

fn count(store: &DbStore) -> usize {
    store.events().list(&EventFilter::default(), rd_core::types::Order::OldestFirst).unwrap().len()
}

#[test]
fn delete_of_listed_rows_removes_exactly_those_under_concurrent_append() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.db");
    let admin = Admin::new(open(&path));
    for _ in 0..50 {
        admin.events().append(NewEvent::new("GET", "/seed")).unwrap();
    }

    let stop = Arc::new(AtomicBool::new(false));
    let writer = spawn_writer(&path, Arc::clone(&stop));
    thread::sleep(Duration::from_millis(20));

    let listed = admin
        .events()
        .list(&EventFilter {
            limit: Some(20),
            ..EventFilter::default()
        })
        .unwrap();
    let mut listed_ids: Vec<i64> = listed.iter().map(|event| event.id).collect();
    let deleted = admin
        .events()
        .delete(&IdSelection::Ids(listed_ids.clone()))
        .unwrap();

    thread::sleep(Duration::from_millis(20));
    stop.store(true, Ordering::SeqCst);
    let inserted = writer.join().unwrap();

    listed_ids.sort_unstable();
    let deleted_ids: Vec<i64> = deleted.iter().map(|event| event.id).collect();
    assert_eq!(deleted_ids, listed_ids);
    for id in &deleted_ids {
        assert_eq!(admin.store().events().get(*id).unwrap(), None);
    }
    assert_eq!(count(admin.store()), 50 + inserted - 20);
}

#[test]
fn range_delete_accounts_for_every_row_it_reports() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.db");
    let admin = Admin::new(open(&path));
    for _ in 0..10 {
        admin.events().append(NewEvent::new("GET", "/seed")).unwrap();
    }

    let stop = Arc::new(AtomicBool::new(false));
    let writer = spawn_writer(&path, Arc::clone(&stop));
    thread::sleep(Duration::from_millis(20));

    let selection = rd_core::ids::resolve(&["1-99999"]).unwrap();
    let deleted = admin.events().delete(&selection).unwrap();

    thread::sleep(Duration::from_millis(20));
    stop.store(true, Ordering::SeqCst);
    let inserted = writer.join().unwrap();

    let deleted_ids: HashSet<i64> = deleted.iter().map(|event| event.id).collect();
    assert_eq!(deleted_ids.len(), deleted.len());
    let remaining = admin
        .store()
        .events()
        .list(&EventFilter::default(), rd_core::types::Order::OldestFirst)
        .unwrap();
    assert!(remaining.iter().all(|event| !deleted_ids.contains(&event.id)));
    assert_eq!(remaining.len() + deleted.len(), 10 + inserted);
    assert!(deleted.windows(2).all(|pair| pair[0].id < pair[1].id));
}
