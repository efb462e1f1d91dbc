//! Stress test: several execution contexts sharing one backend.
//!
//! Covers cross-context visibility, native change events, polling over the
//! file store, and concurrent access through independent handles.

use std::sync::Arc;
use std::thread;
use std::time::Duration as StdDuration;

use identity_store::backend::FileStore;
use identity_store::notify::PollingChangeSource;
use identity_store::{LocalStorage, ManualClock, MemoryBackend};
use tokio::sync::mpsc;
use tokio::time::timeout;

fn context(backend: &MemoryBackend) -> LocalStorage {
    LocalStorage::on_memory(backend, Arc::new(ManualClock::starting_now()))
        .expect("context should open")
}

#[test]
fn writes_are_visible_in_every_context() {
    let backend = MemoryBackend::new();
    let contexts: Vec<LocalStorage> = (0..8).map(|_| context(&backend)).collect();

    contexts[0].emails().add_email("a@x.com", None).unwrap();
    contexts[3]
        .sites()
        .set("https://a.com", "email", "a@x.com")
        .unwrap();

    for ctx in &contexts {
        assert!(ctx.emails().contains("a@x.com").unwrap());
        assert_eq!(ctx.sites().count().unwrap(), 1);
    }

    contexts[7].emails().remove_email("a@x.com").unwrap();
    for ctx in &contexts {
        assert_eq!(ctx.emails().email_count().unwrap(), 0);
        assert_eq!(ctx.sites().get("https://a.com", "email").unwrap(), None);
    }
}

#[test]
fn seeding_a_late_context_keeps_existing_data() {
    let backend = MemoryBackend::new();
    let first = context(&backend);
    first.emails().add_email("a@x.com", None).unwrap();
    first
        .logins()
        .set_logged_in("https://a.com", Some("a@x.com"))
        .unwrap();

    let late = context(&backend);
    assert!(late.emails().contains("a@x.com").unwrap());
    assert_eq!(late.logins().logged_in_count().unwrap(), 1);
}

#[tokio::test]
async fn watch_sees_other_context_changes() {
    let backend = MemoryBackend::new();
    let writer = context(&backend);
    let watcher = context(&backend);

    let (tx, mut rx) = mpsc::unbounded_channel();
    watcher
        .logins()
        .watch_logged_in("https://a.com", move |now| {
            let _ = tx.send(now);
        })
        .unwrap();

    writer
        .logins()
        .set_logged_in("https://a.com", Some("a@x.com"))
        .unwrap();
    let got = timeout(StdDuration::from_secs(5), rx.recv()).await.unwrap();
    assert_eq!(got, Some(Some("a@x.com".to_string())));

    // An unrelated origin changes the namespace but not the watched value.
    writer
        .logins()
        .set_logged_in("https://b.com", Some("b@x.com"))
        .unwrap();
    writer.logins().set_logged_in("https://a.com", None).unwrap();
    let got = timeout(StdDuration::from_secs(5), rx.recv()).await.unwrap();
    assert_eq!(got, Some(None));
}

#[tokio::test]
async fn many_watchers_each_fire_once_per_change() {
    let backend = MemoryBackend::new();
    let writer = context(&backend);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let watchers: Vec<LocalStorage> = (0..10).map(|_| context(&backend)).collect();
    for (i, watcher) in watchers.iter().enumerate() {
        let tx = tx.clone();
        watcher
            .logins()
            .watch_logged_in("https://a.com", move |now| {
                let _ = tx.send((i, now));
            })
            .unwrap();
    }
    drop(tx);

    writer
        .logins()
        .set_logged_in("https://a.com", Some("a@x.com"))
        .unwrap();

    let mut fired = Vec::new();
    for _ in 0..watchers.len() {
        let (i, now) = timeout(StdDuration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .expect("every watcher fires");
        assert_eq!(now.as_deref(), Some("a@x.com"));
        fired.push(i);
    }
    fired.sort_unstable();
    assert_eq!(fired, (0..watchers.len()).collect::<Vec<_>>());
}

#[tokio::test(start_paused = true)]
async fn polling_watch_over_shared_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let open = || {
        LocalStorage::new(
            Arc::new(FileStore::new(tmp.path()).unwrap()),
            Arc::new(PollingChangeSource::new(StdDuration::from_millis(10))),
            Arc::new(ManualClock::starting_now()),
        )
        .unwrap()
    };
    let writer = open();
    let watcher = open();

    let (tx, mut rx) = mpsc::unbounded_channel();
    watcher
        .logins()
        .watch_logged_in("https://a.com", move |now| {
            let _ = tx.send(now);
        })
        .unwrap();

    writer
        .logins()
        .set_logged_in("https://a.com", Some("a@x.com"))
        .unwrap();

    let got = timeout(StdDuration::from_secs(1), rx.recv()).await.unwrap();
    assert_eq!(got, Some(Some("a@x.com".to_string())));
}

#[test]
fn concurrent_contexts_never_see_partial_values() {
    let backend = MemoryBackend::new();
    context(&backend)
        .emails()
        .add_email("a@x.com", None)
        .unwrap();

    let mut handles = Vec::new();
    for t in 0..4 {
        let ctx = context(&backend);
        handles.push(thread::spawn(move || {
            for i in 0..200 {
                let origin = format!("https://site{t}-{i}.com");
                ctx.logins().set_logged_in(&origin, Some("a@x.com")).unwrap();
            }
        }));
    }
    for _ in 0..4 {
        let ctx = context(&backend);
        handles.push(thread::spawn(move || {
            for _ in 0..200 {
                // Reads race with writers but always decode cleanly.
                ctx.logins().logged_in_count().unwrap();
                assert!(ctx.emails().contains("a@x.com").unwrap());
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn concurrent_file_contexts_write_the_same_key() {
    let tmp = tempfile::tempdir().unwrap();
    let open = || {
        LocalStorage::new(
            Arc::new(FileStore::new(tmp.path()).unwrap()),
            Arc::new(PollingChangeSource::default()),
            Arc::new(ManualClock::starting_now()),
        )
        .unwrap()
    };
    open().emails().add_email("a@x.com", None).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let ctx = open();
            thread::spawn(move || {
                for i in 0..500 {
                    let origin = format!("https://site{t}-{i}.com");
                    ctx.logins()
                        .set_logged_in(&origin, Some("a@x.com"))
                        .expect("racing writes resolve last-write-wins");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // Lost updates are allowed; failures and torn values are not.
    let ctx = open();
    assert!(ctx.logins().logged_in_count().unwrap() >= 1);
    assert!(ctx.emails().contains("a@x.com").unwrap());
    let leftovers = std::fs::read_dir(tmp.path())
        .unwrap()
        .filter(|e| {
            let name = e.as_ref().unwrap().file_name();
            !name.to_string_lossy().ends_with(".json")
        })
        .count();
    assert_eq!(leftovers, 0);
}
