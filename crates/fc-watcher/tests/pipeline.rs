//! End-to-end: filesystem changes through the watcher into hub outboxes.

use std::fs;
use std::io::Write;
use std::time::Duration;

use camino::Utf8PathBuf;
use fc_core::{EventPayload, HubConfig};
use fc_hub::{BroadcastHub, Outbound, Outbox};
use fc_watcher::{IgnoreRules, Watcher};
use tempfile::TempDir;

const WAIT: Duration = Duration::from_secs(5);

fn root_of(dir: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
        .expect("temp dir is UTF-8")
        .canonicalize_utf8()
        .expect("canonicalize")
}

async fn next_payload(outbox: &mut Outbox) -> Option<EventPayload> {
    match tokio::time::timeout(WAIT, outbox.recv()).await {
        Ok(Some(Outbound::Event(json))) => Some(EventPayload::decode(&json).expect("valid payload")),
        _ => None,
    }
}

/// Collects payloads until one matches `done` or the wait runs out.
async fn collect_until<P>(outbox: &mut Outbox, done: P) -> Vec<EventPayload>
where
    P: Fn(&EventPayload) -> bool,
{
    let mut seen = Vec::new();
    while let Some(payload) = next_payload(outbox).await {
        let finished = done(&payload);
        seen.push(payload);
        if finished {
            break;
        }
    }
    seen
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn create_append_delete_reaches_client() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let root = root_of(&dir);

    let hub = BroadcastHub::new(HubConfig::default());
    let mut outbox = hub.register().expect("register");
    let (sink, dispatcher) = hub.channel(256);
    let dispatch = tokio::spawn(dispatcher.run());

    let mut watcher = Watcher::new(IgnoreRules::default(), sink);
    watcher.start(&[root.clone()]).await.expect("start failed");

    let target = root.join("a.txt");
    let noise = root.join("a.pyc");

    fs::write(&noise, b"\0\0").expect("write pyc");
    fs::write(&target, "first\n").expect("create");
    {
        let mut file = fs::OpenOptions::new()
            .append(true)
            .open(&target)
            .expect("open for append");
        file.write_all(b"second\n").expect("append");
    }
    fs::remove_file(&target).expect("delete");

    let seen = collect_until(&mut outbox, |p| p.kind == fc_core::ChangeKind::Deleted).await;

    watcher.stop().await;
    drop(watcher);
    dispatch.await.expect("dispatcher panicked");

    assert!(
        seen.iter().all(|p| !p.path.ends_with(".pyc")),
        "ignored file leaked: {seen:?}"
    );
    assert!(seen.iter().all(|p| p.path == target.as_str()));

    let kinds: Vec<&str> = seen.iter().map(|p| p.kind.wire_name()).collect();
    assert_eq!(kinds.first(), Some(&"file_created"), "got {kinds:?}");
    assert_eq!(kinds.last(), Some(&"file_deleted"), "got {kinds:?}");
    assert!(kinds.contains(&"file_changed"), "got {kinds:?}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn restart_delivers_no_stale_events() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let root = root_of(&dir);

    let hub = BroadcastHub::new(HubConfig::default());
    let mut outbox = hub.register().expect("register");
    let (sink, dispatcher) = hub.channel(256);
    let dispatch = tokio::spawn(dispatcher.run());

    let mut watcher = Watcher::new(IgnoreRules::default(), sink);
    watcher.start(&[root.clone()]).await.expect("first start");
    watcher.stop().await;

    // Changes while stopped are never reported.
    fs::write(root.join("while-stopped.txt"), "x").expect("write");
    tokio::time::sleep(Duration::from_millis(200)).await;

    watcher.start(&[root.clone()]).await.expect("second start");
    assert_eq!(watcher.watched_roots(), vec![root.clone()]);

    let fresh = root.join("fresh.txt");
    fs::write(&fresh, "y").expect("write");

    let first = next_payload(&mut outbox).await.expect("event after restart");
    watcher.stop().await;
    drop(watcher);
    dispatch.await.expect("dispatcher panicked");

    assert_eq!(first.path, fresh.as_str());
    assert_eq!(first.kind, fc_core::ChangeKind::Created);

    while let Ok(message) = outbox.try_recv() {
        if let Outbound::Event(json) = message {
            let payload = EventPayload::decode(&json).expect("valid payload");
            assert_eq!(payload.path, fresh.as_str(), "stale event {payload:?}");
        }
    }
}

#[tokio::test]
async fn roots_handle_tracks_lifecycle() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let root = root_of(&dir);
    let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();

    let mut watcher = Watcher::new(IgnoreRules::default(), tx);
    let handle = watcher.roots_handle();
    assert!(handle.is_empty());

    watcher
        .start(&[root.join("missing"), root.clone()])
        .await
        .expect("start failed");
    assert_eq!(handle.snapshot(), vec![root]);

    watcher.stop().await;
    assert!(handle.is_empty());
}
