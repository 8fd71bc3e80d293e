//! Filesystem watcher bridged onto an [`EventForwarder`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                 Blocking Thread (spawn_blocking)                 │
//! │  owns RecommendedWatcher, registers roots, waits for shutdown    │
//! └──────────────────────────────────────────────────────────────────┘
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                 notify backend thread                            │
//! │  classify ─► skip dirs ─► UTF-8 ─► PathFilter ─► forward          │
//! │              (all under the gate's read lock)                    │
//! └──────────────────────────────────────────────────────────────┬───┘
//!                                                                │
//!                                                 EventForwarder │
//!                                                                ▼
//!                                                   EventSink ─► hub
//! ```
//!
//! The gate opens once every root is registered and closes at the start of
//! [`Watcher::stop`]. Closing takes the write lock, so when it returns no
//! forward is in flight and none can start: events from a stopped watcher
//! never reach the sink.
//!
//! # Directories
//!
//! Only file changes are forwarded. A path that exists as a directory is
//! skipped and remembered for the rest of the generation, so its later
//! removal is skipped too on backends that report it without a folder kind
//! (FSEvents, polling). A directory that is removed before any event for it
//! was seen cannot be told apart from a file and is forwarded as
//! `file_deleted`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use fc_core::{ChangeKind, FileEvent};
use notify::Watcher as _;
use notify::{RecommendedWatcher, RecursiveMode};
use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use rustc_hash::FxHashSet;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::WatchError;
use crate::events::classify;
use crate::filter::PathFilter;
use crate::forward::EventForwarder;

/// Shared, read-only view of the roots currently being watched.
///
/// Empty while the watcher is stopped.
#[derive(Debug, Clone, Default)]
pub struct WatchedRoots(Arc<RwLock<Vec<Utf8PathBuf>>>);

impl WatchedRoots {
    /// Returns a copy of the registered roots, canonicalized.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Utf8PathBuf> {
        self.0.read().clone()
    }

    /// Number of registered roots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    /// Returns `true` if nothing is being watched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    fn set(&self, roots: Vec<Utf8PathBuf>) {
        *self.0.write() = roots;
    }

    fn clear(&self) {
        self.0.write().clear();
    }
}

#[derive(Debug, Default)]
struct Gate(RwLock<bool>);

impl Gate {
    fn open(&self) {
        *self.0.write() = true;
    }

    fn close(&self) {
        *self.0.write() = false;
    }

    fn enter(&self) -> Option<RwLockReadGuard<'_, bool>> {
        let guard = self.0.read();
        if *guard { Some(guard) } else { None }
    }
}

/// State of one started generation of the watcher.
struct Running {
    gate: Arc<Gate>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl Drop for Running {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Recursive watcher over a set of root directories.
///
/// Every qualifying change under a registered root becomes one
/// [`FileEvent`], handed to the [`EventForwarder`] in the order the backend
/// reported it.
///
/// # Lifecycle
///
/// 1. [`Watcher::new`] stores the filter and sink; nothing is watched yet.
/// 2. [`Watcher::start`] registers the roots and opens delivery.
/// 3. [`Watcher::stop`] closes delivery and releases the native watcher.
///    The watcher can be started again afterwards.
///
/// # Examples
///
/// ```no_run
/// use camino::Utf8PathBuf;
/// use fc_core::FileEvent;
/// use fc_watcher::{IgnoreRules, Watcher};
///
/// # async fn example() -> Result<(), fc_watcher::WatchError> {
/// let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<FileEvent>();
/// let mut watcher = Watcher::new(IgnoreRules::default(), tx);
///
/// watcher.start(&[Utf8PathBuf::from("./logs")]).await?;
/// if let Some(event) = rx.recv().await {
///     println!("{} {}", event.kind(), event.path());
/// }
/// watcher.stop().await;
/// # Ok(())
/// # }
/// ```
pub struct Watcher<F, S> {
    filter: Arc<F>,
    sink: Arc<S>,
    roots: WatchedRoots,
    running: Option<Running>,
}

impl<F, S> std::fmt::Debug for Watcher<F, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("roots", &self.roots)
            .field("started", &self.running.is_some())
            .finish_non_exhaustive()
    }
}

impl<F: PathFilter, S: EventForwarder> Watcher<F, S> {
    /// Creates a stopped watcher.
    pub fn new(filter: F, sink: S) -> Self {
        Self {
            filter: Arc::new(filter),
            sink: Arc::new(sink),
            roots: WatchedRoots::default(),
            running: None,
        }
    }

    /// Starts watching `roots` recursively.
    ///
    /// Roots that are missing or cannot be registered are logged and
    /// skipped. Delivery begins only after every usable root has been
    /// registered.
    ///
    /// # Errors
    ///
    /// - [`WatchError::AlreadyRunning`] if the watcher was started and not
    ///   stopped
    /// - [`WatchError::Notify`] if the native watcher cannot be created
    /// - [`WatchError::NoWatchableRoots`] if no root could be registered
    /// - [`WatchError::TaskFailed`] if the watcher thread died while starting
    pub async fn start(&mut self, roots: &[Utf8PathBuf]) -> Result<(), WatchError> {
        if self.running.is_some() {
            return Err(WatchError::AlreadyRunning);
        }

        let gate = Arc::new(Gate::default());
        let (ready_tx, ready_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let forwarding = Forwarding {
            filter: Arc::clone(&self.filter),
            sink: Arc::clone(&self.sink),
            gate: Arc::clone(&gate),
            dirs: KnownDirs::default(),
        };
        let requested = roots.to_vec();
        let registered = self.roots.clone();

        let task = tokio::task::spawn_blocking(move || {
            run_watcher_loop(requested, forwarding, &registered, ready_tx, shutdown_rx);
        });

        match ready_rx.await {
            Ok(Ok(count)) => {
                tracing::info!(roots = count, "File watcher started");
                self.running = Some(Running {
                    gate,
                    shutdown_tx: Some(shutdown_tx),
                    task: Some(task),
                });
                Ok(())
            }
            Ok(Err(err)) => {
                task.await?;
                Err(err)
            }
            Err(_) => match task.await {
                Err(join) => Err(join.into()),
                Ok(()) => Err(WatchError::TaskFailed(
                    "watcher thread exited before reporting readiness".to_owned(),
                )),
            },
        }
    }

    /// Stops watching.
    ///
    /// Waits for any event currently being forwarded, then releases the
    /// native watcher. No event from this generation reaches the sink after
    /// `stop` returns. Does nothing if the watcher is not running.
    pub async fn stop(&mut self) {
        let Some(mut running) = self.running.take() else {
            return;
        };

        let gate = Arc::clone(&running.gate);
        if let Err(e) = tokio::task::spawn_blocking(move || gate.close()).await {
            tracing::warn!(error = %e, "Closing watcher gate off-thread failed");
            running.gate.close();
        }

        if let Some(tx) = running.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = running.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %WatchError::from(e), "Watcher thread did not exit cleanly");
            }
        }

        self.roots.clear();
        tracing::info!("File watcher stopped");
    }

    /// Returns `true` between a successful [`start`](Self::start) and
    /// [`stop`](Self::stop), while the watcher thread is alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.as_ref().is_some_and(|running| {
            running
                .task
                .as_ref()
                .is_some_and(|task| !task.is_finished())
        })
    }

    /// Returns the roots currently registered.
    #[must_use]
    pub fn watched_roots(&self) -> Vec<Utf8PathBuf> {
        self.roots.snapshot()
    }

    /// Returns a shared handle to the registered roots that stays current
    /// across restarts.
    #[must_use]
    pub fn roots_handle(&self) -> WatchedRoots {
        self.roots.clone()
    }

    /// Returns the filter in use.
    #[must_use]
    pub fn filter(&self) -> &F {
        &self.filter
    }
}

/// Directories seen during one generation.
#[derive(Default)]
struct KnownDirs(Mutex<FxHashSet<PathBuf>>);

impl KnownDirs {
    /// Returns `true` if `path` is a directory, or was one the last time it
    /// was seen and is now being deleted.
    fn is_directory(&self, kind: ChangeKind, path: &Path) -> bool {
        if path.is_dir() {
            self.0.lock().insert(path.to_path_buf());
            return true;
        }
        kind == ChangeKind::Deleted && self.0.lock().remove(path)
    }
}

/// Everything the notification callback needs.
struct Forwarding<F, S> {
    filter: Arc<F>,
    sink: Arc<S>,
    gate: Arc<Gate>,
    dirs: KnownDirs,
}

impl<F: PathFilter, S: EventForwarder> Forwarding<F, S> {
    fn handle(&self, result: notify::Result<notify::Event>) {
        let event = match result {
            Ok(event) => event,
            Err(error) => {
                tracing::warn!(error = %error, "Watcher backend error");
                return;
            }
        };

        let Some(_open) = self.gate.enter() else {
            tracing::trace!(paths = ?event.paths, "Watcher gate closed, notification dropped");
            return;
        };

        for (kind, path) in classify(&event) {
            if self.dirs.is_directory(kind, path) {
                tracing::trace!(path = %path.display(), "Skipping directory event");
                continue;
            }

            let Some(path) = Utf8Path::from_path(path) else {
                tracing::warn!(
                    error = %WatchError::non_utf8_path(path),
                    "Skipping file event"
                );
                continue;
            };

            if self.filter.should_ignore(path) {
                tracing::trace!(path = %path, "Ignored file event");
                continue;
            }

            tracing::debug!(kind = %kind, path = %path, "File change");
            if !self.sink.forward(FileEvent::new(kind, path.to_path_buf())) {
                tracing::debug!("Event sink closed, dropping remaining changes");
                break;
            }
        }
    }
}

/// Owns the native watcher for one generation.
///
/// Reports `Ok(registered roots)` or the start-up error on `ready_tx`, then
/// blocks until `shutdown_rx` fires or its sender is dropped.
fn run_watcher_loop<F: PathFilter, S: EventForwarder>(
    roots: Vec<Utf8PathBuf>,
    forwarding: Forwarding<F, S>,
    registered: &WatchedRoots,
    ready_tx: oneshot::Sender<Result<usize, WatchError>>,
    shutdown_rx: oneshot::Receiver<()>,
) {
    let gate = Arc::clone(&forwarding.gate);

    let mut watcher = match RecommendedWatcher::new(
        move |result: notify::Result<notify::Event>| forwarding.handle(result),
        notify::Config::default(),
    ) {
        Ok(watcher) => watcher,
        Err(e) => {
            let _ = ready_tx.send(Err(WatchError::Notify(e)));
            return;
        }
    };

    let mut watched = Vec::with_capacity(roots.len());
    for root in &roots {
        match register_root(&mut watcher, root) {
            Ok(canonical) => {
                tracing::info!(root = %canonical, "Watching root");
                watched.push(canonical);
            }
            Err(e) => tracing::warn!(root = %root, error = %e, "Skipping watch root"),
        }
    }

    if watched.is_empty() {
        let _ = ready_tx.send(Err(WatchError::NoWatchableRoots {
            requested: roots.len(),
        }));
        return;
    }

    let count = watched.len();
    registered.set(watched);
    gate.open();

    if ready_tx.send(Ok(count)).is_err() {
        // The caller of start() went away; nobody will ever stop us.
        gate.close();
        registered.clear();
        return;
    }

    let _ = shutdown_rx.blocking_recv();
    drop(watcher);
}

fn register_root(
    watcher: &mut RecommendedWatcher,
    root: &Utf8Path,
) -> Result<Utf8PathBuf, WatchError> {
    if !root.exists() {
        return Err(WatchError::path_not_found(root));
    }
    let canonical = root.canonicalize_utf8()?;
    watcher.watch(canonical.as_std_path(), RecursiveMode::Recursive)?;
    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::IgnoreRules;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    type TestWatcher = Watcher<IgnoreRules, mpsc::UnboundedSender<FileEvent>>;

    fn watcher() -> (TestWatcher, mpsc::UnboundedReceiver<FileEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Watcher::new(IgnoreRules::default(), tx), rx)
    }

    fn utf8(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("temp dir is UTF-8")
    }

    fn forwarding() -> (
        Forwarding<IgnoreRules, mpsc::UnboundedSender<FileEvent>>,
        mpsc::UnboundedReceiver<FileEvent>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let gate = Arc::new(Gate(RwLock::new(false)));
        gate.open();
        let forwarding = Forwarding {
            filter: Arc::new(IgnoreRules::default()),
            sink: Arc::new(tx),
            gate,
            dirs: KnownDirs::default(),
        };
        (forwarding, rx)
    }

    fn notification(kind: notify::EventKind, path: &Path) -> notify::Result<notify::Event> {
        Ok(notify::Event::new(kind).add_path(path.to_path_buf()))
    }

    #[test]
    fn test_removed_directory_is_not_reported_as_a_file() {
        use notify::event::{EventKind, ModifyKind, RemoveKind};

        let dir = TempDir::new().expect("Failed to create temp directory");
        let episode = dir.path().join("episode-1");
        fs::create_dir(&episode).expect("create dir");
        let (forwarding, mut rx) = forwarding();

        forwarding.handle(notification(EventKind::Modify(ModifyKind::Any), &episode));
        fs::remove_dir(&episode).expect("remove dir");
        forwarding.handle(notification(EventKind::Remove(RemoveKind::Any), &episode));

        let file = dir.path().join("a.txt");
        forwarding.handle(notification(EventKind::Remove(RemoveKind::Any), &file));

        let event = rx.try_recv().expect("file deletion forwarded");
        assert_eq!(event.kind(), ChangeKind::Deleted);
        assert_eq!(event.path().as_std_path(), file);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_closed_gate_forwards_nothing() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let (forwarding, mut rx) = forwarding();
        forwarding.gate.close();

        let file = dir.path().join("a.txt");
        forwarding.handle(notification(
            notify::EventKind::Create(notify::event::CreateKind::File),
            &file,
        ));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stop_without_start_is_noop() {
        let (mut watcher, _rx) = watcher();
        watcher.stop().await;
        watcher.stop().await;
        assert!(!watcher.is_running());
    }

    #[tokio::test]
    async fn test_start_registers_canonical_roots() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let (mut watcher, _rx) = watcher();

        watcher.start(&[utf8(&dir)]).await.expect("start failed");

        let expected = utf8(&dir).canonicalize_utf8().expect("canonicalize");
        assert!(watcher.is_running());
        assert_eq!(watcher.watched_roots(), vec![expected]);

        watcher.stop().await;
        assert!(watcher.watched_roots().is_empty());
        assert!(!watcher.is_running());
    }

    #[tokio::test]
    async fn test_start_twice_is_rejected() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let (mut watcher, _rx) = watcher();

        watcher.start(&[utf8(&dir)]).await.expect("start failed");
        let second = watcher.start(&[utf8(&dir)]).await;
        assert!(matches!(second, Err(WatchError::AlreadyRunning)));

        watcher.stop().await;
    }

    #[tokio::test]
    async fn test_missing_root_is_skipped() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let missing = utf8(&dir).join("does-not-exist");
        let (mut watcher, _rx) = watcher();

        watcher
            .start(&[missing, utf8(&dir)])
            .await
            .expect("start failed");
        assert_eq!(watcher.watched_roots().len(), 1);

        watcher.stop().await;
    }

    #[tokio::test]
    async fn test_no_watchable_roots() {
        let (mut watcher, _rx) = watcher();
        let result = watcher
            .start(&[Utf8PathBuf::from("/nonexistent/filecast/root")])
            .await;

        assert!(matches!(
            result,
            Err(WatchError::NoWatchableRoots { requested: 1 })
        ));
        assert!(!watcher.is_running());

        // A failed start leaves the watcher startable.
        watcher.stop().await;
    }

    #[tokio::test]
    async fn test_forwards_created_file() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let (mut watcher, mut rx) = watcher();
        watcher.start(&[utf8(&dir)]).await.expect("start failed");

        fs::write(dir.path().join("report.txt"), "hello").expect("write failed");

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("channel closed");
        watcher.stop().await;

        assert_eq!(event.kind(), ChangeKind::Created);
        assert_eq!(event.path().file_name(), Some("report.txt"));
    }

    #[tokio::test]
    async fn test_ignored_and_directory_changes_are_not_forwarded() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let (mut watcher, mut rx) = watcher();
        watcher.start(&[utf8(&dir)]).await.expect("start failed");

        fs::create_dir(dir.path().join("nested")).expect("mkdir failed");
        fs::write(dir.path().join("cache.pyc"), b"\0").expect("write failed");
        fs::write(dir.path().join("marker.txt"), "x").expect("write failed");

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("channel closed");
        watcher.stop().await;

        // The first forwarded change is the marker, not the directory or .pyc.
        assert_eq!(event.path().file_name(), Some("marker.txt"));
    }
}
