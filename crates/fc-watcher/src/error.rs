//! Error types for the fc-watcher crate.

use camino::Utf8PathBuf;

/// Errors that can occur while starting or running the watcher.
///
/// # Error Recovery Strategy
///
/// - [`WatchError::Notify`]: fatal when creating the native watcher; when
///   registering one root, that root is skipped
/// - [`WatchError::PathNotFound`], [`WatchError::Io`]: the root is skipped
/// - [`WatchError::NoWatchableRoots`]: fatal, nothing could be watched
/// - [`WatchError::AlreadyRunning`]: the call is rejected, the running
///   watcher is unaffected
/// - [`WatchError::NonUtf8Path`]: recoverable, the event is skipped
/// - [`WatchError::TaskFailed`]: fatal, the watcher thread is gone
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// The native notification backend failed.
    #[error("notify watcher error: {0}")]
    Notify(#[from] notify::Error),

    /// A configured root does not exist.
    #[error("watch root does not exist: {0}")]
    PathNotFound(Utf8PathBuf),

    /// None of the configured roots could be registered.
    #[error("no watchable roots among {requested} configured")]
    NoWatchableRoots {
        /// Number of roots that were requested.
        requested: usize,
    },

    /// `start` was called on a watcher that is already running.
    #[error("watcher is already running")]
    AlreadyRunning,

    /// A path in a notification is not valid UTF-8.
    #[error("path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(std::path::PathBuf),

    /// An I/O error occurred while resolving a root.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The blocking watcher task panicked or was cancelled.
    #[error("watcher task failed: {0}")]
    TaskFailed(String),
}

impl WatchError {
    /// Creates a new [`WatchError::PathNotFound`] error.
    #[inline]
    pub fn path_not_found(path: impl Into<Utf8PathBuf>) -> Self {
        Self::PathNotFound(path.into())
    }

    /// Creates a new [`WatchError::NonUtf8Path`] error.
    #[inline]
    pub fn non_utf8_path(path: impl Into<std::path::PathBuf>) -> Self {
        Self::NonUtf8Path(path.into())
    }

    /// Returns `true` if watching can continue past this error.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NonUtf8Path(_) | Self::PathNotFound(_) | Self::AlreadyRunning
        )
    }

    /// Returns `true` if this error is fatal (watching cannot proceed).
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }
}

impl From<tokio::task::JoinError> for WatchError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::TaskFailed(err.to_string())
    }
}
