//! File change events.
//!
//! This module provides [`FileEvent`], the immutable record produced once per
//! qualifying filesystem notification, and [`ChangeKind`], the classification
//! of that notification.
//!
//! # Event Flow
//!
//! ```text
//! OS notification (notify)
//!        │
//!        ▼
//!   classify + filter  (fc-watcher)
//!        │
//!        ▼
//!   FileEvent created
//!        │
//!        ▼
//!   EventSink → Dispatcher → BroadcastHub  (fc-hub)
//! ```

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

/// The kind of change a [`FileEvent`] describes.
///
/// # Examples
///
/// ```
/// use fc_core::ChangeKind;
///
/// assert_eq!(ChangeKind::Created.wire_name(), "file_created");
/// assert_eq!(ChangeKind::Modified.wire_name(), "file_changed");
/// assert_eq!(ChangeKind::Deleted.wire_name(), "file_deleted");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    /// A file appeared (created, or renamed into place).
    #[serde(rename = "file_created")]
    Created,

    /// A file's content or metadata changed.
    #[serde(rename = "file_changed")]
    Modified,

    /// A file disappeared (deleted, or renamed away).
    #[serde(rename = "file_deleted")]
    Deleted,
}

impl ChangeKind {
    /// Returns the name used for this kind in the wire payload.
    #[inline]
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Created => "file_created",
            Self::Modified => "file_changed",
            Self::Deleted => "file_deleted",
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// A single observed filesystem change.
///
/// Events are immutable once constructed and are never persisted: an event
/// fired while no viewer is connected is simply lost.
///
/// # Examples
///
/// ```
/// use fc_core::{ChangeKind, FileEvent};
/// use camino::Utf8PathBuf;
///
/// let event = FileEvent::new(ChangeKind::Created, Utf8PathBuf::from("/tmp/logs/a.txt"));
/// assert_eq!(event.kind(), ChangeKind::Created);
/// assert_eq!(event.path().as_str(), "/tmp/logs/a.txt");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    kind: ChangeKind,
    path: Utf8PathBuf,
    observed_at: SystemTime,
}

impl FileEvent {
    /// Creates an event stamped with the current wall-clock time.
    #[inline]
    #[must_use]
    pub fn new(kind: ChangeKind, path: Utf8PathBuf) -> Self {
        Self::with_timestamp(kind, path, SystemTime::now())
    }

    /// Creates an event with an explicit observation time.
    ///
    /// Useful for testing or when replaying a recorded notification.
    #[inline]
    #[must_use]
    pub const fn with_timestamp(kind: ChangeKind, path: Utf8PathBuf, observed_at: SystemTime) -> Self {
        Self {
            kind,
            path,
            observed_at,
        }
    }

    /// Returns the kind of change.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> ChangeKind {
        self.kind
    }

    /// Returns the fully-resolved path of the changed file.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Returns when the notification was observed.
    #[inline]
    #[must_use]
    pub const fn observed_at(&self) -> SystemTime {
        self.observed_at
    }

    /// Returns the observation time as fractional seconds since the UNIX epoch.
    ///
    /// Times before the epoch (a badly set clock) are reported as `0.0`.
    ///
    /// # Examples
    ///
    /// ```
    /// use fc_core::{ChangeKind, FileEvent};
    /// use camino::Utf8PathBuf;
    /// use std::time::{Duration, UNIX_EPOCH};
    ///
    /// let at = UNIX_EPOCH + Duration::from_millis(1_500);
    /// let event = FileEvent::with_timestamp(ChangeKind::Deleted, Utf8PathBuf::from("x"), at);
    /// assert!((event.timestamp_secs() - 1.5).abs() < f64::EPSILON);
    /// ```
    #[must_use]
    pub fn timestamp_secs(&self) -> f64 {
        self.observed_at
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_kind_wire_names() {
        assert_eq!(ChangeKind::Created.to_string(), "file_created");
        assert_eq!(ChangeKind::Modified.to_string(), "file_changed");
        assert_eq!(ChangeKind::Deleted.to_string(), "file_deleted");
    }

    #[test]
    fn test_change_kind_serde_matches_wire_name() {
        for kind in [ChangeKind::Created, ChangeKind::Modified, ChangeKind::Deleted] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.wire_name()));
        }
    }

    #[test]
    fn test_event_accessors() {
        let at = UNIX_EPOCH + Duration::from_secs(42);
        let event =
            FileEvent::with_timestamp(ChangeKind::Modified, Utf8PathBuf::from("/logs/run.log"), at);

        assert_eq!(event.kind(), ChangeKind::Modified);
        assert_eq!(event.path(), Utf8Path::new("/logs/run.log"));
        assert_eq!(event.observed_at(), at);
        assert!((event.timestamp_secs() - 42.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_timestamp_before_epoch_clamps_to_zero() {
        let before = UNIX_EPOCH - Duration::from_secs(10);
        let event = FileEvent::with_timestamp(ChangeKind::Created, Utf8PathBuf::from("a"), before);
        assert!(event.timestamp_secs().abs() < f64::EPSILON);
    }

    #[test]
    fn test_new_uses_current_time() {
        let before = SystemTime::now();
        let event = FileEvent::new(ChangeKind::Created, Utf8PathBuf::from("a"));
        assert!(event.observed_at() >= before);
    }
}
