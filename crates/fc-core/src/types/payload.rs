//! Wire payload sent to connected viewers.
//!
//! Every [`FileEvent`] is delivered as one JSON text message of the form:
//!
//! ```json
//! { "type": "file_created", "path": "/tmp/logs/a.txt", "timestamp": 1700000000.25 }
//! ```
//!
//! Events are never batched; one message carries exactly one event.

use serde::{Deserialize, Serialize};

use super::event::{ChangeKind, FileEvent};

/// JSON representation of a [`FileEvent`].
///
/// # Examples
///
/// ```
/// use fc_core::{ChangeKind, EventPayload, FileEvent};
/// use camino::Utf8PathBuf;
///
/// let event = FileEvent::new(ChangeKind::Deleted, Utf8PathBuf::from("/tmp/logs/a.txt"));
/// let json = EventPayload::from(&event).encode().unwrap();
/// assert!(json.contains(r#""type":"file_deleted""#));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventPayload {
    /// Event type (`file_created`, `file_changed`, `file_deleted`).
    #[serde(rename = "type")]
    pub kind: ChangeKind,

    /// Fully-resolved path of the changed file.
    pub path: String,

    /// Observation time in fractional seconds since the UNIX epoch.
    pub timestamp: f64,
}

impl EventPayload {
    /// Serializes the payload to a compact JSON string.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parses a payload from a JSON string.
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

impl From<&FileEvent> for EventPayload {
    fn from(event: &FileEvent) -> Self {
        Self {
            kind: event.kind(),
            path: event.path().as_str().to_owned(),
            timestamp: event.timestamp_secs(),
        }
    }
}
