//! Domain types for filecast.
//!
//! # Module Organization
//!
//! - [`event`] - File change events and their classification
//! - [`payload`] - The JSON form of an event as sent to viewers
//!
//! All public types are re-exported at this module level and at the crate
//! root:
//!
//! ```
//! use fc_core::{ChangeKind, EventPayload, FileEvent};
//! ```

mod event;
mod payload;

pub use event::{ChangeKind, FileEvent};
pub use payload::EventPayload;
