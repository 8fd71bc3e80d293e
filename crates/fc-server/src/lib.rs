//! WebSocket transport and service lifecycle for filecast.
//!
//! [`Service`] wires the pieces together:
//!
//! ```text
//!   Watcher ──► EventSink ──► Dispatcher ──► BroadcastHub ──► Outbox ──► /ws socket
//! ```
//!
//! and [`router`] exposes them over HTTP:
//!
//! - `GET /ws` streams one JSON text frame per file event
//! - `GET /api/status` reports connections, watched roots and hub counters
//! - any other path is served from the static bundle directory, if set
//!
//! # Crate Dependencies
//!
//! ```text
//! fc-cli ──► fc-server ──► fc-watcher ──► fc-hub ──► fc-core
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

mod error;
mod router;
mod service;
mod state;
mod ws;

pub use error::ServiceError;
pub use router::router;
pub use service::Service;
pub use state::{AppState, ConnectionSettings, StatusReport};
