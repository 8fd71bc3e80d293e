//! Connection registry and fan-out broadcaster for filecast.
//!
//! The hub sits between the watcher thread and the WebSocket transport:
//!
//! - [`EventSink`] / [`Dispatcher`] carry [`FileEvent`](fc_core::FileEvent)s
//!   from the blocking watcher thread into the runtime, in order.
//! - [`BroadcastHub`] keeps the set of live connections and fans each event
//!   out to all of them.
//! - [`Outbox`] is the per-connection queue the transport drains onto its
//!   socket.
//!
//! A connection whose queue stays full for longer than the configured
//! backpressure grace is dropped, so a stalled client delays the others by
//! at most that grace and only once.
//!
//! # Example
//!
//! ```
//! use camino::Utf8PathBuf;
//! use fc_core::{ChangeKind, FileEvent, HubConfig};
//! use fc_hub::{BroadcastHub, Outbound};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let hub = BroadcastHub::new(HubConfig::default());
//! let mut outbox = hub.register().unwrap();
//!
//! let (sink, dispatcher) = hub.channel(64);
//! let dispatch = tokio::spawn(dispatcher.run());
//!
//! sink.send(FileEvent::new(ChangeKind::Deleted, Utf8PathBuf::from("/var/log/app.log")))
//!     .await
//!     .unwrap();
//! drop(sink);
//! dispatch.await.unwrap();
//!
//! assert!(matches!(outbox.recv().await, Some(Outbound::Event(_))));
//! # }
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

mod channel;
mod connection;
mod error;
mod hub;
mod stats;

pub use channel::{Dispatcher, EventSink};
pub use connection::{ConnectionId, ConnectionState, DropReason, Outbound, Outbox};
pub use error::HubError;
pub use hub::{BroadcastHub, BroadcastReport};
pub use stats::{HubStats, HubStatsSnapshot};
