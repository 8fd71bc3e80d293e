//! Recursive filesystem watcher with ignore rules.
//!
//! This crate turns native filesystem notifications (via `notify`) into
//! [`FileEvent`](fc_core::FileEvent)s and hands them to an
//! [`EventForwarder`], normally the hub's [`EventSink`](fc_hub::EventSink).
//!
//! # Overview
//!
//! - [`Watcher`] registers one or more roots recursively and can be stopped
//!   and started again. Missing roots are skipped with a warning.
//! - [`PathFilter`] / [`IgnoreRules`] suppress events for VCS metadata,
//!   caches, build output and editor scratch files.
//! - [`events::classify`] maps each native notification to created,
//!   changed or deleted. There is no debouncing: every qualifying
//!   notification produces an event.
//!
//! # Crate Dependencies
//!
//! ```text
//! fc-cli ──► fc-server ──► fc-watcher ──► fc-hub ──► fc-core
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use fc_core::HubConfig;
//! use fc_hub::BroadcastHub;
//! use fc_watcher::{IgnoreRules, Watcher};
//! use camino::Utf8PathBuf;
//!
//! # async fn example() -> Result<(), fc_watcher::WatchError> {
//! let hub = BroadcastHub::new(HubConfig::default());
//! let (sink, dispatcher) = hub.channel(1024);
//! tokio::spawn(dispatcher.run());
//!
//! let rules = IgnoreRules::default().with_patterns(["*.log"]);
//! let mut watcher = Watcher::new(rules, sink);
//! watcher.start(&[Utf8PathBuf::from("/var/lib/runs")]).await?;
//!
//! // ... serve clients ...
//!
//! watcher.stop().await;
//! # Ok(())
//! # }
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod events;
pub mod filter;
pub mod forward;
pub mod watcher;

pub use error::WatchError;
pub use filter::{DEFAULT_IGNORE_PATTERNS, IgnoreRule, IgnoreRules, PathFilter};
pub use forward::EventForwarder;
pub use watcher::{WatchedRoots, Watcher};
