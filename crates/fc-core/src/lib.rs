//! Core types, configuration, and errors for filecast.
//!
//! This crate provides the foundational types used across the workspace:
//!
//! - [`FileEvent`] and [`ChangeKind`], the value produced for each filesystem change
//! - [`EventPayload`], the JSON form of an event as delivered to viewers
//! - Configuration structures ([`Config`] and its sections)
//! - [`ConfigError`] for configuration loading and validation
//!
//! # Crate Dependencies
//!
//! ```text
//! fc-cli ──► fc-server ──► fc-watcher ──► fc-hub ──► fc-core
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod types;

pub use config::{
    Config, HubConfig, MAX_PING_INTERVAL_SECS, MAX_QUEUE_CAPACITY, MAX_TIMEOUT_MS, ServerConfig,
    WatchConfig,
};
pub use error::ConfigError;
pub use types::{ChangeKind, EventPayload, FileEvent};
