//! Error types for the fc-server crate.

use fc_core::ConfigError;
use fc_watcher::WatchError;

/// Errors that stop the service from starting or serving.
///
/// Failures of a single viewer connection never surface here; they end that
/// connection and are logged.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The configuration failed validation.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The watcher could not be started and watching is required.
    #[error("file watcher failed: {0}")]
    Watch(#[from] WatchError),

    /// The listen address could not be bound.
    #[error("failed to bind {address}: {source}")]
    Bind {
        /// Address that was requested.
        address: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The HTTP server stopped with an error.
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}
