//! Shared state handed to every request handler.

use std::time::Duration;

use camino::Utf8PathBuf;
use fc_core::ServerConfig;
use fc_hub::{BroadcastHub, HubStatsSnapshot};
use fc_watcher::WatchedRoots;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Per-connection socket timings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Longest a single frame write may take.
    pub write_timeout: Duration,
    /// Interval between keep-alive pings.
    pub ping_interval: Duration,
}

impl From<&ServerConfig> for ConnectionSettings {
    fn from(config: &ServerConfig) -> Self {
        Self {
            write_timeout: config.write_timeout(),
            ping_interval: config.ping_interval(),
        }
    }
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self::from(&ServerConfig::default())
    }
}

/// Router state. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Hub that viewer connections register with.
    pub hub: BroadcastHub,
    /// Roots the watcher currently has registered.
    pub roots: WatchedRoots,
    /// Socket timings for viewer connections.
    pub settings: ConnectionSettings,
    /// Cancelled when the service shuts down.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Builds state with default socket timings and a fresh shutdown token.
    #[must_use]
    pub fn new(hub: BroadcastHub, roots: WatchedRoots) -> Self {
        Self {
            hub,
            roots,
            settings: ConnectionSettings::default(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Replaces the socket timings.
    #[must_use]
    pub fn with_settings(mut self, settings: ConnectionSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Returns the current status report.
    #[must_use]
    pub fn status(&self) -> StatusReport {
        StatusReport {
            status: "ok".to_owned(),
            active_connections: self.hub.connection_count(),
            watched_paths: self.roots.snapshot(),
            stats: self.hub.stats(),
        }
    }
}

/// Body of `GET /api/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    /// Always `"ok"` while the server answers.
    pub status: String,
    /// Viewers currently registered with the hub.
    pub active_connections: usize,
    /// Roots currently being watched.
    pub watched_paths: Vec<Utf8PathBuf>,
    /// Hub counters since start-up.
    pub stats: HubStatsSnapshot,
}
