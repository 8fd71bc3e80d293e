//! Configuration structures for filecast.
//!
//! This module provides configuration types for all components of the service:
//!
//! - [`WatchConfig`] - Watched roots, extra ignore rules, handoff queue size
//! - [`HubConfig`] - Per-connection outbound buffering and backpressure grace
//! - [`ServerConfig`] - Listen address, static bundle, socket timeouts
//! - [`Config`] - Root configuration combining all settings
//!
//! All configuration types implement [`Default`] and deserialize with
//! `#[serde(default)]`, so a configuration file only needs the keys it
//! overrides.

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Largest accepted queue size for `watch.channel_capacity` and
/// `hub.connection_buffer`.
pub const MAX_QUEUE_CAPACITY: usize = 1 << 20;

/// Largest accepted value for the millisecond timeouts.
pub const MAX_TIMEOUT_MS: u64 = 60 * 60 * 1_000;

/// Largest accepted keep-alive ping interval.
pub const MAX_PING_INTERVAL_SECS: u64 = 24 * 60 * 60;

/// Configuration for the filesystem watcher.
///
/// # Examples
///
/// ```
/// use fc_core::WatchConfig;
///
/// let config = WatchConfig::default();
/// assert!(config.roots.is_empty());
/// assert_eq!(config.channel_capacity, 1024);
/// assert!(!config.required);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Root directories to watch recursively.
    ///
    /// Roots that do not exist at start-up are skipped with a warning.
    pub roots: Vec<Utf8PathBuf>,

    /// Ignore patterns added on top of the built-in rule set.
    ///
    /// A pattern starting with `*` is a suffix rule (`*.log`), anything else
    /// is a case-insensitive substring rule (`build/`).
    pub ignore: Vec<String>,

    /// Capacity of the queue between the notification thread and the hub.
    pub channel_capacity: usize,

    /// Refuse to start when the watcher cannot be brought up.
    ///
    /// When `false`, a watcher failure is logged and the service keeps
    /// serving connections without live updates.
    pub required: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            ignore: Vec::new(),
            channel_capacity: 1024,
            required: false,
        }
    }
}

/// Configuration for the broadcast hub.
///
/// # Examples
///
/// ```
/// use fc_core::HubConfig;
///
/// use std::time::Duration;
///
/// let config = HubConfig::default();
/// assert_eq!(config.connection_buffer, 64);
/// assert_eq!(config.backpressure_timeout(), Duration::from_secs(5));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Number of undelivered messages a connection may queue.
    pub connection_buffer: usize,

    /// How long a broadcast waits for room in a full connection queue
    /// before dropping that connection.
    pub backpressure_timeout_ms: u64,
}

impl HubConfig {
    /// Returns the grace a full connection queue gets before the
    /// connection is dropped.
    #[inline]
    #[must_use]
    pub const fn backpressure_timeout(&self) -> Duration {
        Duration::from_millis(self.backpressure_timeout_ms)
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            connection_buffer: 64,
            backpressure_timeout_ms: 5_000,
        }
    }
}

/// Configuration for the HTTP/WebSocket transport.
///
/// # Examples
///
/// ```
/// use fc_core::ServerConfig;
/// use std::time::Duration;
///
/// let config = ServerConfig::default();
/// assert_eq!(config.bind_address(), "127.0.0.1:8765");
/// assert_eq!(config.write_timeout(), Duration::from_secs(5));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to listen on.
    pub host: String,

    /// TCP port to listen on. `0` picks a free port.
    pub port: u16,

    /// Directory holding the static dashboard bundle, if any.
    pub static_dir: Option<Utf8PathBuf>,

    /// Maximum time a single WebSocket write may take before the
    /// connection is considered stalled.
    pub write_timeout_ms: u64,

    /// Interval between keep-alive pings.
    pub ping_interval_secs: u64,

    /// Upper bound on how long shutdown waits for queued events to drain.
    pub shutdown_timeout_ms: u64,
}

impl ServerConfig {
    /// Returns the `host:port` string to bind.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the per-write timeout.
    #[inline]
    #[must_use]
    pub const fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    /// Returns the keep-alive ping interval.
    #[inline]
    #[must_use]
    pub const fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }

    /// Returns the shutdown drain timeout.
    #[inline]
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8765,
            static_dir: None,
            write_timeout_ms: 5_000,
            ping_interval_secs: 30,
            shutdown_timeout_ms: 2_000,
        }
    }
}

/// Root configuration for filecast.
///
/// Combines all component configurations into a single structure that can be
/// loaded from a JSON file or constructed programmatically.
///
/// # Examples
///
/// ```
/// use fc_core::Config;
///
/// let config = Config::default();
/// assert!(config.validate().is_ok());
///
/// let json = serde_json::to_string_pretty(&config).unwrap();
/// assert!(json.contains("connection_buffer"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Watcher configuration.
    pub watch: WatchConfig,

    /// Broadcast hub configuration.
    pub hub: HubConfig,

    /// Transport configuration.
    pub server: ServerConfig,
}

impl Config {
    /// Loads a configuration from a JSON file.
    ///
    /// Missing keys fall back to their defaults. The result is not validated;
    /// call [`validate`](Self::validate) once command-line overrides have
    /// been applied.
    pub fn from_json_file(path: &Utf8Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Checks option values that would make the service unusable.
    ///
    /// Watched roots are deliberately not checked here: a missing root only
    /// reduces coverage and is reported by the watcher.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let queue_max = MAX_QUEUE_CAPACITY as u64;
        require_in_range("watch.channel_capacity", self.watch.channel_capacity as u64, queue_max)?;
        require_in_range("hub.connection_buffer", self.hub.connection_buffer as u64, queue_max)?;
        require_in_range(
            "hub.backpressure_timeout_ms",
            self.hub.backpressure_timeout_ms,
            MAX_TIMEOUT_MS,
        )?;
        require_in_range("server.write_timeout_ms", self.server.write_timeout_ms, MAX_TIMEOUT_MS)?;
        require_in_range(
            "server.ping_interval_secs",
            self.server.ping_interval_secs,
            MAX_PING_INTERVAL_SECS,
        )?;
        require_in_range(
            "server.shutdown_timeout_ms",
            self.server.shutdown_timeout_ms,
            MAX_TIMEOUT_MS,
        )?;

        if self.server.host.trim().is_empty() {
            return Err(ConfigError::InvalidOption {
                option: "server.host".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if let Some(dir) = self.server.static_dir.as_ref().filter(|dir| !dir.is_dir()) {
            return Err(ConfigError::MissingDirectory(dir.clone()));
        }

        if let Some(pattern) = self
            .watch
            .ignore
            .iter()
            .find(|p| p.trim_start_matches('*').is_empty())
        {
            return Err(ConfigError::InvalidOption {
                option: "watch.ignore".to_owned(),
                reason: format!("pattern '{pattern}' matches nothing useful"),
            });
        }

        Ok(())
    }
}

fn require_in_range(option: &str, value: u64, max: u64) -> Result<(), ConfigError> {
    let reason = if value == 0 {
        "must be greater than zero".to_owned()
    } else if value > max {
        format!("must be at most {max}")
    } else {
        return Ok(());
    };

    Err(ConfigError::InvalidOption {
        option: option.to_owned(),
        reason,
    })
}
