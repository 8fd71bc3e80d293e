//! Hub statistics with atomic counters.
//!
//! [`HubStats`] is updated from the broadcast and registration paths;
//! [`HubStatsSnapshot`] is the serializable point-in-time view exposed on the
//! status endpoint.
//!
//! All counters use [`Relaxed`](std::sync::atomic::Ordering::Relaxed)
//! ordering. They are informational and never used for coordination.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Atomic counters describing hub activity since start-up.
#[derive(Debug, Default)]
pub struct HubStats {
    connections_opened: AtomicU64,
    connections_closed: AtomicU64,
    connections_dropped: AtomicU64,
    events_broadcast: AtomicU64,
    deliveries: AtomicU64,
}

impl HubStats {
    /// Creates a new [`HubStats`] with all counters at zero.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn record_open(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_close(&self) {
        self.connections_closed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_drop(&self) {
        self.connections_dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_broadcast(&self, delivered: usize) {
        self.events_broadcast.fetch_add(1, Ordering::Relaxed);
        self.deliveries.fetch_add(delivered as u64, Ordering::Relaxed);
    }

    /// Returns a point-in-time snapshot of all counters.
    ///
    /// # Examples
    ///
    /// ```
    /// use fc_hub::HubStats;
    ///
    /// let stats = HubStats::new();
    /// assert_eq!(stats.snapshot().events_broadcast, 0);
    /// ```
    #[must_use]
    pub fn snapshot(&self) -> HubStatsSnapshot {
        HubStatsSnapshot {
            connections_opened: self.connections_opened.load(Ordering::Relaxed),
            connections_closed: self.connections_closed.load(Ordering::Relaxed),
            connections_dropped: self.connections_dropped.load(Ordering::Relaxed),
            events_broadcast: self.events_broadcast.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
        }
    }
}

/// Serializable snapshot of [`HubStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubStatsSnapshot {
    /// Connections ever registered.
    pub connections_opened: u64,
    /// Connections removed from the registry, for any reason.
    pub connections_closed: u64,
    /// Connections the hub removed because delivery failed.
    pub connections_dropped: u64,
    /// Events fanned out.
    pub events_broadcast: u64,
    /// Individual event deliveries queued across all connections.
    pub deliveries: u64,
}

impl HubStatsSnapshot {
    /// Number of connections registered and not yet removed.
    #[inline]
    #[must_use]
    pub const fn open_connections(&self) -> u64 {
        self.connections_opened
            .saturating_sub(self.connections_closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let stats = HubStats::new();
        stats.record_open();
        stats.record_open();
        stats.record_close();
        stats.record_drop();
        stats.record_broadcast(3);
        stats.record_broadcast(0);

        let snap = stats.snapshot();
        assert_eq!(snap.connections_opened, 2);
        assert_eq!(snap.connections_closed, 1);
        assert_eq!(snap.connections_dropped, 1);
        assert_eq!(snap.events_broadcast, 2);
        assert_eq!(snap.deliveries, 3);
        assert_eq!(snap.open_connections(), 1);
    }

    #[test]
    fn test_snapshot_serialization() {
        let stats = HubStats::new();
        stats.record_open();
        stats.record_broadcast(1);

        insta::assert_json_snapshot!(stats.snapshot(), @r#"
        {
          "connections_opened": 1,
          "connections_closed": 0,
          "connections_dropped": 0,
          "events_broadcast": 1,
          "deliveries": 1
        }
        "#);
    }
}
