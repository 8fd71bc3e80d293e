//! The broadcast hub: connection registry plus fan-out.
//!
//! # Locking
//!
//! ```text
//!   fanout: tokio Mutex<()>                 held for a whole broadcast / close_all
//!     └─► registry: RwLock<FxHashMap<..>>   held only to snapshot or edit the map
//! ```
//!
//! Locks are always taken in that order. The registry lock is never held
//! across an `.await`; the fan-out lock is, while a broadcast waits for room
//! in full connection queues.
//!
//! # Fan-out
//!
//! A broadcast encodes the event once, snapshots the registry, delivers to
//! every connection in the snapshot, collects the failures, and only then
//! removes the failed connections. The map is never edited while it is being
//! iterated, so a racing `unregister` can neither skip nor double-process a
//! connection.
//!
//! # Backpressure
//!
//! Delivery into a connection's queue never touches a socket. When a queue
//! is full, the broadcast waits up to [`HubConfig::backpressure_timeout`] for
//! the transport to make room; all full queues wait concurrently, so one
//! broadcast is held up by at most one grace period. A connection still full
//! after the grace is dropped. A viewer that reads steadily therefore
//! survives bursts larger than its buffer.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use fc_core::{EventPayload, FileEvent, HubConfig};
use futures_util::future::join_all;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tokio::sync::Mutex;

use crate::connection::{Connection, ConnectionId, ConnectionState, DropReason, Outbound, Outbox};
use crate::error::HubError;
use crate::stats::{HubStats, HubStatsSnapshot};

/// Outcome of a single [`BroadcastHub::broadcast`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Connections the event was queued for.
    pub delivered: usize,

    /// Connections dropped during this broadcast, with the reason.
    pub dropped: SmallVec<[(ConnectionId, DropReason); 4]>,
}

impl BroadcastReport {
    /// Number of connections in the snapshot this broadcast iterated.
    #[inline]
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.delivered + self.dropped.len()
    }
}

/// Registry of live connections and fan-out broadcaster.
///
/// `BroadcastHub` is a cheap handle around shared state; clone it freely to
/// hand it to the transport, the dispatcher, and tests. All methods are safe
/// to call concurrently from any thread.
///
/// # Examples
///
/// ```
/// use fc_core::{ChangeKind, FileEvent, HubConfig};
/// use fc_hub::{BroadcastHub, Outbound};
/// use camino::Utf8PathBuf;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let hub = BroadcastHub::new(HubConfig::default());
/// let mut outbox = hub.register().unwrap();
///
/// let event = FileEvent::new(ChangeKind::Created, Utf8PathBuf::from("/tmp/logs/a.txt"));
/// let report = hub.broadcast(&event).await.unwrap();
/// assert_eq!(report.delivered, 1);
///
/// match outbox.try_recv().unwrap() {
///     Outbound::Event(json) => assert!(json.contains("file_created")),
///     Outbound::Close => unreachable!(),
/// }
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct BroadcastHub {
    inner: Arc<HubInner>,
}

#[derive(Debug)]
struct HubInner {
    config: HubConfig,
    registry: RwLock<FxHashMap<ConnectionId, Connection>>,
    fanout: Mutex<()>,
    next_id: AtomicU64,
    closed: AtomicBool,
    stats: HubStats,
}

impl BroadcastHub {
    /// Creates an empty hub.
    #[must_use]
    pub fn new(config: HubConfig) -> Self {
        Self {
            inner: Arc::new(HubInner {
                config,
                registry: RwLock::new(FxHashMap::default()),
                fanout: Mutex::new(()),
                next_id: AtomicU64::new(1),
                closed: AtomicBool::new(false),
                stats: HubStats::new(),
            }),
        }
    }

    /// Registers a new connection and returns the outbox the transport must
    /// drain.
    ///
    /// The connection receives every event broadcast after this call returns.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::ShuttingDown`] once [`close_all`](Self::close_all)
    /// has run.
    pub fn register(&self) -> Result<Outbox, HubError> {
        let id = ConnectionId::new(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let (connection, outbox) = Connection::open(id, self.inner.config.connection_buffer);

        {
            let mut registry = self.inner.registry.write();
            // Checked under the write lock so close_all cannot miss us.
            if self.inner.closed.load(Ordering::Acquire) {
                return Err(HubError::ShuttingDown);
            }
            registry.insert(id, connection);
        }

        self.inner.stats.record_open();
        tracing::debug!(conn_id = %id, "Connection registered");
        Ok(outbox)
    }

    /// Removes a connection from the registry.
    ///
    /// Idempotent: returns `false` if the connection was already gone, which
    /// happens when a client close races with a hub-initiated drop.
    pub fn unregister(&self, id: ConnectionId) -> bool {
        let removed = self.inner.registry.write().remove(&id);

        match removed {
            Some(connection) => {
                connection.set_state(ConnectionState::Closed);
                self.inner.stats.record_close();
                tracing::debug!(
                    conn_id = %id,
                    age_ms = connection.age().as_millis(),
                    "Connection unregistered"
                );
                true
            }
            None => false,
        }
    }

    /// Delivers an event to every registered connection.
    ///
    /// The event is encoded once. A full queue gets up to the configured
    /// backpressure grace to make room. A connection whose queue stays full
    /// for the whole grace, or whose transport has gone away, is dropped
    /// after the pass and reported in the result. Delivery to the other
    /// connections is unaffected.
    ///
    /// Concurrent broadcasts are serialized so every connection observes the
    /// same event order.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Serialize`] if the payload cannot be encoded.
    pub async fn broadcast(&self, event: &FileEvent) -> Result<BroadcastReport, HubError> {
        let payload: Arc<str> = Arc::from(EventPayload::from(event).encode()?);
        let report = self.broadcast_encoded(&payload).await;

        tracing::trace!(
            kind = %event.kind(),
            path = %event.path(),
            delivered = report.delivered,
            dropped = report.dropped.len(),
            "Event broadcast"
        );
        Ok(report)
    }

    async fn broadcast_encoded(&self, payload: &Arc<str>) -> BroadcastReport {
        let _fanout = self.inner.fanout.lock().await;

        let snapshot: Vec<Connection> = self.inner.registry.read().values().cloned().collect();
        let grace = self.inner.config.backpressure_timeout();

        let outcomes = join_all(
            snapshot
                .iter()
                .map(|connection| connection.deliver(Outbound::Event(Arc::clone(payload)), grace)),
        )
        .await;

        let mut report = BroadcastReport::default();
        for (connection, outcome) in snapshot.iter().zip(outcomes) {
            match outcome {
                Ok(()) => report.delivered += 1,
                Err(reason) => report.dropped.push((connection.id(), reason)),
            }
        }

        for &(id, reason) in &report.dropped {
            self.drop_connection(id, reason);
        }

        self.inner.stats.record_broadcast(report.delivered);
        report
    }

    fn drop_connection(&self, id: ConnectionId, reason: DropReason) {
        let removed = self.inner.registry.write().remove(&id);

        if let Some(connection) = removed {
            connection.set_state(ConnectionState::Closed);
            self.inner.stats.record_close();
            self.inner.stats.record_drop();
            tracing::warn!(conn_id = %id, reason = %reason, "Dropping connection");
        }
    }

    /// Closes every connection and stops accepting new ones.
    ///
    /// Waits for a broadcast that is currently fanning out to finish, then
    /// queues a best-effort close message for each connection and empties the
    /// registry. Returns the number of connections closed.
    pub async fn close_all(&self) -> usize {
        let _fanout = self.inner.fanout.lock().await;

        let drained: Vec<Connection> = {
            let mut registry = self.inner.registry.write();
            self.inner.closed.store(true, Ordering::Release);
            registry.drain().map(|(_, connection)| connection).collect()
        };

        for connection in &drained {
            connection.set_state(ConnectionState::Closing);
            if connection.try_deliver(Outbound::Close).is_err() {
                tracing::debug!(conn_id = %connection.id(), "Close message not queued");
            }
            connection.set_state(ConnectionState::Closed);
            self.inner.stats.record_close();
        }

        tracing::info!(count = drained.len(), "Closed all connections");
        drained.len()
    }

    /// Returns `true` once [`close_all`](Self::close_all) has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Number of currently registered connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.inner.registry.read().len()
    }

    /// Returns `true` if the connection is currently registered.
    #[must_use]
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.inner.registry.read().contains_key(&id)
    }

    /// Identifiers of the currently registered connections, sorted.
    #[must_use]
    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        let mut ids: Vec<ConnectionId> = self.inner.registry.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Returns a snapshot of the hub counters.
    #[must_use]
    pub fn stats(&self) -> HubStatsSnapshot {
        self.inner.stats.snapshot()
    }

    /// Returns the configuration the hub was built with.
    #[must_use]
    pub fn config(&self) -> &HubConfig {
        &self.inner.config
    }
}
