//! Per-connection state owned by the hub.
//!
//! A connection is split in two when it is registered:
//!
//! - [`Connection`] stays inside the hub registry and holds the sending half
//!   of a bounded queue. Only the hub writes to it or closes it.
//! - [`Outbox`] is handed to the transport, which drains it onto the socket.
//!
//! ```text
//!   BroadcastHub ── deliver ──► [ bounded queue ] ──► Outbox ──► socket writer
//!   (Connection)                                     (transport task)
//! ```
//!
//! The queue is per connection, so a stalled client only ever fills its own
//! queue and every connection sees events in the order they were broadcast.
//! A full queue is given a bounded grace to make room before the hub gives
//! up on it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{SendTimeoutError, TryRecvError, TrySendError};

/// Identifier assigned to a connection at registration.
///
/// Identifiers are unique for the lifetime of a hub and never reused.
///
/// # Examples
///
/// ```
/// use fc_hub::ConnectionId;
///
/// let id = ConnectionId::new(7);
/// assert_eq!(id.get(), 7);
/// assert_eq!(id.to_string(), "conn-7");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wraps a raw identifier.
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw identifier.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Lifecycle of a connection as seen by the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ConnectionState {
    /// Registered and receiving broadcasts.
    Open = 0,

    /// The hub has decided to close the connection; a close message may
    /// still be queued.
    Closing = 1,

    /// Removed from the registry. Queued messages may still be drained.
    Closed = 2,
}

impl ConnectionState {
    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Open,
            1 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

/// Atomic cell shared between a [`Connection`] and its [`Outbox`].
#[derive(Debug)]
struct StateCell(AtomicU8);

impl StateCell {
    fn new(state: ConnectionState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    fn load(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn store(&self, state: ConnectionState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

/// A message queued for delivery to one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// An encoded event payload, shared by every connection it was sent to.
    Event(Arc<str>),

    /// The hub is closing this connection; send a close frame.
    Close,
}

/// Why the hub gave up on a connection during a broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// The connection's queue stayed full for the whole backpressure grace.
    Backpressure,

    /// The transport side of the connection has gone away.
    Disconnected,
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Backpressure => f.write_str("backpressure"),
            Self::Disconnected => f.write_str("disconnected"),
        }
    }
}

/// Hub-side record of a registered connection.
///
/// Cloning is cheap (a channel sender and an `Arc`); the hub clones records
/// when it snapshots the registry for a broadcast.
#[derive(Debug, Clone)]
pub(crate) struct Connection {
    id: ConnectionId,
    sender: mpsc::Sender<Outbound>,
    state: Arc<StateCell>,
    opened_at: Instant,
}

impl Connection {
    /// Creates a connection record and the outbox the transport will drain.
    pub(crate) fn open(id: ConnectionId, buffer: usize) -> (Self, Outbox) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        let state = Arc::new(StateCell::new(ConnectionState::Open));

        let connection = Self {
            id,
            sender,
            state: Arc::clone(&state),
            opened_at: Instant::now(),
        };
        let outbox = Outbox {
            id,
            receiver,
            state,
        };

        (connection, outbox)
    }

    pub(crate) const fn id(&self) -> ConnectionId {
        self.id
    }

    pub(crate) fn set_state(&self, state: ConnectionState) {
        self.state.store(state);
    }

    pub(crate) fn age(&self) -> std::time::Duration {
        self.opened_at.elapsed()
    }

    /// Queues a message without waiting.
    pub(crate) fn try_deliver(&self, message: Outbound) -> Result<(), DropReason> {
        self.sender.try_send(message).map_err(|err| match err {
            TrySendError::Full(_) => DropReason::Backpressure,
            TrySendError::Closed(_) => DropReason::Disconnected,
        })
    }

    /// Queues a message, waiting at most `grace` for room if the queue is
    /// full.
    pub(crate) async fn deliver(
        &self,
        message: Outbound,
        grace: Duration,
    ) -> Result<(), DropReason> {
        let message = match self.sender.try_send(message) {
            Ok(()) => return Ok(()),
            Err(TrySendError::Closed(_)) => return Err(DropReason::Disconnected),
            Err(TrySendError::Full(message)) => message,
        };

        self.sender
            .send_timeout(message, grace)
            .await
            .map_err(|err| match err {
                SendTimeoutError::Timeout(_) => DropReason::Backpressure,
                SendTimeoutError::Closed(_) => DropReason::Disconnected,
            })
    }
}

/// Receiving side of a connection, drained by the transport.
///
/// Once the hub unregisters the connection, [`recv`](Self::recv) yields
/// whatever is still queued and then returns `None`.
#[derive(Debug)]
pub struct Outbox {
    id: ConnectionId,
    receiver: mpsc::Receiver<Outbound>,
    state: Arc<StateCell>,
}

impl Outbox {
    /// Returns the identifier the hub assigned to this connection.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns the connection's lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state.load()
    }

    /// Receives the next queued message.
    ///
    /// Returns `None` once the hub has dropped the connection and the queue
    /// is empty.
    pub async fn recv(&mut self) -> Option<Outbound> {
        self.receiver.recv().await
    }

    /// Receives a queued message without waiting.
    pub fn try_recv(&mut self) -> Result<Outbound, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Drains every message currently queued.
    pub fn drain(&mut self) -> Vec<Outbound> {
        let mut messages = Vec::new();
        while let Ok(message) = self.receiver.try_recv() {
            messages.push(message);
        }
        messages
    }
}
