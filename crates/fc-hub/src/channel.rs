//! Handoff from the watcher thread into the async hub.
//!
//! ```text
//!   notify thread ── send_blocking ──► [ bounded mpsc ] ──► Dispatcher ──► BroadcastHub::broadcast
//! ```
//!
//! The channel is FIFO and has a single consumer, so events are broadcast in
//! the order the watcher produced them. The consumer never waits on a socket,
//! only on full connection queues and then for at most the hub's backpressure
//! grace, which bounds how long a producer can be held up by a full channel.

use fc_core::FileEvent;
use tokio::sync::mpsc;

use crate::error::HubError;
use crate::hub::BroadcastHub;

/// Producer handle for events headed to the hub.
///
/// Cloneable; the dispatcher finishes once every clone has been dropped.
#[derive(Debug, Clone)]
pub struct EventSink {
    sender: mpsc::Sender<FileEvent>,
}

impl EventSink {
    /// Queues an event from a thread outside the tokio runtime, waiting for
    /// capacity if the channel is full.
    ///
    /// Must not be called from within an async context.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::ChannelClosed`] if the dispatcher is gone.
    pub fn send_blocking(&self, event: FileEvent) -> Result<(), HubError> {
        self.sender
            .blocking_send(event)
            .map_err(|_| HubError::ChannelClosed)
    }

    /// Queues an event from async code.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::ChannelClosed`] if the dispatcher is gone.
    pub async fn send(&self, event: FileEvent) -> Result<(), HubError> {
        self.sender
            .send(event)
            .await
            .map_err(|_| HubError::ChannelClosed)
    }

    /// Returns `true` if the dispatcher has stopped receiving.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Consumer side of the event channel.
///
/// Drives [`BroadcastHub::broadcast`] for each queued event.
#[derive(Debug)]
pub struct Dispatcher {
    hub: BroadcastHub,
    events: mpsc::Receiver<FileEvent>,
}

impl Dispatcher {
    /// Broadcasts queued events until every [`EventSink`] has been dropped
    /// and the queue is empty. Returns the number of events broadcast.
    pub async fn run(mut self) -> u64 {
        let mut broadcast = 0_u64;

        while let Some(event) = self.events.recv().await {
            match self.hub.broadcast(&event).await {
                Ok(_) => broadcast += 1,
                Err(e) => {
                    tracing::error!(path = %event.path(), error = %e, "Failed to broadcast event");
                }
            }
        }

        tracing::debug!(events = broadcast, "Dispatcher finished");
        broadcast
    }
}

impl BroadcastHub {
    /// Creates a bounded event channel feeding this hub.
    ///
    /// Spawn [`Dispatcher::run`] on the runtime and hand the [`EventSink`] to
    /// the producer.
    ///
    /// # Examples
    ///
    /// ```
    /// use fc_core::HubConfig;
    /// use fc_hub::BroadcastHub;
    ///
    /// let hub = BroadcastHub::new(HubConfig::default());
    /// let (sink, dispatcher) = hub.channel(16);
    /// assert!(!sink.is_closed());
    /// drop(dispatcher);
    /// assert!(sink.is_closed());
    /// ```
    #[must_use]
    pub fn channel(&self, capacity: usize) -> (EventSink, Dispatcher) {
        let (sender, events) = mpsc::channel(capacity.max(1));
        let dispatcher = Dispatcher {
            hub: self.clone(),
            events,
        };
        (EventSink { sender }, dispatcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Outbound;
    use camino::Utf8PathBuf;
    use fc_core::{ChangeKind, EventPayload, HubConfig};

    fn event(name: &str) -> FileEvent {
        FileEvent::new(ChangeKind::Created, Utf8PathBuf::from(format!("/srv/{name}")))
    }

    #[tokio::test]
    async fn test_dispatcher_preserves_order_and_drains() {
        let hub = BroadcastHub::new(HubConfig::default());
        let mut outbox = hub.register().unwrap();
        let (sink, dispatcher) = hub.channel(8);

        for name in ["a", "b", "c"] {
            sink.send(event(name)).await.unwrap();
        }
        drop(sink);

        assert_eq!(dispatcher.run().await, 3);

        let received: Vec<String> = outbox
            .drain()
            .into_iter()
            .map(|message| match message {
                Outbound::Event(json) => EventPayload::decode(&json).unwrap().path,
                Outbound::Close => panic!("unexpected close"),
            })
            .collect();
        assert_eq!(received, vec!["/srv/a", "/srv/b", "/srv/c"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_send_blocking_from_plain_thread() {
        let hub = BroadcastHub::new(HubConfig::default());
        let mut outbox = hub.register().unwrap();
        let (sink, dispatcher) = hub.channel(1);
        let task = tokio::spawn(dispatcher.run());

        let producer = std::thread::spawn(move || {
            for n in 0..10 {
                sink.send_blocking(event(&n.to_string())).unwrap();
            }
        });
        producer.join().unwrap();

        assert_eq!(task.await.unwrap(), 10);
        assert_eq!(outbox.drain().len(), 10);
    }

    #[tokio::test]
    async fn test_send_after_dispatcher_dropped() {
        let hub = BroadcastHub::new(HubConfig::default());
        let (sink, dispatcher) = hub.channel(4);
        drop(dispatcher);

        assert!(matches!(
            sink.send(event("late")).await,
            Err(HubError::ChannelClosed)
        ));
    }
}
