//! Destinations for events produced on the watcher thread.

use fc_core::FileEvent;

/// Accepts events from the watcher's notification thread.
///
/// `forward` is called outside any async runtime and may block while the
/// destination makes room. It returns `false` once the destination is gone,
/// after which the watcher stops forwarding the remaining changes of that
/// notification.
pub trait EventForwarder: Send + Sync + 'static {
    /// Hands one event to the destination.
    fn forward(&self, event: FileEvent) -> bool;
}

impl EventForwarder for fc_hub::EventSink {
    fn forward(&self, event: FileEvent) -> bool {
        self.send_blocking(event).is_ok()
    }
}

impl EventForwarder for tokio::sync::mpsc::UnboundedSender<FileEvent> {
    fn forward(&self, event: FileEvent) -> bool {
        self.send(event).is_ok()
    }
}

impl<S: EventForwarder + ?Sized> EventForwarder for std::sync::Arc<S> {
    fn forward(&self, event: FileEvent) -> bool {
        (**self).forward(event)
    }
}
