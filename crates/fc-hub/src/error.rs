//! Error types for the fc-hub crate.

/// Errors returned by hub operations.
///
/// Per-connection delivery failures are not errors: they are contained by
/// the hub, which drops the failing connection and carries on.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// The hub has been closed and no longer accepts connections.
    #[error("broadcast hub is shutting down")]
    ShuttingDown,

    /// The dispatcher side of the event channel is gone.
    #[error("event channel closed")]
    ChannelClosed,

    /// An event could not be encoded into its wire payload.
    #[error("failed to encode event payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl HubError {
    /// Returns `true` if retrying the operation later cannot succeed.
    #[inline]
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::ShuttingDown | Self::ChannelClosed)
    }
}
