//! The [`Transport`] trait: a thin abstraction over a pub/sub client.

use crate::error::Result;
use crate::message::{Message, PresenceEvent, StatusEvent};
use crate::subscription::Subscription;
use async_trait::async_trait;

/// A pub/sub client capable of subscribing to a channel, publishing to it,
/// and exposing message/presence/status events as independent streams.
///
/// `subscribe` and `unsubscribe` are idempotent: calling either a second
/// time with the same channel is a no-op rather than an error.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Subscribes to `channel`. If `with_presence` is set, join/leave/timeout
    /// events for the channel are also delivered via [`presence`](Self::presence).
    /// A repeat call for a channel already subscribed to is a no-op.
    async fn subscribe(&self, channel: &str, with_presence: bool) -> Result<()>;

    /// Unsubscribes from `channel`. A repeat call, or a call for a channel
    /// never subscribed to, is a no-op.
    async fn unsubscribe(&self, channel: &str) -> Result<()>;

    /// Publishes `payload` to `channel`. Delivery is at-most-once with no
    /// ordering guarantee relative to other publishes; a successful return
    /// only signals that the transport accepted the send.
    async fn publish(&self, channel: &str, payload: &[u8]) -> Result<()>;

    /// A stream of device-originated messages across all subscribed channels.
    fn messages(&self) -> Subscription<Message>;

    /// A stream of presence changes across all subscribed channels with
    /// presence enabled.
    fn presence(&self) -> Subscription<PresenceEvent>;

    /// A stream of connectivity changes for the underlying connection.
    fn status(&self) -> Subscription<StatusEvent>;
}
