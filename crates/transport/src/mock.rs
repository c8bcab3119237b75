//! In-memory [`Transport`] for testing the publication pipeline and session
//! façade without a real pub/sub connection.

use crate::error::Result;
use crate::message::{Message, PresenceEvent, StatusEvent};
use crate::subscription::{Broadcaster, Subscription};
use crate::transport::Transport;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;

/// An in-memory transport. Channels subscribed to are tracked so tests can
/// assert on idempotency; `publish` records every call for inspection and
/// the `inject_*` methods let a test simulate device-originated traffic.
pub struct MockTransport {
    channels: Mutex<HashSet<String>>,
    published: Mutex<Vec<(String, Vec<u8>)>>,
    messages: Broadcaster<Message>,
    presence: Broadcaster<PresenceEvent>,
    status: Broadcaster<StatusEvent>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self {
            channels: Mutex::new(HashSet::new()),
            published: Mutex::new(Vec::new()),
            messages: Broadcaster::new(64),
            presence: Broadcaster::new(64),
            status: Broadcaster::new(16),
        }
    }
}

impl MockTransport {
    /// Every payload handed to [`Transport::publish`] so far, in order.
    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.published.lock().expect("lock poisoned").clone()
    }

    pub fn is_subscribed(&self, channel: &str) -> bool {
        self.channels.lock().expect("lock poisoned").contains(channel)
    }

    /// Simulates a device message arriving on the channel.
    pub fn inject_message(&self, message: Message) {
        self.messages.publish(message);
    }

    /// Simulates a presence change on the channel.
    pub fn inject_presence(&self, event: PresenceEvent) {
        self.presence.publish(event);
    }

    /// Simulates a connectivity change.
    pub fn inject_status(&self, event: StatusEvent) {
        self.status.publish(event);
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn subscribe(&self, channel: &str, _with_presence: bool) -> Result<()> {
        self.channels.lock().expect("lock poisoned").insert(channel.to_string());
        Ok(())
    }

    async fn unsubscribe(&self, channel: &str) -> Result<()> {
        self.channels.lock().expect("lock poisoned").remove(channel);
        Ok(())
    }

    async fn publish(&self, channel: &str, payload: &[u8]) -> Result<()> {
        self.published.lock().expect("lock poisoned").push((channel.to_string(), payload.to_vec()));
        Ok(())
    }

    fn messages(&self) -> Subscription<Message> {
        self.messages.subscribe()
    }

    fn presence(&self) -> Subscription<PresenceEvent> {
        self.presence.subscribe()
    }

    fn status(&self) -> Subscription<StatusEvent> {
        self.status.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::DeviceDescriptor;

    #[tokio::test]
    async fn subscribe_is_idempotent() {
        let transport = MockTransport::default();
        transport.subscribe("room-1", true).await.expect("subscribes");
        transport.subscribe("room-1", true).await.expect("subscribes again without error");
        assert!(transport.is_subscribed("room-1"));
    }

    #[tokio::test]
    async fn unsubscribe_of_unknown_channel_is_a_no_op() {
        let transport = MockTransport::default();
        transport.unsubscribe("never-joined").await.expect("no error");
    }

    #[tokio::test]
    async fn publish_is_recorded() {
        let transport = MockTransport::default();
        transport.publish("room-1", b"payload").await.expect("publishes");
        assert_eq!(transport.published(), vec![("room-1".to_string(), b"payload".to_vec())]);
    }

    #[tokio::test]
    async fn injected_presence_reaches_subscribers() {
        let transport = MockTransport::default();
        let mut presence = transport.presence();
        let device = DeviceDescriptor { id: "d1".into(), platform: None, name: None, client_sdk_version: None };
        transport.inject_presence(PresenceEvent::Join(device.clone()));
        assert_eq!(presence.recv().await, Some(PresenceEvent::Join(device)));
    }
}
