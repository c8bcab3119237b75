//! A fan-out event stream multiple listeners can subscribe to
//! independently, built on [`tokio::sync::broadcast`].

use tokio::sync::broadcast;

/// Broadcasts events of type `T` to any number of [`Subscription`]s. Cheaply
/// cloneable — every clone shares the same underlying channel, which is how
/// a background task holds onto a handle to publish into while the owning
/// struct keeps its own handle for `subscribe`.
#[derive(Clone)]
pub struct Broadcaster<T: Clone> {
    sender: broadcast::Sender<T>,
}

impl<T: Clone> Broadcaster<T> {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Sends `event` to every current subscriber. A send with zero active
    /// subscribers is not an error — it's the common case between device
    /// connections.
    pub fn publish(&self, event: T) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> Subscription<T> {
        Subscription { receiver: self.sender.subscribe() }
    }
}

/// A single listener's view of a [`Broadcaster`].
pub struct Subscription<T: Clone> {
    receiver: broadcast::Receiver<T>,
}

impl<T: Clone> Subscription<T> {
    /// Awaits the next event, transparently catching up past any events
    /// dropped due to a slow consumer rather than surfacing `Lagged` to
    /// callers. Returns `None` once the broadcaster itself is gone.
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_subscriber_receives_published_events() {
        let broadcaster = Broadcaster::new(8);
        let mut a = broadcaster.subscribe();
        let mut b = broadcaster.subscribe();
        broadcaster.publish("hello");
        assert_eq!(a.recv().await, Some("hello"));
        assert_eq!(b.recv().await, Some("hello"));
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_does_not_panic() {
        let broadcaster: Broadcaster<&str> = Broadcaster::new(8);
        broadcaster.publish("nobody's listening");
    }

    #[tokio::test]
    async fn closed_broadcaster_ends_the_subscription() {
        let broadcaster: Broadcaster<&str> = Broadcaster::new(8);
        let mut sub = broadcaster.subscribe();
        drop(broadcaster);
        assert_eq!(sub.recv().await, None);
    }
}
