//! Pub/sub transport adapter: subscribe, publish, and presence/status
//! streams, decoupled from any one wire protocol.

mod decode;
pub mod error;
mod message;
mod mock;
mod subscription;
mod transport;
mod websocket;

pub use crate::message::{DecodedError, DeviceDescriptor, Message, PresenceEvent, StatusEvent};
pub use crate::mock::MockTransport;
pub use crate::subscription::{Broadcaster, Subscription};
pub use crate::transport::Transport;
pub use crate::websocket::WebSocketTransport;

use std::sync::Arc;

/// A shared handle to a transport, the form every consumer actually holds.
pub type TransportHandle = Arc<dyn Transport>;
