//! Wire types a device sends back to the host over the channel.

use serde::{Deserialize, Serialize};

/// A device-originated message, decoded from its `type` discriminant.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// A forwarded `console.*` call from device-side code.
    Console { device: Option<String>, method: String, payload: Vec<serde_json::Value> },
    /// An uncaught error from device-side code.
    Error { device: Option<String>, error: DecodedError },
    /// The device never received a usable bundle and is asking for a fresh one.
    ResendCode,
}

/// An uncaught device-side error, decoded from its raw JSON string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DecodedError {
    pub message: String,
    pub stack: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

/// A device, as decoded from a presence subscriber identifier. Identifiers
/// that don't decode to this shape are silently ignored — they're not a
/// device, just some other subscriber on the channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub id: String,
    pub platform: Option<String>,
    pub name: Option<String>,
    pub client_sdk_version: Option<String>,
}

/// A presence change on the channel.
#[derive(Debug, Clone, PartialEq)]
pub enum PresenceEvent {
    Join(DeviceDescriptor),
    Leave(DeviceDescriptor),
    Timeout(DeviceDescriptor),
}

/// Connectivity state of the underlying transport connection itself, as
/// distinct from channel-level presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEvent {
    Connected,
    Disconnected,
    Reconnected,
}
