//! A [`Transport`] backed by a real WebSocket connection to the pub/sub
//! service.
//!
//! The wire protocol is a thin envelope: every frame carries a `channel`
//! field alongside either a `subscribe`/`unsubscribe`/`publish` operation
//! (outbound) or a device payload (inbound). A background task owns the
//! socket and fans incoming frames out to [`messages`](Transport::messages),
//! [`presence`](Transport::presence) and [`status`](Transport::status).

use crate::decode::{decode_device_descriptor, decode_message};
use crate::error::{ErrorKind, Result};
use crate::message::{Message, PresenceEvent, StatusEvent};
use crate::subscription::{Broadcaster, Subscription};
use crate::transport::Transport;
use async_trait::async_trait;
use exn::ResultExt;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WireMessage;
use tracing::{debug, warn};

#[derive(Serialize)]
#[serde(tag = "op", rename_all = "SCREAMING_SNAKE_CASE")]
enum Envelope<'a> {
    Subscribe { channel: &'a str, with_presence: bool },
    Unsubscribe { channel: &'a str },
    Publish { channel: &'a str, payload: &'a [u8] },
}

/// A live transport connected to the pub/sub service over WebSocket.
pub struct WebSocketTransport {
    channels: Mutex<HashSet<String>>,
    outbound: mpsc::UnboundedSender<WireMessage>,
    messages: Broadcaster<Message>,
    presence: Broadcaster<PresenceEvent>,
    status: Broadcaster<StatusEvent>,
}

impl WebSocketTransport {
    /// Connects to `url` and spawns the background task that services the
    /// socket for the lifetime of the returned transport.
    pub async fn connect(url: &str) -> Result<Self> {
        let (socket, _response) =
            connect_async(url).await.or_raise(|| ErrorKind::Connection(format!("failed to connect to {url}")))?;
        let (mut write, mut read) = socket.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<WireMessage>();

        let messages = Broadcaster::new(256);
        let presence = Broadcaster::new(64);
        let status = Broadcaster::new(16);

        let inbound_messages = messages.clone();
        let inbound_presence = presence.clone();
        let inbound_status = status.clone();

        tokio::spawn(async move {
            inbound_status.publish(StatusEvent::Connected);
            loop {
                tokio::select! {
                    outgoing = outbound_rx.recv() => {
                        match outgoing {
                            Some(frame) => {
                                if let Err(err) = write.send(frame).await {
                                    warn!(error = %err, "transport write failed");
                                    break;
                                }
                            }
                            None => break,
                        }
                    }
                    incoming = read.next() => {
                        match incoming {
                            Some(Ok(WireMessage::Text(text))) => {
                                handle_inbound_frame(text.as_bytes(), &inbound_messages, &inbound_presence);
                            }
                            Some(Ok(WireMessage::Binary(bytes))) => {
                                handle_inbound_frame(&bytes, &inbound_messages, &inbound_presence);
                            }
                            Some(Ok(_)) => {}
                            Some(Err(err)) => {
                                warn!(error = %err, "transport read failed");
                                inbound_status.publish(StatusEvent::Disconnected);
                                break;
                            }
                            None => {
                                inbound_status.publish(StatusEvent::Disconnected);
                                break;
                            }
                        }
                    }
                }
            }
        });

        Ok(Self { channels: Mutex::new(HashSet::new()), outbound: outbound_tx, messages, presence, status })
    }

    fn send(&self, frame: Envelope<'_>) -> Result<()> {
        let text = serde_json::to_string(&frame).or_raise(|| ErrorKind::Encode("failed to encode transport frame".to_string()))?;
        self.outbound
            .send(WireMessage::Text(text.into()))
            .or_raise(|| ErrorKind::Connection("outbound channel closed".to_string()))?;
        Ok(())
    }
}

/// A presence frame on the wire: `{"op":"PRESENCE","channel":"...","event":"JOIN","identifier":"..."}`.
fn handle_inbound_frame(raw: &[u8], messages: &Broadcaster<Message>, presence: &Broadcaster<PresenceEvent>) {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(raw) else {
        debug!("dropped undecodable transport frame");
        return;
    };
    match value.get("op").and_then(serde_json::Value::as_str) {
        Some("PRESENCE") => {
            let Some(identifier) = value.get("identifier").and_then(serde_json::Value::as_str) else { return };
            let Some(device) = decode_device_descriptor(identifier) else {
                debug!(identifier, "presence identifier did not decode as a device");
                return;
            };
            match value.get("event").and_then(serde_json::Value::as_str) {
                Some("JOIN") => presence.publish(PresenceEvent::Join(device)),
                Some("LEAVE") => presence.publish(PresenceEvent::Leave(device)),
                Some("TIMEOUT") => presence.publish(PresenceEvent::Timeout(device)),
                _ => {}
            }
        }
        _ => {
            if let Some(message) = decode_message(raw) {
                messages.publish(message);
            }
        }
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn subscribe(&self, channel: &str, with_presence: bool) -> Result<()> {
        if !self.channels.lock().expect("lock poisoned").insert(channel.to_string()) {
            return Ok(());
        }
        self.send(Envelope::Subscribe { channel, with_presence })
    }

    async fn unsubscribe(&self, channel: &str) -> Result<()> {
        if !self.channels.lock().expect("lock poisoned").remove(channel) {
            return Ok(());
        }
        self.send(Envelope::Unsubscribe { channel })
    }

    async fn publish(&self, channel: &str, payload: &[u8]) -> Result<()> {
        self.send(Envelope::Publish { channel, payload })
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
