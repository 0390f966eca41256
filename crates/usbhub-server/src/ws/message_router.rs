//! Directed message delivery between live connections.

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::mpsc;
use usbhub_protocol::Frame;

/// Channel sender capable of pushing WS frames to a connected peer.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// Outbound channels of the connections served by this process.
#[derive(Debug, Default)]
pub struct MessageRouter {
    /// connection_id → outbound channel
    peers: DashMap<String, WsSender>,
}

impl MessageRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, connection_id: &str, tx: WsSender) {
        self.peers.insert(connection_id.to_string(), tx);
    }

    pub fn detach(&self, connection_id: &str) {
        self.peers.remove(connection_id);
    }

    /// Push `ReceiveMessage(sender, payload)` to one connection.
    ///
    /// Best effort: returns whether the frame was handed to the target's
    /// socket task. An unknown or closed target is dropped silently.
    pub fn route(&self, target_connection_id: &str, sender: &str, payload: &str) -> bool {
        let text = match Frame::receive_message(sender, payload).encode() {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("Failed to encode ReceiveMessage frame: {}", e);
                return false;
            }
        };

        let delivered = match self.peers.get(target_connection_id) {
            Some(tx) => tx.send(Message::Text(text.into())).is_ok(),
            None => false,
        };

        if !delivered {
            tracing::debug!(%target_connection_id, "Directed message target not connected");
        }
        delivered
    }
}
