//! Client struct definition
//!
//! Represents a registered session as the broker sees it: identity plus
//! the sending half of its bounded outbound queue.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::warn;

use crate::message::ServerMessage;
use crate::types::ClientId;

/// Connected client information
#[derive(Debug, Clone)]
pub struct Client {
    /// Unique identifier for this connection
    pub id: ClientId,
    /// Self-asserted display name, not unique
    pub name: String,
    /// Broker → Client queue (bounded)
    pub sender: mpsc::Sender<ServerMessage>,
}

impl Client {
    /// Create a new client with the given ID, name and sender channel
    pub fn new(id: ClientId, name: impl Into<String>, sender: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            id,
            name: name.into(),
            sender,
        }
    }

    /// Enqueue a message without waiting
    ///
    /// A full or closed queue drops the message for this client only.
    /// Returns whether the message was queued.
    pub fn try_deliver(&self, msg: ServerMessage) -> bool {
        match self.sender.try_send(msg) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("Outbound queue full for {} ({}), message dropped", self.name, self.id);
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{ChatMessage, InboxSignal};

    #[tokio::test]
    async fn test_client_creation() {
        let (tx, _rx) = mpsc::channel(4);
        let client = Client::new(ClientId::new(), "Alice", tx);
        assert_eq!(client.name, "Alice");
    }

    #[tokio::test]
    async fn test_try_deliver_drops_newest_when_full() {
        let (tx, mut rx) = mpsc::channel(1);
        let client = Client::new(ClientId::new(), "Alice", tx);

        assert!(client.try_deliver(ServerMessage::Chat(ChatMessage::system("first"))));
        assert!(!client.try_deliver(ServerMessage::Chat(ChatMessage::system("second"))));

        let queued = rx.recv().await.unwrap();
        assert_eq!(queued, ServerMessage::Chat(ChatMessage::system("first")));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_try_deliver_closed_queue() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let client = Client::new(ClientId::new(), "Alice", tx);
        assert!(!client.try_deliver(ServerMessage::Signal(InboxSignal::update())));
    }
}
