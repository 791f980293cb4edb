//! Client struct definition
//!
//! Represents an admitted session as the registry sees it: its outbox and,
//! once the handshake is done, its display name.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::error::SendError;
use crate::message::ServerMessage;
use crate::types::SessionId;

/// Connected client information
#[derive(Debug)]
pub struct Client {
    /// Unique identifier for this session
    pub id: SessionId,
    /// Display name (None until the handshake completes)
    pub name: Option<String>,
    /// Server → Client message channel, drained by the session's writer task
    pub sender: mpsc::Sender<ServerMessage>,
}

impl Client {
    /// Create a new, not yet named client
    pub fn new(id: SessionId, sender: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            id,
            name: None,
            sender,
        }
    }

    /// Queue a message for this client without waiting
    ///
    /// Returns an error if the channel is closed (writer task gone) or full
    /// (client not reading); the message is dropped either way.
    pub fn send(&self, msg: ServerMessage) -> Result<(), SendError> {
        self.sender.try_send(msg).map_err(|e| match e {
            TrySendError::Full(_) => SendError::Full,
            TrySendError::Closed(_) => SendError::ChannelClosed,
        })
    }

    /// Whether the handshake has completed
    pub fn is_registered(&self) -> bool {
        self.name.is_some()
    }

    /// Record the display name
    pub fn set_name(&mut self, name: String) {
        self.name = Some(name);
    }
}
