//! Error types for the chatroom server
//!
//! Listener and startup failures are fatal to the whole server; everything
//! raised inside a session is logged and swallowed at the session boundary.

use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error (bind/accept failures are fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel send error (fatal - the ChatServer actor is gone)
    #[error("Channel send error")]
    ChannelSend,

    /// Listen port argument could not be parsed
    #[error("Invalid port: {0}")]
    InvalidPort(String),
}

/// Message send errors
///
/// Occurs when writing to a session whose outbox is closed or full.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,

    /// The outbox is full; the client is not keeping up
    #[error("Outbox full")]
    Full,
}
