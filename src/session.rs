//! Per-connection handshake state machine
//!
//! `Connected → Naming → Active → Closed`. The transition function is pure;
//! the connection handler feeds it input and carries out the returned
//! [`Effect`].

use crate::message::{ClientMessage, ServerMessage};

/// Why a session reached `Closed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Stream ended or failed before a name was given
    Abandoned,
    /// Sent the sentinel
    Left,
    /// Stream ended without the sentinel
    Disconnected,
    /// Read failure while active
    Failed,
}

/// Session lifecycle state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Accepted, welcome not yet acknowledged
    Connected,
    /// Waiting for a non-empty name
    Naming,
    /// Named and chatting
    Active { name: String },
    /// Terminal
    Closed(CloseReason),
}

/// One unit of input read from the connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Line(String),
    Eof,
    Failed,
}

/// What the handler must do after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    /// Write a line back to this session only
    Reply(ServerMessage),
    /// Record the name in the registry
    Register(String),
    /// Send text to everyone else
    Broadcast(String),
    /// Announce departure to everyone else
    Depart,
}

impl SessionState {
    /// Fresh session, as created on accept
    pub fn new() -> Self {
        SessionState::Connected
    }

    /// The welcome prompt has been queued; start naming
    pub fn accept(self) -> Self {
        match self {
            SessionState::Connected => SessionState::Naming,
            other => other,
        }
    }

    /// Set once the session has reached `Closed`
    pub fn close_reason(&self) -> Option<CloseReason> {
        match self {
            SessionState::Closed(reason) => Some(*reason),
            _ => None,
        }
    }

    /// Apply one input
    pub fn step(self, input: Input) -> (SessionState, Effect) {
        match (self, input) {
            (SessionState::Naming, Input::Line(line)) if line.is_empty() => {
                (SessionState::Naming, Effect::Reply(ServerMessage::NameRetry))
            }
            (SessionState::Naming, Input::Line(name)) => (
                SessionState::Active { name: name.clone() },
                Effect::Register(name),
            ),
            (SessionState::Naming, Input::Eof | Input::Failed) => {
                (SessionState::Closed(CloseReason::Abandoned), Effect::None)
            }

            (SessionState::Active { name }, Input::Line(line)) => {
                match ClientMessage::from_line(line) {
                    ClientMessage::Goodbye => {
                        (SessionState::Closed(CloseReason::Left), Effect::Depart)
                    }
                    ClientMessage::Chat { text } => {
                        (SessionState::Active { name }, Effect::Broadcast(text))
                    }
                }
            }
            // No departure notice on a silent disconnect
            (SessionState::Active { .. }, Input::Eof) => {
                (SessionState::Closed(CloseReason::Disconnected), Effect::None)
            }
            (SessionState::Active { .. }, Input::Failed) => {
                (SessionState::Closed(CloseReason::Failed), Effect::None)
            }

            // Input before accept() is not expected; nothing leaves Closed
            (state @ (SessionState::Connected | SessionState::Closed(_)), _) => {
                (state, Effect::None)
            }
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
