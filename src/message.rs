//! Wire protocol definitions
//!
//! Plain-text, newline-terminated lines in both directions. Framing is done by
//! `ChatLineCodec` inbound and `LinesCodec` outbound; this module only knows
//! how each line reads.

use std::fmt;

/// Reserved chat line that signals a voluntary departure
pub const GOODBYE: &str = "GOODBYE";

/// Client → Server line, interpreted for a session that has a name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// Ordinary chat text, forwarded verbatim
    Chat { text: String },
    /// The sentinel token
    Goodbye,
}

impl ClientMessage {
    /// Classify one input line
    pub fn from_line(line: String) -> Self {
        if line == GOODBYE {
            ClientMessage::Goodbye
        } else {
            ClientMessage::Chat { text: line }
        }
    }
}

/// Server → Client line
///
/// Rendered through `Display`; the codec appends the line terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Greeting sent on connect, phrased by the current population
    Welcome { population: usize },
    /// Re-prompt after an empty name
    NameRetry,
    /// Sent once the name is registered
    Instructions { name: String },
    /// Chat text from another session
    Chat { from: String, text: String },
    /// Another session sent the sentinel
    Departure { name: String },
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::Welcome { population } => {
                let (is_or_are, person_or_people) = if *population == 1 {
                    ("is", "person")
                } else {
                    ("are", "people")
                };
                write!(
                    f,
                    "Welcome to the chatroom! There {} currently {} {} including you in the room! Please enter your name: ",
                    is_or_are, population, person_or_people
                )
            }
            ServerMessage::NameRetry => {
                f.write_str("Sorry, didn't catch that. Please enter your name: ")
            }
            ServerMessage::Instructions { name } => write!(
                f,
                "Welcome {}! Start typing below to send messages to your friends.",
                name
            ),
            ServerMessage::Chat { from, text } => write!(f, "{}: {}", from, text),
            ServerMessage::Departure { name } => write!(f, "{} has left the group!", name),
        }
    }
}
