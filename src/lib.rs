//! Line-Oriented Chatroom Server Library
//!
//! A TCP chatroom built on tokio using the Actor pattern for shared state.
//!
//! # Features
//! - Plain-text, newline-terminated protocol (usable from `nc` or `telnet`)
//! - Lossy UTF-8 input decoding; over-long lines are skipped, not fatal
//! - Name handshake with re-prompt on empty input
//! - Broadcast of every line to all other named clients
//! - `GOODBYE` sentinel with a departure notice
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `ChatServer` owns the `Registry` and serializes every registry change
//!   and every broadcast
//! - Each connection runs a `handler` task driving a `SessionState` machine,
//!   plus a writer task draining its outbox onto the socket
//! - `serve` is the accept loop tying them together
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use chatroom::{serve, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), chatroom::AppError> {
//!     let config = ServerConfig::default();
//!     let listener = TcpListener::bind(config.bind_addr()).await?;
//!     serve(listener).await
//! }
//! ```

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod handler;
pub mod message;
pub mod registry;
pub mod server;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use client::Client;
pub use codec::{ChatLineCodec, InboundLine};
pub use config::{ServerConfig, DEFAULT_PORT};
pub use error::{AppError, SendError};
pub use handler::handle_connection;
pub use message::{ClientMessage, ServerMessage, GOODBYE};
pub use registry::Registry;
pub use server::{serve, ChatServer, ServerCommand};
pub use session::{CloseReason, Effect, Input, SessionState};
pub use types::SessionId;
