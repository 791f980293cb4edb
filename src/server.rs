//! ChatServer actor and accept loop
//!
//! The actor owns the [`Registry`] and processes commands one at a time, which
//! makes it the single serialization point for registry mutation and
//! broadcast fan-out. `serve` is the accept loop feeding it.

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::client::Client;
use crate::error::AppError;
use crate::handler::handle_connection;
use crate::message::ServerMessage;
use crate::registry::Registry;
use crate::types::SessionId;

/// Channel buffer size for server commands
const CHANNEL_BUFFER_SIZE: usize = 256;

/// Per-session outbox buffer size; a client this far behind loses messages
const OUTBOX_BUFFER_SIZE: usize = 128;

/// Commands sent to the ChatServer actor
#[derive(Debug)]
pub enum ServerCommand {
    /// Connection accepted; admit it and send the welcome prompt
    Connect {
        session_id: SessionId,
        sender: mpsc::Sender<ServerMessage>,
    },
    /// Line addressed to one session only
    Reply {
        session_id: SessionId,
        message: ServerMessage,
    },
    /// Handshake finished with a non-empty name
    Register {
        session_id: SessionId,
        name: String,
    },
    /// Chat line to fan out
    Chat {
        session_id: SessionId,
        text: String,
    },
    /// Sentinel received: announce departure and tear down
    Leave {
        session_id: SessionId,
    },
    /// Session ended for any reason; tear down if still present
    Disconnect {
        session_id: SessionId,
    },
}

/// The main ChatServer actor
pub struct ChatServer {
    /// All admitted sessions
    registry: Registry,
    /// Command receiver channel
    receiver: mpsc::Receiver<ServerCommand>,
}

impl ChatServer {
    /// Create a new ChatServer with the given command receiver
    pub fn new(receiver: mpsc::Receiver<ServerCommand>) -> Self {
        Self {
            registry: Registry::new(),
            receiver,
        }
    }

    /// Run the ChatServer event loop
    ///
    /// Continuously receives and processes commands until all senders are dropped.
    pub async fn run(mut self) {
        info!("ChatServer started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!("ChatServer shutting down");
    }

    /// Process a single command
    fn handle_command(&mut self, cmd: ServerCommand) {
        match cmd {
            ServerCommand::Connect { session_id, sender } => {
                self.handle_connect(session_id, sender);
            }
            ServerCommand::Reply { session_id, message } => {
                self.handle_reply(session_id, message);
            }
            ServerCommand::Register { session_id, name } => {
                self.handle_register(session_id, name);
            }
            ServerCommand::Chat { session_id, text } => {
                self.handle_chat(session_id, text);
            }
            ServerCommand::Leave { session_id } => {
                self.handle_leave(session_id);
            }
            ServerCommand::Disconnect { session_id } => {
                self.handle_disconnect(session_id);
            }
        }
    }

    /// Admit a new session and greet it with the current population
    fn handle_connect(&mut self, session_id: SessionId, sender: mpsc::Sender<ServerMessage>) {
        let population = self.registry.admit(Client::new(session_id, sender));
        debug!(
            "Session {} admitted, population: {}, registered: {}",
            session_id,
            population,
            self.registry.registered_count()
        );

        if let Some(client) = self.registry.get(session_id) {
            if let Err(e) = client.send(ServerMessage::Welcome { population }) {
                warn!("Could not greet session {}: {}", session_id, e);
            }
        }
    }

    /// Deliver a line to one session, after anything already queued for it
    fn handle_reply(&mut self, session_id: SessionId, message: ServerMessage) {
        let Some(client) = self.registry.get(session_id) else {
            debug!("Dropping reply to departed session {}", session_id);
            return;
        };

        if let Err(e) = client.send(message) {
            warn!("Could not reply to session {}: {}", session_id, e);
        }
    }

    /// Record the session's name and send the instructions
    fn handle_register(&mut self, session_id: SessionId, name: String) {
        let Some(client) = self.registry.register(session_id, name.clone()) else {
            warn!("Ignoring registration for unknown or named session {}", session_id);
            return;
        };

        info!("Session {} registered as '{}'", session_id, name);

        if let Err(e) = client.send(ServerMessage::Instructions { name }) {
            warn!("Could not send instructions to session {}: {}", session_id, e);
        }
    }

    /// Fan out a chat line
    fn handle_chat(&mut self, session_id: SessionId, text: String) {
        let Some(from) = self.registry.lookup_name(session_id) else {
            debug!("Dropping chat from unregistered session {}", session_id);
            return;
        };

        let msg = ServerMessage::Chat {
            from: from.to_string(),
            text,
        };
        self.broadcast(session_id, msg);
    }

    /// Announce a sentinel departure, then tear the session down
    ///
    /// Both happen within one command, so no later broadcast can see the
    /// departed session.
    fn handle_leave(&mut self, session_id: SessionId) {
        if let Some(name) = self.registry.lookup_name(session_id) {
            info!("Session {} ('{}') left the group", session_id, name);
            let msg = ServerMessage::Departure {
                name: name.to_string(),
            };
            self.broadcast(session_id, msg);
        }

        self.handle_disconnect(session_id);
    }

    /// Remove a session; repeated calls are no-ops
    fn handle_disconnect(&mut self, session_id: SessionId) {
        let Some(client) = self.registry.remove(session_id) else {
            return;
        };

        info!(
            "Session {} ({}) removed",
            session_id,
            client.name.as_deref().unwrap_or("unnamed")
        );
        debug!(
            "Population: {}, registered: {}",
            self.registry.population(),
            self.registry.registered_count()
        );
    }

    /// Deliver `msg` to every registered session except `sender`
    ///
    /// Never waits on a recipient. A failed delivery (closed or full outbox)
    /// is logged and the remaining recipients still get the message; a closed
    /// session's own read loop will tear it down.
    fn broadcast(&self, sender: SessionId, msg: ServerMessage) {
        let recipients = self.registry.snapshot_excluding(sender);
        debug!("Broadcasting from {} to {} recipients", sender, recipients.len());

        for recipient in recipients {
            if let Err(e) = recipient.send(msg.clone()) {
                warn!("Delivery to session {} failed: {}", recipient.id, e);
            }
        }
    }
}

/// Accept connections forever
///
/// Starts the ChatServer actor, then admits each accepted connection in
/// accept order and spawns its handler. Returns only on a listener failure.
pub async fn serve(listener: TcpListener) -> Result<(), AppError> {
    let (cmd_tx, cmd_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
    tokio::spawn(ChatServer::new(cmd_rx).run());

    info!("ChatServer actor started");

    loop {
        let (stream, addr) = listener.accept().await.map_err(|e| {
            error!("Failed to accept connection: {}", e);
            e
        })?;

        let session_id = SessionId::new();
        info!("New connection from {} (session {})", addr, session_id);

        let (msg_tx, msg_rx) = mpsc::channel(OUTBOX_BUFFER_SIZE);
        // Queued before the handler starts, so the welcome precedes any reply
        cmd_tx
            .send(ServerCommand::Connect {
                session_id,
                sender: msg_tx,
            })
            .await
            .map_err(|_| AppError::ChannelSend)?;

        let cmd_tx = cmd_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, session_id, msg_rx, cmd_tx).await {
                error!("Connection handler error for session {}: {}", session_id, e);
            }
        });
    }
}
