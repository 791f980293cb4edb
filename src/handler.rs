//! TCP connection handler
//!
//! Drives one session: reads lines into the handshake state machine, turns its
//! effects into actor commands, and runs a writer task that drains the
//! session's outbox onto the socket.
//!
//! Only the actor writes into a session's outbox, so everything a client sees
//! follows the order the actor processed it in; the welcome prompt always
//! comes first.

use futures_util::{SinkExt, StreamExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use tracing::{debug, info, warn};

use crate::codec::{ChatLineCodec, InboundLine};
use crate::error::AppError;
use crate::message::ServerMessage;
use crate::server::ServerCommand;
use crate::session::{CloseReason, Effect, Input, SessionState};
use crate::types::SessionId;

type LineReader = FramedRead<OwnedReadHalf, ChatLineCodec>;
type LineWriter = FramedWrite<OwnedWriteHalf, LinesCodec>;

/// Handle an accepted, already admitted connection
///
/// `msg_rx` is the receiving end of the outbox whose sender was handed to the
/// actor on admission. Teardown (a `Disconnect` command plus closing the
/// socket) runs on every exit path, including an abandoned handshake.
pub async fn handle_connection(
    stream: TcpStream,
    session_id: SessionId,
    msg_rx: mpsc::Receiver<ServerMessage>,
    cmd_tx: mpsc::Sender<ServerCommand>,
) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    let (read_half, write_half) = stream.into_split();
    let mut lines = FramedRead::new(read_half, ChatLineCodec::new());
    let writer = FramedWrite::new(write_half, LinesCodec::new());

    let write_task = tokio::spawn(write_loop(session_id, writer, msg_rx));

    let result = run_session(session_id, &mut lines, &cmd_tx).await;

    if cmd_tx
        .send(ServerCommand::Disconnect { session_id })
        .await
        .is_err()
    {
        debug!("Server closed before teardown of session {}", session_id);
    }

    // The writer finishes once the actor drops this session's outbox sender
    drop(lines);
    if let Err(e) = write_task.await {
        warn!("Write task for session {} panicked: {}", session_id, e);
    }

    match &result {
        Ok(reason) => info!("Session {} from {} closed: {:?}", session_id, peer_addr, reason),
        Err(e) => warn!("Session {} from {} aborted: {}", session_id, peer_addr, e),
    }

    result.map(|_| ())
}

/// Feed input lines through the state machine until it closes
async fn run_session(
    session_id: SessionId,
    lines: &mut LineReader,
    cmd_tx: &mpsc::Sender<ServerCommand>,
) -> Result<CloseReason, AppError> {
    let mut state = SessionState::new().accept();

    loop {
        let input = match lines.next().await {
            Some(Ok(InboundLine::Text(line))) => {
                debug!("Session {} sent {} bytes", session_id, line.len());
                Input::Line(line)
            }
            Some(Ok(InboundLine::Overlong)) => {
                warn!("Session {} sent an over-long line; dropped", session_id);
                continue;
            }
            Some(Err(e)) => {
                warn!("Read error for session {}: {}", session_id, e);
                Input::Failed
            }
            None => Input::Eof,
        };

        let (next, effect) = state.step(input);
        state = next;

        let cmd = match effect {
            Effect::None => None,
            Effect::Reply(message) => Some(ServerCommand::Reply { session_id, message }),
            Effect::Register(name) => Some(ServerCommand::Register { session_id, name }),
            Effect::Broadcast(text) => Some(ServerCommand::Chat { session_id, text }),
            Effect::Depart => Some(ServerCommand::Leave { session_id }),
        };
        if let Some(cmd) = cmd {
            cmd_tx.send(cmd).await.map_err(|_| AppError::ChannelSend)?;
        }

        if let Some(reason) = state.close_reason() {
            return Ok(reason);
        }
    }
}

/// Drain the outbox onto the socket, then close it
async fn write_loop(
    session_id: SessionId,
    mut writer: LineWriter,
    mut msg_rx: mpsc::Receiver<ServerMessage>,
) {
    while let Some(msg) = msg_rx.recv().await {
        if let Err(e) = writer.send(msg.to_string()).await {
            warn!("Write failed for session {}: {}", session_id, e);
            break;
        }
    }

    if let Err(e) = SinkExt::<String>::close(&mut writer).await {
        debug!("Closing socket for session {} failed: {}", session_id, e);
    }
    debug!("Write task ended for session {}", session_id);
}
