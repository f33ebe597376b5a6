//! WebSocket session handling
//!
//! Each connection gets a send task fed by its bounded outbound queue and a
//! receive task that decodes client frames and forwards them to the scheduler.
//! Neither task touches match state.

use axum::{
    extract::{
        State,
        ws::{Message, Utf8Bytes, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::AppState;
use crate::commands::PlayerCommand;
use crate::scheduler::{MatchHandle, SchedulerEvent, SessionId};
use crate::wire_format::ClientMessage;

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let session_id = Uuid::new_v4();
    let (tx, mut rx) = mpsc::channel::<Utf8Bytes>(state.outbound_buffer);

    info!(session = %session_id, "New WebSocket connection");

    if !state.matches.send(SchedulerEvent::Connected {
        session_id,
        outbound: tx,
    }) {
        warn!(session = %session_id, "Match scheduler is not running, closing connection");
        let _ = sender.close().await;
        return;
    }

    // Ends when the scheduler drops our queue or the socket stops accepting writes.
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sender.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    });

    let handle = state.matches.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => forward(&handle, session_id, text.as_str()),
                Ok(Message::Binary(data)) => {
                    warn!(
                        session = %session_id,
                        len = data.len(),
                        "Dropping unsupported binary frame"
                    );
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    debug!(session = %session_id, error = %e, "WebSocket receive error");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state
        .matches
        .send(SchedulerEvent::Disconnected { session_id });
    info!(session = %session_id, "WebSocket connection closed");
}

/// Decode one client frame and hand it to the scheduler. Malformed frames are
/// logged and dropped; the connection stays open.
fn forward(handle: &MatchHandle, session_id: SessionId, text: &str) {
    let event = match ClientMessage::from_text(text) {
        Ok(ClientMessage::Kick { player_id, dx, dy }) => SchedulerEvent::Command {
            session_id,
            command: PlayerCommand::Kick { player_id, dx, dy },
        },
        Ok(ClientMessage::SelectPlayer { player_id }) => SchedulerEvent::Command {
            session_id,
            command: PlayerCommand::SelectPlayer { player_id },
        },
        Ok(ClientMessage::Ping { timestamp }) => SchedulerEvent::Ping {
            session_id,
            timestamp,
        },
        Err(e) => {
            warn!(session = %session_id, error = %e, "Dropping client message");
            return;
        }
    };
    handle.send(event);
}
