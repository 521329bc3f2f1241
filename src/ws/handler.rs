//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use chrono::Utc;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{RaceHandle, SessionInput};
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// Failure writing to a socket
#[derive(Debug, thiserror::Error)]
pub enum WsError {
    #[error("failed to encode message: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("socket write failed: {0}")]
    Socket(#[from] axum::Error),
}

/// WebSocket upgrade handler. Every connection gets a fresh identity;
/// displays and phones speak the same protocol.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let connection_id = Uuid::new_v4();
    info!(connection_id = %connection_id, "WebSocket upgrade");
    ws.on_upgrade(move |socket| handle_socket(socket, connection_id, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, connection_id: Uuid, state: AppState) {
    let (mut ws_sink, ws_stream) = socket.split();

    // Subscribe before reading the cached state so nothing published in
    // between is lost; a duplicate snapshot is harmless thanks to `seq`
    let snapshot_rx = state.race.subscribe();

    let welcome = ServerMsg::Welcome {
        connection_id,
        server_time: Utc::now(),
    };
    if let Err(e) = send_msg(&mut ws_sink, &welcome).await {
        error!(connection_id = %connection_id, error = %e, "Failed to send welcome");
        return;
    }

    let current = ServerMsg::GameState(state.race.latest_snapshot());
    if let Err(e) = send_msg(&mut ws_sink, &current).await {
        error!(connection_id = %connection_id, error = %e, "Failed to send initial state");
        return;
    }

    state.register_connection(connection_id);

    let rate_limiter = ConnectionRateLimiter::new(state.config.input_rate_limit);
    run_session(
        connection_id,
        ws_sink,
        ws_stream,
        state.race.clone(),
        snapshot_rx,
        rate_limiter,
    )
    .await;

    let connected_secs = state
        .unregister_connection(&connection_id)
        .map(|info| info.connected_secs(Utc::now()))
        .unwrap_or(0);
    info!(connection_id = %connection_id, connected_secs, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    connection_id: Uuid,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut ws_stream: SplitStream<WebSocket>,
    race: RaceHandle,
    mut snapshot_rx: broadcast::Receiver<ServerMsg>,
    rate_limiter: ConnectionRateLimiter,
) {
    // Writer task: session broadcasts -> WebSocket
    let writer_handle = tokio::spawn(async move {
        loop {
            match snapshot_rx.recv().await {
                Ok(msg) => {
                    if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                        debug!(connection_id = %connection_id, error = %e, "WebSocket send failed");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    // The next snapshot carries the full state again
                    warn!(
                        connection_id = %connection_id,
                        lagged_count = n,
                        "Client lagged, skipping {} messages", n
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(connection_id = %connection_id, "Broadcast channel closed");
                    break;
                }
            }
        }
    });

    // Reader loop: WebSocket -> session
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_input() {
                    warn!(connection_id = %connection_id, "Rate limited input message");
                    continue;
                }

                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(msg) => {
                        let input = SessionInput::Client { connection_id, msg };
                        if race.send(input).await.is_err() {
                            debug!(connection_id = %connection_id, "Session closed");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(connection_id = %connection_id, error = %e, "Failed to parse client message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(connection_id = %connection_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(connection_id = %connection_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(connection_id = %connection_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // A lobby player leaves; racing teams keep their progress
    let _ = race.send(SessionInput::Disconnected(connection_id)).await;

    writer_handle.abort();
}

/// Send a message over WebSocket
async fn send_msg(sink: &mut SplitSink<WebSocket, Message>, msg: &ServerMsg) -> Result<(), WsError> {
    let json = serde_json::to_string(msg)?;
    sink.send(Message::Text(json)).await?;
    Ok(())
}
