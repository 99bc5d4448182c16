// =============================================================================
// WebSocket Handler — Push-based state updates
// =============================================================================
//
// Clients connect to `/api/v1/ws` and receive:
//   1. An immediate full StateSnapshot on connect.
//   2. A fresh snapshot every 500 ms whenever the state_version has changed
//      since the last push — with the simulator ticking away, that is nearly
//      every cycle.
//
// Ping frames are answered with Pong; any text frame counts as a client
// heartbeat and is otherwise ignored.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};

use crate::app_state::AppState;

/// How often the push loop checks for a changed state version.
const PUSH_PERIOD: Duration = Duration::from_millis(500);

/// Axum handler for the WebSocket upgrade request.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    info!("WebSocket connection accepted — upgrading");
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

/// Manage one connection: a push loop and a receive loop multiplexed with
/// `tokio::select!` until either side ends the conversation.
async fn handle_ws_connection(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Initial full snapshot straight away.
    if let Err(e) = send_snapshot(&mut sender, &state).await {
        warn!(error = %e, "failed to send initial WebSocket snapshot");
        return;
    }
    let mut last_sent_version = state.current_state_version();

    let mut push_interval = interval(PUSH_PERIOD);

    loop {
        tokio::select! {
            // ── Push loop ───────────────────────────────────────────────
            _ = push_interval.tick() => {
                let current = state.current_state_version();
                if current == last_sent_version {
                    continue;
                }
                match send_snapshot(&mut sender, &state).await {
                    Ok(()) => last_sent_version = current,
                    Err(e) => {
                        debug!(error = %e, "WebSocket send failed — disconnecting");
                        break;
                    }
                }
            }

            // ── Receive loop ────────────────────────────────────────────
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        debug!(msg = %text, "WebSocket heartbeat received");
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_) | Message::Binary(_))) => {}
                    Some(Ok(Message::Close(_))) | None => {
                        info!("WebSocket closed by client");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket receive error — disconnecting");
                        break;
                    }
                }
            }
        }
    }

    debug!("WebSocket connection finished");
}

/// Serialise and send the current StateSnapshot, bumping the global
/// sequence counter.
async fn send_snapshot<S>(sender: &mut S, state: &Arc<AppState>) -> Result<(), axum::Error>
where
    S: futures_util::Sink<Message, Error = axum::Error> + Unpin,
{
    let seq = state
        .ws_sequence_number
        .fetch_add(1, std::sync::atomic::Ordering::Relaxed);

    let snapshot = state.build_snapshot();
    match serde_json::to_string(&snapshot) {
        Ok(json) => {
            sender.send(Message::Text(json.into())).await?;
            debug!(version = snapshot.state_version, seq, "WebSocket snapshot sent");
            Ok(())
        }
        Err(e) => {
            // A serialisation error is not a network error; keep the
            // connection and try again on the next version change.
            warn!(error = %e, "failed to serialise snapshot");
            Ok(())
        }
    }
}
