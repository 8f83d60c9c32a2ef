//! WebSocket handler for live table play.
//!
//! # Connection Flow
//!
//! 1. Client connects via `GET /ws`
//! 2. Server names the player and asks the registry for a waiting table
//! 3. Server spawns the write task, which owns the socket's sending half:
//!    - Drains the connection's outbound queue (filled by the table)
//!    - Sends a ping every liveness period, or drops the connection once
//!      the player has been silent past the liveness timeout
//! 4. The handler itself runs the read loop, decoding client frames
//! 5. Either side firing the shared stop signal ends both
//!
//! # Client Messages
//!
//! ```json
//! {"type": "action", "payload": {"type": "raise", "amount": 40}}
//! {"type": "chat", "payload": {"message": "gl"}}
//! {"type": "heartbeat", "payload": {}}
//! ```
//!
//! # Server Messages
//!
//! `welcome`, `gameState`, `winner`, `chat`, `error` and `heartbeat_ack`
//! envelopes, all shaped `{"type": ..., "payload": ...}`.

use axum::{
    body::Bytes,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use live_holdem::{
    TableHandle,
    entities::{Player, PlayerId, generate_id, generate_player_name},
    liveness::{LivenessRegistry, StopSignal},
    messages::{ClientMessage, ServerMessage},
    net::errors::ProtocolError,
    table::{PlayerConnection, TableResponse},
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{AppState, rate_limiter::InboundLimits};
use crate::{
    config::ConnectionConfig,
    logging::{self, ConnectionEvent},
    metrics,
};

/// Times a connection asks the registry for a table before giving up.
const JOIN_ATTEMPTS: usize = 5;

/// Upgrade an HTTP request to a player connection.
///
/// Frames larger than the configured maximum are refused by the
/// transport and end the connection.
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let max_message_size = state.config.connection.max_message_size;
    ws.max_message_size(max_message_size)
        .max_frame_size(max_message_size)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

/// Serve one player from seat to departure.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (sink, mut stream) = socket.split();
    let settings = state.config.connection.clone();

    let player_id = generate_id();
    let player_name = generate_player_name();
    let stop = StopSignal::new();
    let (outbound_tx, outbound_rx) = mpsc::channel(state.config.table.outbound_queue_capacity);

    state.liveness.register(&player_id).await;
    metrics::connection_opened();
    metrics::connections_active(state.liveness.len().await);
    logging::log_connection_event(ConnectionEvent::Connected, &player_id, None, &player_name);

    let writer = tokio::spawn(write_loop(
        sink,
        outbound_rx,
        stop.clone(),
        player_id.clone(),
        state.liveness.clone(),
        settings.clone(),
    ));

    let connection = PlayerConnection::new(outbound_tx.clone(), stop.clone());
    let table = match seat_player(&state, &player_id, &player_name, connection).await {
        Ok(table) => table,
        Err(message) => {
            logging::log_connection_event(ConnectionEvent::Refused, &player_id, None, &message);
            let _ = outbound_tx.try_send(ServerMessage::error(message));
            // The writer flushes the error, then exits once the queue closes.
            drop(outbound_tx);
            let _ = writer.await;
            state.liveness.remove(&player_id).await;
            metrics::connections_active(state.liveness.len().await);
            return;
        }
    };

    let mut limits = InboundLimits::new(settings.burst_limit, settings.sustained_limit);

    loop {
        let frame = tokio::select! {
            _ = stop.triggered() => break,
            frame = stream.next() => frame,
        };

        let text = match frame {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Pong(_))) | Some(Ok(Message::Ping(_))) => {
                state.liveness.touch(&player_id).await;
                continue;
            }
            Some(Ok(Message::Binary(_))) => {
                reply(&outbound_tx, &stop, ProtocolError::UnsupportedFrame.into());
                continue;
            }
            Some(Ok(Message::Close(_))) | None => {
                debug!(player_id = %player_id, "Client closed the connection");
                break;
            }
            Some(Err(e)) => {
                debug!(player_id = %player_id, "Read failed: {}", e);
                break;
            }
        };

        metrics::frame_received();

        if let Err(window) = limits.admit() {
            metrics::frame_rate_limited(window);
            logging::log_rejected_frame(&player_id, &window);
            reply(&outbound_tx, &stop, ProtocolError::RateLimited.into());
            continue;
        }

        let message = match ClientMessage::parse(text.as_str()) {
            Ok(message) => message,
            Err(e) => {
                logging::log_rejected_frame(&player_id, &e);
                reply(&outbound_tx, &stop, e.into());
                continue;
            }
        };

        match message {
            ClientMessage::Action(action) => {
                let response = table.take_action(&player_id, action).await;
                metrics::action_processed(response.is_success());
                if let Some(error) = response.error_message() {
                    reply(&outbound_tx, &stop, ServerMessage::error(error));
                }
            }
            ClientMessage::Chat(message) => {
                if table.chat(&player_id, message).await.is_err() {
                    break;
                }
            }
            ClientMessage::Heartbeat => {
                state.liveness.touch(&player_id).await;
                reply(&outbound_tx, &stop, ServerMessage::heartbeat_ack());
            }
        }
    }

    // Cleanup: the table drops the seat and tells everyone else.
    stop.trigger();
    if table.disconnect(&player_id).await.is_err() {
        debug!(player_id = %player_id, "Table already closed");
    }
    drop(outbound_tx);
    let _ = writer.await;
    // The reader has stopped, so nothing can refresh the record after this.
    state.liveness.remove(&player_id).await;

    metrics::connections_active(state.liveness.len().await);
    logging::log_connection_event(
        ConnectionEvent::Closed,
        &player_id,
        Some(table.table_id()),
        "Connection closed",
    );
}

/// Seat the player at whichever table the registry offers, asking again
/// when that table fills up or starts a hand before the join lands.
async fn seat_player(
    state: &AppState,
    player_id: &PlayerId,
    player_name: &str,
    connection: PlayerConnection,
) -> Result<TableHandle, String> {
    let stack = state.table_manager.config().starting_stack;
    let mut last_error = String::from("No table available");

    for attempt in 1..=JOIN_ATTEMPTS {
        let table = state.table_manager.find_or_create().await;
        let player = Player::new(player_id.clone(), player_name.to_string(), stack);

        match table.join(player, connection.clone()).await {
            TableResponse::Seated(seat) => {
                logging::log_connection_event(
                    ConnectionEvent::Seated,
                    player_id,
                    Some(table.table_id()),
                    &format!("Seat {seat}"),
                );
                return Ok(table);
            }
            response if response.is_retryable() || table.is_closed() => {
                debug!(
                    player_id = %player_id,
                    table_id = table.table_id(),
                    attempt,
                    "Join refused, asking the registry again"
                );
                if let Some(error) = response.error_message() {
                    last_error = error;
                }
            }
            response => {
                return Err(response
                    .error_message()
                    .unwrap_or_else(|| "Could not join table".to_string()));
            }
        }
    }

    Err(last_error)
}

/// Queue a reply for this connection. A full or closed queue means the
/// client stopped reading, so the connection is stopped.
fn reply(outbound: &mpsc::Sender<ServerMessage>, stop: &StopSignal, message: ServerMessage) {
    if outbound.try_send(message).is_err() {
        stop.trigger();
    }
}

/// Sole writer of the socket. Exits on the stop signal, a closed queue,
/// a failed or slow write, or liveness expiry, and always leaves the
/// stop signal fired and the liveness record removed.
async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<ServerMessage>,
    stop: StopSignal,
    player_id: PlayerId,
    liveness: LivenessRegistry,
    settings: ConnectionConfig,
) {
    let mut probe = tokio::time::interval(settings.liveness_period);
    // The first tick completes immediately.
    probe.tick().await;

    loop {
        let frame = tokio::select! {
            _ = stop.triggered() => break,
            message = outbound.recv() => match message {
                Some(message) => match message.to_json() {
                    Ok(json) => Message::Text(json.into()),
                    Err(e) => {
                        warn!(player_id = %player_id, "Failed to serialize {}: {}", message.kind(), e);
                        continue;
                    }
                },
                None => break,
            },
            _ = probe.tick() => {
                if liveness.is_expired(&player_id, settings.liveness_timeout).await {
                    info!(player_id = %player_id, "Liveness timeout, dropping connection");
                    metrics::liveness_expired();
                    break;
                }
                Message::Ping(Bytes::new())
            }
        };

        match tokio::time::timeout(settings.write_timeout, sink.send(frame)).await {
            Ok(Ok(())) => metrics::frame_sent(),
            Ok(Err(e)) => {
                debug!(player_id = %player_id, "Write failed: {}", e);
                break;
            }
            Err(_) => {
                warn!(player_id = %player_id, "Write timed out after {:?}", settings.write_timeout);
                break;
            }
        }
    }

    stop.trigger();
    liveness.remove(&player_id).await;
    let _ = tokio::time::timeout(settings.write_timeout, sink.close()).await;
}
