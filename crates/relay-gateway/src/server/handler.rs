//! WebSocket handler
//!
//! Handles WebSocket connections and dispatches client events to the gateway.

use crate::connection::Connection;
use crate::protocol::{ClientEvent, CloseCode, EventFrame};
use crate::server::GatewayState;
use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::interval;

/// Interval between server pings
const PING_INTERVAL: Duration = Duration::from_secs(25);

/// No inbound traffic for this long closes the session
const SESSION_TIMEOUT: Duration = Duration::from_secs(60);

/// How often the heartbeat task checks for idle sessions
const HEARTBEAT_CHECK_INTERVAL: Duration = Duration::from_secs(5);

/// Time allowed for the close frame to reach the client
const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// WebSocket gateway handler
pub async fn gateway_handler(
    State(state): State<GatewayState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(state, socket))
}

/// Handle an upgraded WebSocket connection
async fn handle_socket(state: GatewayState, socket: WebSocket) {
    let session_id = uuid::Uuid::new_v4().to_string();

    let buffer = state.config().relay.outbound_buffer.max(1);
    let (tx, mut rx) = mpsc::channel::<EventFrame>(buffer);
    let connection = state.registry().add_connection(session_id.clone(), tx);

    tracing::info!(session_id = %session_id, "WebSocket connection established");

    let (mut ws_sink, mut ws_stream) = socket.split();
    let (close_tx, mut close_rx) = oneshot::channel::<CloseCode>();

    let state_recv = state.clone();
    let session_id_recv = session_id.clone();
    let connection_recv = connection.clone();

    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = ws_stream.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    connection_recv.touch();
                    if let Err(close_code) =
                        handle_text_message(&state_recv, &connection_recv, &text).await
                    {
                        return Some(close_code);
                    }
                }
                Ok(Message::Binary(_)) => {
                    tracing::debug!(
                        session_id = %session_id_recv,
                        "Binary messages not supported"
                    );
                    return Some(CloseCode::UnsupportedFrame);
                }
                Ok(Message::Ping(_) | Message::Pong(_)) => {
                    // Pong replies are sent by axum
                    connection_recv.touch();
                }
                Ok(Message::Close(_)) => {
                    tracing::info!(session_id = %session_id_recv, "Client closed connection");
                    return None;
                }
                Err(e) => {
                    tracing::warn!(
                        session_id = %session_id_recv,
                        error = %e,
                        "WebSocket error"
                    );
                    return None;
                }
            }
        }
        None
    });

    let session_id_send = session_id.clone();

    let mut send_task = tokio::spawn(async move {
        let mut ping = interval(PING_INTERVAL);
        ping.tick().await;

        loop {
            tokio::select! {
                frame = rx.recv() => {
                    let Some(frame) = frame else { break };
                    let json = match frame.to_json() {
                        Ok(json) => json,
                        Err(e) => {
                            tracing::warn!(
                                session_id = %session_id_send,
                                event = %frame.event,
                                error = %e,
                                "Failed to encode frame"
                            );
                            continue;
                        }
                    };
                    if ws_sink.send(Message::Text(json)).await.is_err() {
                        tracing::warn!(
                            session_id = %session_id_send,
                            "Failed to send message to WebSocket"
                        );
                        return;
                    }
                }
                _ = ping.tick() => {
                    if ws_sink.send(Message::Ping(Vec::new())).await.is_err() {
                        return;
                    }
                }
                close_code = &mut close_rx => {
                    if let Ok(code) = close_code {
                        let frame = CloseFrame {
                            code: code.as_u16(),
                            reason: code.description().into(),
                        };
                        let _ = ws_sink.send(Message::Close(Some(frame))).await;
                    }
                    break;
                }
            }
        }

        let _ = ws_sink.close().await;
    });

    let session_id_hb = session_id.clone();
    let connection_hb = connection.clone();

    let mut heartbeat_task = tokio::spawn(async move {
        let mut check = interval(HEARTBEAT_CHECK_INTERVAL);

        loop {
            check.tick().await;

            let idle = connection_hb.idle_time();
            if idle > SESSION_TIMEOUT {
                tracing::warn!(
                    session_id = %session_id_hb,
                    idle_ms = idle.as_millis(),
                    "Connection timed out"
                );
                return CloseCode::SessionTimeout;
            }
        }
    });

    let mut send_done = false;
    let close_code = tokio::select! {
        result = &mut recv_task => result.ok().flatten(),
        result = &mut heartbeat_task => result.ok(),
        _ = &mut send_task => {
            send_done = true;
            None
        }
    };

    // Leave every room before the socket goes away
    state.registry().remove_connection(&session_id);

    if !send_done {
        match close_code {
            Some(code) => {
                tracing::debug!(
                    session_id = %session_id,
                    close_code = %code,
                    "Closing connection"
                );
                let _ = close_tx.send(code);
            }
            None => drop(close_tx),
        }

        if tokio::time::timeout(CLOSE_FLUSH_TIMEOUT, &mut send_task)
            .await
            .is_err()
        {
            tracing::debug!(session_id = %session_id, "Close frame not flushed in time");
        }
    }

    recv_task.abort();
    heartbeat_task.abort();
    send_task.abort();

    tracing::info!(
        session_id = %session_id,
        duration_ms = connection.age().as_millis(),
        "WebSocket connection closed"
    );
}

/// Handle a text frame from the client
///
/// Only frames that are not `{ event, data }` objects close the socket.
async fn handle_text_message(
    state: &GatewayState,
    connection: &Arc<Connection>,
    text: &str,
) -> Result<(), CloseCode> {
    let frame = match EventFrame::from_json(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::debug!(
                session_id = %connection.session_id(),
                error = %e,
                "Failed to parse frame"
            );
            return Err(CloseCode::DecodeError);
        }
    };

    tracing::trace!(
        session_id = %connection.session_id(),
        event = %frame.event,
        "Received frame"
    );

    match ClientEvent::parse(frame) {
        Ok(ClientEvent::Join(payload)) => state.gateway().handle_join(connection, payload).await,
        Ok(ClientEvent::Message(payload)) => state.gateway().send(connection, payload).await,
        Ok(ClientEvent::Unknown(event)) => {
            tracing::debug!(
                session_id = %connection.session_id(),
                event = %event,
                "Ignoring unknown event"
            );
        }
        Err(e) => state.gateway().reject(connection, e),
    }

    Ok(())
}
