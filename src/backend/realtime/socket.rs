/**
 * WebSocket Transport
 *
 * Binds one WebSocket to one hub connection with exactly one reader and
 * one writer:
 *
 * - the **read pump** parses frames into commands and submits them to the
 *   hub; any read error, close frame or liveness timeout ends it
 * - the **write pump** drains the connection's outbound queue into the
 *   socket and sends a ping every `ping_interval`
 *
 * Whichever pump stops first disconnects the connection from the hub.
 */

use std::fmt::Display;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use bytes::Bytes;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::backend::realtime::hub::Hub;
use crate::backend::server::state::AppState;
use crate::shared::Command;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("socket write failed: {0}")]
    Write(String),

    #[error("command encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// How long a peer may stay silent before it is considered gone
pub fn liveness_timeout(ping_interval: Duration) -> Duration {
    ping_interval * 10 / 9
}

/// Upgrade handler (GET /ws)
pub async fn handle_websocket(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let hub = state.hub.clone();
    let ping_interval = state.config.ping_interval;
    ws.on_upgrade(move |socket| serve_socket(socket, hub, ping_interval))
}

/// Run both pumps for an upgraded socket
pub async fn serve_socket(socket: WebSocket, hub: Hub, ping_interval: Duration) {
    let connection = match hub.connect().await {
        Ok(connection) => connection,
        Err(e) => {
            tracing::error!("[Hub] Unable to register socket: {}", e);
            return;
        }
    };
    let (id, outbound) = connection.into_parts();
    let (sink, stream) = socket.split();

    let writer_hub = hub.clone();
    let writer_id = id.clone();
    tokio::spawn(async move {
        if let Err(e) = write_pump(sink, outbound, ping_interval).await {
            tracing::info!("[Hub] Write to {} failed: {}", writer_id, e);
            let _ = writer_hub.disconnect(&writer_id).await;
        }
    });

    read_pump(stream, &hub, &id, liveness_timeout(ping_interval)).await;
    let _ = hub.disconnect(&id).await;
}

/// Forward client frames to the hub until the socket stops producing them
pub async fn read_pump<R, E>(mut stream: R, hub: &Hub, id: &str, liveness: Duration)
where
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    loop {
        let frame = match tokio::time::timeout(liveness, stream.next()).await {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(_) => {
                tracing::info!("[Hub] Connection {} timed out", id);
                break;
            }
        };

        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!("[Hub] Read from {} failed: {}", id, e);
                break;
            }
        };

        let submitted = match Command::from_client(text.as_str()) {
            Ok(cmd) => hub.submit(id, cmd).await,
            Err(e) => hub.reply(id, Command::error(format!("malformed command: {}", e))).await,
        };
        if submitted.is_err() {
            break;
        }
    }
}

/// Drain `outbound` into the socket, probing the peer on an interval
pub async fn write_pump<S>(
    mut sink: S,
    mut outbound: mpsc::Receiver<Command>,
    ping_interval: Duration,
) -> Result<(), TransportError>
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    let start = tokio::time::Instant::now() + ping_interval;
    let mut ping = tokio::time::interval_at(start, ping_interval);

    loop {
        let frame = tokio::select! {
            next = outbound.recv() => match next {
                Some(cmd) => Message::Text(serde_json::to_string(&cmd)?.into()),
                None => {
                    // Hub closed the queue.
                    let _ = sink.send(Message::Close(None)).await;
                    return Ok(());
                }
            },
            _ = ping.tick() => Message::Ping(Bytes::new()),
        };

        sink.send(frame)
            .await
            .map_err(|e| TransportError::Write(e.to_string()))?;
    }
}
