/**
 * Server-Sent Events Subscription Handler
 *
 * Implements `GET /sse`: every request becomes one broker connection whose
 * outbound queue is streamed as SSE frames. The first frame is `init`,
 * carrying the connection ID the client must use as `sid` when it posts
 * commands to `/sse/msg`.
 *
 * # Frame Format
 *
 * ```http
 * event: chan_out
 * data: {"sid":"...","type":"chan_out","data":"...","channel":"room"}
 * ```
 *
 * The SSE event name is the command type. Keep-alive comments are
 * injected by axum while the stream is idle.
 *
 * # Connection Management
 *
 * When the client goes away axum drops the stream, which closes the
 * connection's queue; the broker then cancels its subscriptions.
 */

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::backend::realtime::broker::Broker;
use crate::shared::Command;

/// Render one command as an SSE frame
pub fn to_sse_event(cmd: &Command) -> Result<Event, axum::Error> {
    Event::default().event(cmd.kind.as_str()).json_data(cmd)
}

/// Handle an SSE subscription (GET /sse)
pub async fn handle_sse_subscription(
    State(broker): State<Broker>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let (sink, outbound) = mpsc::channel(broker.outbound_capacity());

    tokio::spawn(async move {
        match broker.accept(sink).await {
            Ok(id) => tracing::debug!("[Broker] Connection {} finished", id),
            Err(e) => tracing::error!("[Broker] Unable to serve SSE connection: {}", e),
        }
    });

    let stream = ReceiverStream::new(outbound).map(|cmd| to_sse_event(&cmd));
    Sse::new(stream).keep_alive(KeepAlive::default())
}
