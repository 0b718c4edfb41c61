/**
 * Realtime Route Handlers
 *
 * # Routes
 *
 * - `GET /ws` - WebSocket upgrade onto the hub
 * - `GET /sse` - Server-Sent Events stream from the broker
 * - `POST /sse/msg` - Command intake for SSE clients
 */

use axum::routing::{get, post};
use axum::Router;

use crate::backend::realtime::{handle_sse_message, handle_sse_subscription, handle_websocket};
use crate::backend::server::state::AppState;

/// Configure realtime routes
///
/// ## GET /ws
///
/// Upgrades to a WebSocket. The first frame the client receives is `init`
/// with its connection ID; every frame after that is a JSON command.
///
/// ## GET /sse
///
/// Opens a push-only stream. The first event is `init`.
///
/// ## POST /sse/msg
///
/// Body is a JSON command whose `sid` is the ID received in `init`.
/// Responds `202 Accepted`; replies are pushed on the SSE stream.
pub fn configure_realtime_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/ws", get(handle_websocket))
        .route("/sse", get(handle_sse_subscription))
        .route("/sse/msg", post(handle_sse_message))
}
