/**
 * Command Intake for Push-Only Connections
 *
 * SSE is one-way, so clients post their commands to `POST /sse/msg`. The
 * body is a JSON command whose `sid` names the client's SSE connection
 * (the ID it received in `init`). Replies arrive on that SSE stream, not
 * in the HTTP response.
 */

use axum::{extract::State, http::StatusCode};

use crate::backend::error::BackendError;
use crate::backend::realtime::broker::Broker;
use crate::shared::{Command, SharedError};

/// Decode a posted command; the sender must identify its connection
pub fn parse_posted_command(body: &str) -> Result<Command, BackendError> {
    let cmd = Command::from_client(body)?;
    if cmd.sender_id.is_empty() {
        return Err(SharedError::validation("sid", "sid is required").into());
    }
    Ok(cmd)
}

/// Handle a posted command (POST /sse/msg)
///
/// Returns `202 Accepted` once the command is queued for routing, or
/// `400 Bad Request` when the body is not a command.
pub async fn handle_sse_message(
    State(broker): State<Broker>,
    body: String,
) -> Result<StatusCode, BackendError> {
    let cmd = parse_posted_command(&body)?;
    tracing::debug!("[Broker] {} posted by {}", cmd.kind, cmd.sender_id);
    broker.broadcast(cmd).await?;
    Ok(StatusCode::ACCEPTED)
}
