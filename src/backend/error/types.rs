/**
 * Backend Error Types
 *
 * This module defines the error types of the server side of the realtime
 * system.
 *
 * # Error Categories
 *
 * ## Pub/Sub Errors
 *
 * Raised by the key/value + publish/subscribe backends:
 * - Missing keys (`NotFound`), which callers often map to a default
 * - Transport failures (Redis unreachable, subscription stream ended)
 * - Payload (de)serialization failures
 *
 * ## Auth Errors
 *
 * Raised while verifying or resolving session tokens. They are reported
 * to the offending connection; the connection stays open.
 *
 * ## Handler / State / Protocol Errors
 *
 * Raised by HTTP handlers and converted to JSON responses.
 */

use thiserror::Error;
use axum::http::StatusCode;
use crate::shared::SharedError;

/// Errors raised by a pub/sub backend
#[derive(Debug, Error)]
pub enum PubSubError {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("pub/sub transport error: {0}")]
    Transport(String),

    #[error("value at {0} is not an integer")]
    InvalidValue(String),

    #[error("payload serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PubSubError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<redis::RedisError> for PubSubError {
    fn from(err: redis::RedisError) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Errors raised while resolving a session token
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("token expired")]
    Expired,

    #[error("no session for token")]
    Missing,

    #[error(transparent)]
    Backend(#[from] PubSubError),
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => Self::Expired,
            _ => Self::InvalidToken(err.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Handler error: {message}")]
    HandlerError {
        status: StatusCode,
        message: String,
    },

    #[error("State error: {message}")]
    StateError {
        message: String,
    },

    #[error("Protocol error: {message}")]
    ProtocolError {
        message: String,
    },

    #[error(transparent)]
    SharedError(#[from] SharedError),

    #[error(transparent)]
    PubSub(#[from] PubSubError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl BackendError {
    pub fn handler(status: StatusCode, message: impl Into<String>) -> Self {
        Self::HandlerError {
            status,
            message: message.into(),
        }
    }

    pub fn state(message: impl Into<String>) -> Self {
        Self::StateError {
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::ProtocolError {
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::HandlerError { status, .. } => *status,
            Self::StateError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ProtocolError { .. } => StatusCode::BAD_REQUEST,
            Self::SharedError(SharedError::ValidationError { .. }) => StatusCode::BAD_REQUEST,
            Self::PubSub(PubSubError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::PubSub(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Auth(AuthError::Backend(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::SerializationError(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::HandlerError { message, .. } => message.clone(),
            Self::StateError { message, .. } => message.clone(),
            Self::ProtocolError { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
