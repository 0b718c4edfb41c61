//! Shared Error Types
//!
//! Errors raised while checking client input before it reaches the
//! backend.
//!
//! # Usage
//!
//! ```rust
//! use basecast::shared::error::SharedError;
//!
//! let error = SharedError::validation("channel", "no channel was specified");
//! ```
use thiserror::Error;

/// Shared error types
#[derive(Debug, Error, Clone)]
pub enum SharedError {
    /// Data validation error
    #[error("Validation error in field '{field}': {message}")]
    ValidationError {
        /// The field that failed validation
        field: String,
        /// Human-readable error message
        message: String,
    },
}

impl SharedError {
    /// Create a new validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }
}
