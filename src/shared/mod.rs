//! Shared Module
//!
//! Transport-agnostic types used by every realtime component: the command
//! envelope, the collection permission codec, the authenticated session
//! and configuration.

/// Command envelope and protocol constants
pub mod command;

/// Collection permission codec
pub mod permission;

/// Authenticated session data
pub mod auth;

/// Shared error types
pub mod error;

/// Server configuration
pub mod config;

pub use auth::Auth;
pub use command::{Command, CommandType, DB_CHANNEL_PREFIX, SYSTEM_CHANNEL, SYSTEM_SENDER};
pub use config::{ConfigError, ServerConfig, ServerConfigBuilder};
pub use error::SharedError;
pub use permission::{read_permission, write_permission, PermissionBits, PermissionLevel};
