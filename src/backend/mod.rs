//! Backend Module
//!
//! All server-side code. Only compiled when the `ssr` feature is enabled.
//!
//! # Architecture
//!
//! - **`pubsub`** - Key/value + publish/subscribe backends
//! - **`auth`** - Token verification and the shared auth cache
//! - **`realtime`** - Connection hub, event broker and their transports
//! - **`triggers`** - Server-side handlers for document changes
//! - **`server`** - Application state and initialization
//! - **`routes`** - HTTP route configuration
//! - **`error`** - Backend-specific error types
//!
//! # Module Structure
//!
//! ```text
//! backend/
//! ├── mod.rs          - Module exports and documentation
//! ├── pubsub/         - Redis and in-process backends
//! ├── auth/           - Sessions and auth cache
//! ├── realtime/       - Hub, broker, WebSocket and SSE
//! ├── triggers/       - Trigger registry and runner
//! ├── server/         - Server initialization and state
//! ├── routes/         - Route configuration
//! └── error/          - Error types
//! ```
//!
//! # Data Flow
//!
//! A `chan_in` from a client is routed by its coordinator (hub or broker),
//! published through the backend as `chan_out`, and delivered by every
//! subscription on that channel into its connection's outbound queue. A
//! system-flagged copy of every publish reaches the trigger runner.

/// Server setup and configuration
pub mod server;

/// Route configuration
pub mod routes;

/// Pub/sub backends
pub mod pubsub;

/// Authentication
pub mod auth;

/// Real-time connection handling
pub mod realtime;

/// Function triggers
pub mod triggers;

/// Backend error types
pub mod error;

pub use error::BackendError;
pub use pubsub::{notify_document_change, DocumentEvent, PubSubBackend, PubSubExt};
pub use server::create_app;
