//! Basecast - Realtime Event Distribution
//!
//! Realtime core of a multi-tenant backend-as-a-service: clients connect
//! over WebSocket or Server-Sent Events, join channels, publish messages,
//! and receive document change notifications filtered by per-collection
//! permissions. Messages travel between server processes through a Redis
//! pub/sub backend, or an in-process one on a single node.
//!
//! # Module Structure
//!
//! - **`shared`** - Transport-agnostic types
//!   - Command envelope and protocol constants
//!   - Collection permission codec
//!   - Session data, configuration, error types
//!
//! - **`backend`** - Server-side code (only compiled with `ssr` feature)
//!   - Pub/sub backends (Redis and in-process)
//!   - Auth verification and cache
//!   - Connection hub (WebSocket) and event broker (SSE)
//!   - Function triggers on document changes
//!   - Axum server assembly
//!
//! # Feature Flags
//!
//! - **`ssr`** - Server (enables the `backend` module), on by default
//!
//! # Example
//!
//! ```rust,no_run
//! use basecast::backend::server::init::create_app;
//! use basecast::shared::ServerConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::from_env()?;
//! let app = create_app(config).await;
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

/// Shared types and data structures
pub mod shared;

/// Backend server-side code
#[cfg(feature = "ssr")]
pub mod backend;
