//! Server Module
//!
//! Initialization and configuration of the Axum HTTP server.
//!
//! # Architecture
//!
//! - **`state`** - Application state structure and `FromRef` implementations
//! - **`config`** - Pub/sub backend selection
//! - **`init`** - Server initialization and app creation
//!
//! # Module Structure
//!
//! ```text
//! server/
//! ├── mod.rs          - Module exports and documentation
//! ├── state.rs        - AppState and FromRef implementations
//! ├── config.rs       - Backend selection and housekeeping
//! └── init.rs         - Server initialization and app creation
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use basecast::backend::server::create_app;
//! use basecast::shared::ServerConfig;
//!
//! # async fn example() {
//! let app = create_app(ServerConfig::default()).await;
//! # }
//! ```

/// Application state management
pub mod state;

/// Backend selection
pub mod config;

/// Server initialization
pub mod init;

pub use init::{create_app, create_app_with_backend, create_app_with_triggers};
pub use state::AppState;
