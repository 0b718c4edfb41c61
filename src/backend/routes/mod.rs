//! Route Configuration Module
//!
//! This module configures all HTTP routes for the backend server.
//!
//! - **`router`** - Main router creation and route assembly
//! - **`realtime_routes`** - WebSocket and SSE endpoints
//!
//! # Routes
//!
//! - `GET /ws` - WebSocket connection
//! - `GET /sse` - Server-Sent Events stream
//! - `POST /sse/msg` - Command intake for SSE clients
//! - `GET /health` - Liveness probe

/// Main router creation
pub mod router;

/// Realtime endpoints
pub mod realtime_routes;

pub use router::create_router;
