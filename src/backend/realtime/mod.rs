//! Realtime Module
//!
//! Event distribution to live client connections.
//!
//! # Architecture
//!
//! - **`connections`** - Per-coordinator registry of live connections
//! - **`router`** - Routing table shared by the hub and the broker
//! - **`hub`** - Coordinator for full-duplex (WebSocket) connections
//! - **`broker`** - Coordinator for push-only (SSE) connections
//! - **`socket`** - WebSocket upgrade handler and read/write pumps
//! - **`subscription`** - SSE stream handler
//! - **`broadcast`** - Command intake for SSE clients
//!
//! ```text
//! client ──ws──> read pump ──submit──> Hub ──deliver──> write pump ──ws──> client
//!                                       │
//!                                       └── subscribe/publish ──> PubSubBackend
//! ```

pub mod broadcast;
pub mod broker;
pub mod connections;
pub mod hub;
pub mod router;
pub mod socket;
pub mod subscription;

pub use broadcast::handle_sse_message;
pub use broker::Broker;
pub use connections::{ConnectionId, ConnectionRegistry, Connections, Delivery};
pub use hub::{Hub, HubConnection};
pub use router::{RouterContext, Transport};
pub use socket::handle_websocket;
pub use subscription::handle_sse_subscription;
