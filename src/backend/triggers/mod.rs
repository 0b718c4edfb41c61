//! Function Triggers Module
//!
//! Server-side reactions to document changes. Every publish is copied onto
//! the system channel; the runner consumes that channel and invokes the
//! handlers registered for the changed collection and event type.
//!
//! # Module Structure
//!
//! ```text
//! triggers/
//! ├── mod.rs      - Module exports and documentation
//! ├── registry.rs - Handler trait and (collection, event) lookup table
//! └── runner.rs   - System channel consumer
//! ```
//!
//! Handlers are keyed by the collection's base name, so `tasks_760_` and
//! `tasks` share the same handlers.

/// Handler trait and lookup table
pub mod registry;

/// System channel consumer
pub mod runner;

pub use registry::{TriggerEvent, TriggerHandler, TriggerRegistry};
pub use runner::{TriggerHandle, TriggerRunner};
