//! Backend Error Module
//!
//! Error types of the server side and their HTTP conversions.
//!
//! # Module Structure
//!
//! ```text
//! error/
//! ├── mod.rs        - Module exports and documentation
//! ├── types.rs      - Error type definitions
//! └── conversion.rs - IntoResponse implementation
//! ```

pub mod types;

pub mod conversion;

// Re-export commonly used types
pub use types::{AuthError, BackendError, PubSubError};
