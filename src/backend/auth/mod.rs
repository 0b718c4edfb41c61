//! Authentication Module
//!
//! Session token verification and the shared auth cache.
//!
//! # Module Structure
//!
//! ```text
//! auth/
//! ├── mod.rs      - Module exports and documentation
//! ├── sessions.rs - JWT issue/verify
//! └── cache.rs    - Auth cache over the pub/sub key/value store
//! ```
//!
//! # Authentication Flow
//!
//! 1. A client sends an `auth` command carrying its signed token
//! 2. The token is verified; the session is cached under the raw token
//! 3. Subscriptions opened with that token resolve the cached session to
//!    filter document events

/// JWT token generation and validation
pub mod sessions;

/// Auth cache and lookup trait
pub mod cache;

pub use cache::{AuthCache, AuthLookup};
pub use sessions::{Claims, TokenVerifier};
