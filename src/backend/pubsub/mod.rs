//! Pub/Sub Backend Module
//!
//! Abstraction over a shared key/value store with publish/subscribe and
//! simple FIFO queues. Two implementations exist:
//!
//! - **`redis`** - distributed backend shared by every server process
//! - **`memory`** - in-process backend for single-node and development use
//!
//! # Module Structure
//!
//! ```text
//! pubsub/
//! ├── mod.rs      - Backend trait, typed helpers, document notifications
//! ├── delivery.rs - Bounded-wait send to a subscriber queue
//! ├── filter.rs   - Per-subscriber permission filter for document events
//! ├── memory.rs   - In-process backend
//! └── redis.rs    - Redis backend
//! ```
//!
//! # Delivery
//!
//! Every subscription runs in its own task and writes into the owning
//! connection's outbound queue. A write that cannot complete within the
//! backend's send timeout is dropped with a warning, and the subscription's
//! close signal always wins over a pending write.

use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::{mpsc, oneshot};

use crate::backend::error::PubSubError;
use crate::shared::{Command, CommandType, DB_CHANNEL_PREFIX, SYSTEM_SENDER};

/// Bounded-wait send primitive
pub mod delivery;

/// Document event permission filter
pub mod filter;

/// In-process backend
pub mod memory;

/// Redis backend
pub mod redis;

pub use delivery::{send_with_deadline, SendOutcome};
pub use memory::MemoryPubSub;
pub use self::redis::RedisPubSub;

/// Contract shared by the distributed and in-process backends
#[async_trait]
pub trait PubSubBackend: Send + Sync + 'static {
    /// Read a string value, `PubSubError::NotFound` when absent or expired
    async fn get(&self, key: &str) -> Result<String, PubSubError>;

    /// Store a string value, expiring after `ttl` when given
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), PubSubError>;

    async fn delete(&self, key: &str) -> Result<(), PubSubError>;

    /// Atomically add `delta` to an integer counter, returning the new value
    async fn increment(&self, key: &str, delta: i64) -> Result<i64, PubSubError>;

    /// Atomically subtract `delta` from an integer counter
    async fn decrement(&self, key: &str, delta: i64) -> Result<i64, PubSubError>;

    /// Forward messages published on `channel` into `receiver` until `close`
    /// fires (or its sender is dropped).
    ///
    /// Document events are filtered against the auth cached under `token`.
    /// Returns an error only when the underlying transport fails.
    async fn subscribe(
        &self,
        receiver: mpsc::Sender<Command>,
        token: String,
        channel: String,
        close: oneshot::Receiver<()>,
    ) -> Result<(), PubSubError>;

    /// Deliver `msg` to every subscriber of `msg.channel` and, best effort,
    /// a system-flagged copy to the system channel.
    async fn publish(&self, msg: Command) -> Result<(), PubSubError>;

    /// Number of subscribers currently attached to `channel`
    async fn subscriber_count(&self, channel: &str) -> Result<usize, PubSubError>;

    /// Append to the tail of a work queue
    async fn queue_work(&self, key: &str, value: &str) -> Result<(), PubSubError>;

    /// Pop the head of a work queue, `None` when empty
    async fn dequeue_work(&self, key: &str) -> Result<Option<String>, PubSubError>;
}

/// JSON helpers layered over any backend
#[async_trait]
pub trait PubSubExt {
    async fn get_typed<T>(&self, key: &str) -> Result<T, PubSubError>
    where
        T: DeserializeOwned + Send;

    async fn set_typed<T>(&self, key: &str, value: &T, ttl: Option<Duration>) -> Result<(), PubSubError>
    where
        T: Serialize + Sync + ?Sized;

    /// Publish a document event on `channel`.
    ///
    /// When nobody is subscribed the document is neither serialized nor
    /// published. Returns whether a publish happened.
    async fn publish_document<T>(
        &self,
        channel: &str,
        kind: CommandType,
        document: &T,
    ) -> Result<bool, PubSubError>
    where
        T: Serialize + Sync + ?Sized;
}

#[async_trait]
impl<B> PubSubExt for B
where
    B: PubSubBackend + ?Sized,
{
    async fn get_typed<T>(&self, key: &str) -> Result<T, PubSubError>
    where
        T: DeserializeOwned + Send,
    {
        let raw = self.get(key).await?;
        Ok(serde_json::from_str(&raw)?)
    }

    async fn set_typed<T>(&self, key: &str, value: &T, ttl: Option<Duration>) -> Result<(), PubSubError>
    where
        T: Serialize + Sync + ?Sized,
    {
        let raw = serde_json::to_string(value)?;
        self.set(key, &raw, ttl).await
    }

    async fn publish_document<T>(
        &self,
        channel: &str,
        kind: CommandType,
        document: &T,
    ) -> Result<bool, PubSubError>
    where
        T: Serialize + Sync + ?Sized,
    {
        if self.subscriber_count(channel).await? == 0 {
            tracing::debug!("[PubSub] No subscribers on {}, skipping {}", channel, kind);
            return Ok(false);
        }

        let data = serde_json::to_string(document)?;
        let msg = Command::new(SYSTEM_SENDER, kind, data).with_channel(channel);
        self.publish(msg).await?;
        Ok(true)
    }
}

/// Change that happened to a stored document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentEvent {
    Created,
    Updated,
    Deleted,
}

impl DocumentEvent {
    pub fn command_type(self) -> CommandType {
        match self {
            Self::Created => CommandType::DbCreated,
            Self::Updated => CommandType::DbUpdated,
            Self::Deleted => CommandType::DbDeleted,
        }
    }
}

/// Channel carrying change notifications of a collection
pub fn document_channel(collection: &str) -> String {
    format!("{}{}", DB_CHANNEL_PREFIX, collection)
}

/// Entry point for the document store: announce a change on `db-<collection>`
pub async fn notify_document_change<B, T>(
    backend: &B,
    collection: &str,
    event: DocumentEvent,
    document: &T,
) -> Result<bool, PubSubError>
where
    B: PubSubBackend + ?Sized,
    T: Serialize + Sync + ?Sized,
{
    backend
        .publish_document(&document_channel(collection), event.command_type(), document)
        .await
}
