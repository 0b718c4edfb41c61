//! Call-counting pub/sub backend
//!
//! Wraps the in-process backend and records how often the operations
//! that matter to the zero-subscriber and reserved-channel rules are hit.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use basecast::backend::error::PubSubError;
use basecast::backend::pubsub::{MemoryPubSub, PubSubBackend};
use basecast::shared::Command;
use serde::{Serialize, Serializer};
use tokio::sync::{mpsc, oneshot};

pub struct CountingBackend {
    inner: MemoryPubSub,
    pub publishes: AtomicUsize,
    pub published_channels: std::sync::Mutex<Vec<String>>,
}

impl CountingBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryPubSub::new(Duration::from_millis(500)),
            publishes: AtomicUsize::new(0),
            published_channels: std::sync::Mutex::new(Vec::new()),
        })
    }

    pub fn publish_count(&self) -> usize {
        self.publishes.load(Ordering::SeqCst)
    }

    pub fn channels(&self) -> Vec<String> {
        self.published_channels.lock().unwrap().clone()
    }
}

#[async_trait]
impl PubSubBackend for CountingBackend {
    async fn get(&self, key: &str) -> Result<String, PubSubError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), PubSubError> {
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<(), PubSubError> {
        self.inner.delete(key).await
    }

    async fn increment(&self, key: &str, delta: i64) -> Result<i64, PubSubError> {
        self.inner.increment(key, delta).await
    }

    async fn decrement(&self, key: &str, delta: i64) -> Result<i64, PubSubError> {
        self.inner.decrement(key, delta).await
    }

    async fn subscribe(
        &self,
        receiver: mpsc::Sender<Command>,
        token: String,
        channel: String,
        close: oneshot::Receiver<()>,
    ) -> Result<(), PubSubError> {
        self.inner.subscribe(receiver, token, channel, close).await
    }

    async fn publish(&self, msg: Command) -> Result<(), PubSubError> {
        self.publishes.fetch_add(1, Ordering::SeqCst);
        self.published_channels.lock().unwrap().push(msg.channel.clone());
        self.inner.publish(msg).await
    }

    async fn subscriber_count(&self, channel: &str) -> Result<usize, PubSubError> {
        self.inner.subscriber_count(channel).await
    }

    async fn queue_work(&self, key: &str, value: &str) -> Result<(), PubSubError> {
        self.inner.queue_work(key, value).await
    }

    async fn dequeue_work(&self, key: &str) -> Result<Option<String>, PubSubError> {
        self.inner.dequeue_work(key).await
    }
}

/// Document whose serialization is observable
#[derive(Clone, Default)]
pub struct CountingDocument {
    pub serializations: Arc<AtomicUsize>,
}

impl CountingDocument {
    pub fn count(&self) -> usize {
        self.serializations.load(Ordering::SeqCst)
    }
}

impl Serialize for CountingDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.serializations.fetch_add(1, Ordering::SeqCst);
        serde_json::json!({"id": "doc-1", "accountId": "acct-1", "ownerId": "user-1"}).serialize(serializer)
    }
}
