/**
 * In-Process Pub/Sub Backend
 *
 * Single-node implementation of the pub/sub contract. Channels are
 * `tokio::sync::broadcast` senders kept in a mutex-guarded registry, the
 * key/value store and work queues are plain maps behind their own mutexes.
 *
 * # Thread Safety
 *
 * Every registry is guarded by a `std::sync::Mutex` that is never held
 * across an `.await`.
 */

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::sync::broadcast::error::RecvError;

use crate::backend::error::PubSubError;
use crate::backend::pubsub::delivery::{forward, Flow};
use crate::backend::pubsub::PubSubBackend;
use crate::shared::{Command, SYSTEM_CHANNEL};

const CHANNEL_CAPACITY: usize = 1000;

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

pub struct MemoryPubSub {
    channels: Mutex<HashMap<String, broadcast::Sender<Command>>>,
    store: Mutex<HashMap<String, Entry>>,
    queues: Mutex<HashMap<String, VecDeque<String>>>,
    send_timeout: Duration,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryPubSub {
    pub fn new(send_timeout: Duration) -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            store: Mutex::new(HashMap::new()),
            queues: Mutex::new(HashMap::new()),
            send_timeout,
        }
    }

    fn attach(&self, channel: &str) -> broadcast::Receiver<Command> {
        lock(&self.channels)
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    fn fan_out(&self, channel: &str, msg: Command) -> usize {
        match lock(&self.channels).get(channel) {
            Some(sender) => sender.send(msg).unwrap_or(0),
            None => 0,
        }
    }

    /// Drop channels nobody listens to anymore
    pub fn prune_idle_channels(&self) -> usize {
        let mut channels = lock(&self.channels);
        let before = channels.len();
        channels.retain(|_, sender| sender.receiver_count() > 0);
        before - channels.len()
    }

    /// Drop expired key/value entries
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut store = lock(&self.store);
        let before = store.len();
        store.retain(|_, entry| entry.is_live(now));
        before - store.len()
    }

    fn add(&self, key: &str, delta: i64) -> Result<i64, PubSubError> {
        let now = Instant::now();
        let mut store = lock(&self.store);
        let current = match store.get(key).filter(|entry| entry.is_live(now)) {
            Some(entry) => entry
                .value
                .parse::<i64>()
                .map_err(|_| PubSubError::InvalidValue(key.to_string()))?,
            None => 0,
        };

        let next = current
            .checked_add(delta)
            .ok_or_else(|| PubSubError::InvalidValue(key.to_string()))?;
        let expires_at = store.get(key).and_then(|entry| entry.expires_at).filter(|at| *at > now);
        store.insert(
            key.to_string(),
            Entry {
                value: next.to_string(),
                expires_at,
            },
        );
        Ok(next)
    }
}

#[async_trait]
impl PubSubBackend for MemoryPubSub {
    async fn get(&self, key: &str) -> Result<String, PubSubError> {
        let now = Instant::now();
        lock(&self.store)
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone())
            .ok_or_else(|| PubSubError::NotFound(key.to_string()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), PubSubError> {
        let entry = Entry {
            value: value.to_string(),
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        lock(&self.store).insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), PubSubError> {
        lock(&self.store).remove(key);
        Ok(())
    }

    async fn increment(&self, key: &str, delta: i64) -> Result<i64, PubSubError> {
        self.add(key, delta)
    }

    async fn decrement(&self, key: &str, delta: i64) -> Result<i64, PubSubError> {
        let delta = delta
            .checked_neg()
            .ok_or_else(|| PubSubError::InvalidValue(key.to_string()))?;
        self.add(key, delta)
    }

    async fn subscribe(
        &self,
        receiver: mpsc::Sender<Command>,
        token: String,
        channel: String,
        mut close: oneshot::Receiver<()>,
    ) -> Result<(), PubSubError> {
        let mut inbound = self.attach(&channel);
        tracing::debug!("[PubSub] Subscribed to {}", channel);

        loop {
            let msg = tokio::select! {
                biased;
                _ = &mut close => break,
                received = inbound.recv() => match received {
                    Ok(msg) => msg,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("[PubSub] Subscriber on {} lagged, skipped {} messages", channel, skipped);
                        continue;
                    }
                    Err(RecvError::Closed) => {
                        return Err(PubSubError::Transport(format!("channel {} closed", channel)));
                    }
                },
            };

            if forward(self, &receiver, &token, &channel, msg, self.send_timeout, &mut close).await == Flow::Stop {
                break;
            }
        }

        tracing::debug!("[PubSub] Unsubscribed from {}", channel);
        Ok(())
    }

    async fn publish(&self, msg: Command) -> Result<(), PubSubError> {
        let system_copy = msg.to_system_event();
        let channel = msg.channel.clone();
        let delivered = self.fan_out(&channel, msg);
        tracing::debug!("[PubSub] Published on {} to {} subscribers", channel, delivered);

        self.fan_out(SYSTEM_CHANNEL, system_copy);
        Ok(())
    }

    async fn subscriber_count(&self, channel: &str) -> Result<usize, PubSubError> {
        Ok(lock(&self.channels)
            .get(channel)
            .map_or(0, broadcast::Sender::receiver_count))
    }

    async fn queue_work(&self, key: &str, value: &str) -> Result<(), PubSubError> {
        lock(&self.queues)
            .entry(key.to_string())
            .or_default()
            .push_back(value.to_string());
        Ok(())
    }

    async fn dequeue_work(&self, key: &str) -> Result<Option<String>, PubSubError> {
        Ok(lock(&self.queues).get_mut(key).and_then(VecDeque::pop_front))
    }
}
