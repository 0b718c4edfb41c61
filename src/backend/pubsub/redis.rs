/**
 * Redis Pub/Sub Backend
 *
 * Distributed implementation of the pub/sub contract. Key/value, counter
 * and queue operations go through a shared multiplexed
 * `ConnectionManager`; every subscription opens its own dedicated pub/sub
 * connection, which is closed when the subscription ends.
 *
 * # System Channel
 *
 * Each publish is followed by a detached, time-limited publish of a
 * system-flagged copy onto the system channel. Its failure is logged and
 * never reported to the caller.
 */

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::sync::{mpsc, oneshot};

use crate::backend::error::PubSubError;
use crate::backend::pubsub::delivery::{forward, Flow};
use crate::backend::pubsub::PubSubBackend;
use crate::shared::{Command, SYSTEM_CHANNEL};

const SYSTEM_PUBLISH_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Clone)]
pub struct RedisPubSub {
    client: redis::Client,
    con: ConnectionManager,
    send_timeout: Duration,
}

impl RedisPubSub {
    /// Connect to the Redis server at `url`
    pub async fn connect(url: &str, send_timeout: Duration) -> Result<Self, PubSubError> {
        let client = redis::Client::open(url)?;
        let con = ConnectionManager::new(client.clone()).await?;
        tracing::info!("[PubSub] Connected to Redis");
        Ok(Self {
            client,
            con,
            send_timeout,
        })
    }
}

#[async_trait]
impl PubSubBackend for RedisPubSub {
    async fn get(&self, key: &str) -> Result<String, PubSubError> {
        let mut con = self.con.clone();
        let value: Option<String> = con.get(key).await?;
        value.ok_or_else(|| PubSubError::NotFound(key.to_string()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), PubSubError> {
        let mut con = self.con.clone();
        match ttl {
            Some(ttl) => {
                let _: () = con.set_ex(key, value, ttl.as_secs().max(1)).await?;
            }
            None => {
                let _: () = con.set(key, value).await?;
            }
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), PubSubError> {
        let mut con = self.con.clone();
        let _: i64 = con.del(key).await?;
        Ok(())
    }

    async fn increment(&self, key: &str, delta: i64) -> Result<i64, PubSubError> {
        let mut con = self.con.clone();
        Ok(con.incr(key, delta).await?)
    }

    async fn decrement(&self, key: &str, delta: i64) -> Result<i64, PubSubError> {
        let mut con = self.con.clone();
        Ok(con.decr(key, delta).await?)
    }

    async fn subscribe(
        &self,
        receiver: mpsc::Sender<Command>,
        token: String,
        channel: String,
        mut close: oneshot::Receiver<()>,
    ) -> Result<(), PubSubError> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(&channel).await?;
        let mut messages = pubsub.into_on_message();
        tracing::debug!("[PubSub] Subscribed to {}", channel);

        loop {
            let raw = tokio::select! {
                biased;
                _ = &mut close => break,
                next = messages.next() => match next {
                    Some(raw) => raw,
                    None => {
                        tracing::error!("[PubSub] Redis subscription to {} ended", channel);
                        return Err(PubSubError::Transport(format!("subscription to {} ended", channel)));
                    }
                },
            };

            let payload: String = match raw.get_payload() {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::warn!("[PubSub] Unreadable payload on {}: {}", channel, e);
                    continue;
                }
            };
            let msg: Command = match serde_json::from_str(&payload) {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!("[PubSub] Undecodable command on {}: {}", channel, e);
                    continue;
                }
            };

            if forward(self, &receiver, &token, &channel, msg, self.send_timeout, &mut close).await == Flow::Stop {
                break;
            }
        }

        tracing::debug!("[PubSub] Unsubscribed from {}", channel);
        Ok(())
    }

    async fn publish(&self, msg: Command) -> Result<(), PubSubError> {
        let payload = serde_json::to_string(&msg)?;
        let system_payload = serde_json::to_string(&msg.to_system_event())?;

        let mut system_con = self.con.clone();
        tokio::spawn(async move {
            let outcome: Result<redis::RedisResult<i64>, _> = tokio::time::timeout(
                SYSTEM_PUBLISH_TIMEOUT,
                system_con.publish(SYSTEM_CHANNEL, system_payload),
            )
            .await;
            match outcome {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => tracing::debug!("[PubSub] System channel publish failed: {}", e),
                Err(_) => tracing::debug!("[PubSub] System channel publish timed out"),
            }
        });

        let mut con = self.con.clone();
        let receivers: i64 = con.publish(&msg.channel, payload).await?;
        tracing::debug!("[PubSub] Published on {} to {} receivers", msg.channel, receivers);
        Ok(())
    }

    async fn subscriber_count(&self, channel: &str) -> Result<usize, PubSubError> {
        let mut con = self.con.clone();
        let counts: HashMap<String, usize> = redis::cmd("PUBSUB")
            .arg("NUMSUB")
            .arg(channel)
            .query_async(&mut con)
            .await?;
        Ok(counts.get(channel).copied().unwrap_or(0))
    }

    async fn queue_work(&self, key: &str, value: &str) -> Result<(), PubSubError> {
        let mut con = self.con.clone();
        let _: i64 = con.rpush(key, value).await?;
        Ok(())
    }

    async fn dequeue_work(&self, key: &str) -> Result<Option<String>, PubSubError> {
        let mut con = self.con.clone();
        Ok(con.lpop(key, None).await?)
    }
}
