/**
 * Live Connection Registry
 *
 * Owned by exactly one coordinating task (hub or broker), so nothing in
 * here is locked. Each connection has a bounded outbound queue consumed by
 * its transport writer and the cancellation handles of its subscriptions.
 *
 * # Backpressure
 *
 * Delivery never waits: a full (or closed) outbound queue is treated as a
 * disconnect, and the connection is torn down on the spot. Transports that
 * keep their own handle on the queue register a notifier that fires on
 * removal, so they learn about it too.
 *
 * # Presence
 *
 * When presence counting is enabled, opening a subscription increments
 * `presence:<channel>` and removal decrements it. Both go through one
 * counting task in the order they happened.
 */

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::backend::pubsub::PubSubBackend;
use crate::shared::Command;

pub type ConnectionId = String;

/// Generate a fresh, unique connection ID
pub fn new_connection_id() -> ConnectionId {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Key of the online counter of a channel
pub fn presence_key(channel: &str) -> String {
    format!("presence:{}", channel)
}

/// Result of routing one command to one connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// Connection unknown, gone, or too slow; nothing was queued
    Dropped,
}

/// One connection's attachment to one channel
#[derive(Debug)]
pub struct Subscription {
    pub channel: String,
    cancel: oneshot::Sender<()>,
}

impl Subscription {
    /// Create a subscription and the close signal its task listens on
    pub fn new(channel: impl Into<String>) -> (Self, oneshot::Receiver<()>) {
        let (cancel, close) = oneshot::channel();
        (
            Self {
                channel: channel.into(),
                cancel,
            },
            close,
        )
    }

    /// Fire the close signal
    pub fn cancel(self) -> String {
        // The task may already be gone.
        let _ = self.cancel.send(());
        self.channel
    }
}

struct Connection {
    outbound: mpsc::Sender<Command>,
    subscriptions: Vec<Subscription>,
    /// Fired when the connection is removed
    dropped: Option<oneshot::Sender<()>>,
}

/// Sequential writer of presence counter updates
#[derive(Clone)]
pub struct PresenceCounter {
    updates: mpsc::UnboundedSender<(String, i64)>,
}

impl PresenceCounter {
    /// Start the counting task; it ends when every counter handle is dropped
    pub fn spawn(backend: Arc<dyn PubSubBackend>) -> Self {
        let (updates, mut pending) = mpsc::unbounded_channel::<(String, i64)>();
        tokio::spawn(async move {
            while let Some((channel, delta)) = pending.recv().await {
                let key = presence_key(&channel);
                let result = if delta >= 0 {
                    backend.increment(&key, delta).await
                } else {
                    backend.decrement(&key, -delta).await
                };
                if let Err(e) = result {
                    tracing::warn!("[Realtime] Failed to update {}: {}", key, e);
                }
            }
        });
        Self { updates }
    }

    pub fn joined(&self, channel: &str) {
        self.adjust(channel, 1);
    }

    pub fn left(&self, channel: &str) {
        self.adjust(channel, -1);
    }

    fn adjust(&self, channel: &str, delta: i64) {
        // Counting task only stops with the runtime.
        let _ = self.updates.send((channel.to_string(), delta));
    }
}

/// Routing surface the shared dispatcher needs from a coordinator
pub trait ConnectionRegistry {
    /// Queue `cmd` for connection `id` without waiting
    fn deliver(&mut self, id: &str, cmd: Command) -> Delivery;

    /// Record a new subscription for `id`, returning the queue its task
    /// writes to and the close signal it must watch
    fn open_subscription(&mut self, id: &str, channel: &str) -> Option<(mpsc::Sender<Command>, oneshot::Receiver<()>)>;

    fn is_registered(&self, id: &str) -> bool;
}

/// Registry of every live connection of one hub or broker
pub struct Connections {
    live: HashMap<ConnectionId, Connection>,
    /// Presence counting, when joins are counted
    presence: Option<PresenceCounter>,
}

impl Connections {
    pub fn new() -> Self {
        Self {
            live: HashMap::new(),
            presence: None,
        }
    }

    /// Count joins and removals in `presence:<channel>` counters
    pub fn with_presence(mut self, backend: Arc<dyn PubSubBackend>) -> Self {
        self.presence = Some(PresenceCounter::spawn(backend));
        self
    }

    pub fn register(&mut self, id: ConnectionId, outbound: mpsc::Sender<Command>) {
        self.register_watched(id, outbound, None);
    }

    /// Register a connection whose transport is told through `dropped`
    /// when the connection is removed
    pub fn register_watched(
        &mut self,
        id: ConnectionId,
        outbound: mpsc::Sender<Command>,
        dropped: Option<oneshot::Sender<()>>,
    ) {
        self.live.insert(
            id,
            Connection {
                outbound,
                subscriptions: Vec::new(),
                dropped,
            },
        );
    }

    /// Cancel every subscription of `id`, forget it, then close its queue.
    ///
    /// Returns the channels it had joined; unknown IDs are a no-op.
    pub fn unregister(&mut self, id: &str) -> Vec<String> {
        let Some(connection) = self.live.remove(id) else {
            return Vec::new();
        };

        let channels: Vec<String> = connection
            .subscriptions
            .into_iter()
            .map(Subscription::cancel)
            .collect();
        drop(connection.outbound);
        if let Some(dropped) = connection.dropped {
            let _ = dropped.send(());
        }

        if let Some(presence) = &self.presence {
            for channel in &channels {
                presence.left(channel);
            }
        }

        tracing::info!("[Realtime] Connection {} closed, {} subscriptions cancelled", id, channels.len());
        channels
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn ids(&self) -> Vec<ConnectionId> {
        self.live.keys().cloned().collect()
    }

    pub fn subscription_count(&self, id: &str) -> usize {
        self.live.get(id).map_or(0, |c| c.subscriptions.len())
    }
}

impl Default for Connections {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry for Connections {
    fn deliver(&mut self, id: &str, cmd: Command) -> Delivery {
        let Some(connection) = self.live.get(id) else {
            tracing::debug!("[Realtime] Dropping {} for unknown connection {}", cmd.kind, id);
            return Delivery::Dropped;
        };

        match connection.outbound.try_send(cmd) {
            Ok(()) => Delivery::Sent,
            Err(mpsc::error::TrySendError::Full(cmd)) => {
                tracing::warn!("[Realtime] Outbound queue of {} is full, dropping connection ({})", id, cmd.kind);
                self.unregister(id);
                Delivery::Dropped
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.unregister(id);
                Delivery::Dropped
            }
        }
    }

    fn open_subscription(&mut self, id: &str, channel: &str) -> Option<(mpsc::Sender<Command>, oneshot::Receiver<()>)> {
        let connection = self.live.get_mut(id)?;
        let (subscription, close) = Subscription::new(channel);
        connection.subscriptions.push(subscription);
        if let Some(presence) = &self.presence {
            presence.joined(channel);
        }
        Some((connection.outbound.clone(), close))
    }

    fn is_registered(&self, id: &str) -> bool {
        self.live.contains_key(id)
    }
}
