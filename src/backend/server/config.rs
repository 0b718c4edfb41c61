/**
 * Backend Selection
 *
 * Picks the pub/sub backend from the server configuration.
 *
 * # Error Handling
 *
 * A Redis server that cannot be reached is logged and does not prevent
 * startup: the server falls back to the in-process backend and keeps
 * serving on a single node.
 */

use std::sync::Arc;
use std::time::Duration;

use crate::backend::pubsub::{MemoryPubSub, PubSubBackend, RedisPubSub};
use crate::shared::ServerConfig;

/// How often the in-process backend drops idle channels and expired keys
pub const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(300);

/// Connect to Redis when `REDIS_URL` is configured
///
/// Returns `None` if no URL is set or the connection fails.
pub async fn load_redis(config: &ServerConfig) -> Option<RedisPubSub> {
    let Some(url) = config.redis_url.as_deref() else {
        tracing::warn!("[Server] REDIS_URL not set. Running with the in-process pub/sub backend.");
        return None;
    };

    tracing::info!("[Server] Connecting to Redis...");
    match RedisPubSub::connect(url, config.send_timeout).await {
        Ok(backend) => Some(backend),
        Err(e) => {
            tracing::error!("[Server] Failed to connect to Redis: {}", e);
            tracing::warn!("[Server] Falling back to the in-process pub/sub backend.");
            None
        }
    }
}

/// Select the backend, starting housekeeping for the in-process one
pub async fn load_backend(config: &ServerConfig) -> Arc<dyn PubSubBackend> {
    if let Some(redis) = load_redis(config).await {
        return Arc::new(redis);
    }

    let memory = Arc::new(MemoryPubSub::new(config.send_timeout));
    spawn_maintenance(Arc::clone(&memory), MAINTENANCE_INTERVAL);
    memory
}

/// Periodically prune the in-process backend for as long as it is in use
pub fn spawn_maintenance(memory: Arc<MemoryPubSub>, every: Duration) {
    let weak = Arc::downgrade(&memory);
    drop(memory);

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.tick().await;
        loop {
            interval.tick().await;
            let Some(memory) = weak.upgrade() else {
                break;
            };
            let channels = memory.prune_idle_channels();
            let keys = memory.purge_expired();
            tracing::debug!("[Server] Pruned {} idle channels and {} expired keys", channels, keys);
        }
    });
}
