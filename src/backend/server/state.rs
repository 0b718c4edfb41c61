/**
 * Application State Management
 *
 * This module defines the application state structure and implements
 * the necessary `FromRef` traits for Axum state extraction.
 *
 * # Architecture
 *
 * The `AppState` struct holds:
 * - The server configuration
 * - The pub/sub backend shared by every component
 * - The auth cache
 * - Handles to the hub and broker coordinators
 * - The trigger runner, when handlers are registered
 *
 * Every field is a cheap handle, so cloning the state per request is free.
 */

use std::sync::Arc;

use axum::extract::FromRef;

use crate::backend::auth::{AuthCache, TokenVerifier};
use crate::backend::pubsub::PubSubBackend;
use crate::backend::realtime::router::RouterContext;
use crate::backend::realtime::{Broker, Hub};
use crate::backend::triggers::{TriggerHandle, TriggerRegistry, TriggerRunner};
use crate::shared::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,

    /// Distributed or in-process pub/sub backend
    pub backend: Arc<dyn PubSubBackend>,

    pub auth: AuthCache,

    /// Coordinator of WebSocket connections
    pub hub: Hub,

    /// Coordinator of SSE connections
    pub broker: Broker,

    /// Dropped together with the last state clone, which stops the runner
    pub triggers: Option<Arc<TriggerHandle>>,
}

impl AppState {
    /// Start the hub, the broker and (if any handler is registered) the
    /// trigger runner over `backend`
    pub fn new(config: ServerConfig, backend: Arc<dyn PubSubBackend>, triggers: TriggerRegistry) -> Self {
        let auth = AuthCache::new(
            Arc::clone(&backend),
            TokenVerifier::new(&config.jwt_secret),
            config.auth_cache_ttl,
        );
        let ctx = RouterContext {
            backend: Arc::clone(&backend),
            auth: auth.clone(),
            join_announce_delay: config.join_announce_delay,
        };

        let hub = Hub::spawn(ctx.clone(), config.outbound_capacity);
        let broker = Broker::spawn(ctx, config.outbound_capacity);

        let triggers = if triggers.is_empty() {
            None
        } else {
            let runner = TriggerRunner::new(Arc::clone(&backend), Arc::new(triggers));
            Some(Arc::new(runner.spawn()))
        };

        Self {
            config: Arc::new(config),
            backend,
            auth,
            hub,
            broker,
            triggers,
        }
    }
}

impl FromRef<AppState> for Hub {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.hub.clone()
    }
}

impl FromRef<AppState> for Broker {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.broker.clone()
    }
}

impl FromRef<AppState> for AuthCache {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.auth.clone()
    }
}

impl FromRef<AppState> for Arc<ServerConfig> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for Arc<dyn PubSubBackend> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.backend.clone()
    }
}
