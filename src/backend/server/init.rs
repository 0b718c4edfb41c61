/**
 * Server Initialization
 *
 * This module handles the initialization and setup of the Axum HTTP
 * server: backend selection, coordinator startup and route configuration.
 *
 * # Initialization Process
 *
 * 1. Select the pub/sub backend (Redis, or in-process as a fallback)
 * 2. Start the hub, the broker and the trigger runner
 * 3. Create and configure the router
 */

use std::sync::Arc;

use axum::Router;

use crate::backend::pubsub::PubSubBackend;
use crate::backend::routes::router::create_router;
use crate::backend::server::config::load_backend;
use crate::backend::server::state::AppState;
use crate::backend::triggers::TriggerRegistry;
use crate::shared::ServerConfig;

/// Create and configure the Axum application
pub async fn create_app(config: ServerConfig) -> Router<()> {
    create_app_with_triggers(config, TriggerRegistry::new()).await
}

/// Create the application with server-side trigger handlers
pub async fn create_app_with_triggers(config: ServerConfig, triggers: TriggerRegistry) -> Router<()> {
    tracing::info!("Initializing realtime server");

    let backend = load_backend(&config).await;
    let app = create_app_with_backend(config, backend, triggers);

    tracing::info!("Router configured");
    app
}

/// Create the application over an already selected backend
pub fn create_app_with_backend(
    config: ServerConfig,
    backend: Arc<dyn PubSubBackend>,
    triggers: TriggerRegistry,
) -> Router<()> {
    let app_state = AppState::new(config, backend, triggers);
    create_router(app_state)
}
