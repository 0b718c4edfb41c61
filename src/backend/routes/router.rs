/**
 * Router Configuration
 *
 * This module provides the main router creation function that combines
 * all route configurations into a single Axum router.
 *
 * # Routes
 *
 * 1. Realtime routes (WebSocket, SSE)
 * 2. Health check
 * 3. Fallback handler (404)
 */

use axum::{routing::get, Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::backend::routes::realtime_routes::configure_realtime_routes;
use crate::backend::server::state::AppState;

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState) -> Router<()> {
    let router = Router::new().route("/health", get(health));

    let router = configure_realtime_routes(router);

    let router = router.fallback(|| async { (axum::http::StatusCode::NOT_FOUND, "404 Not Found") });

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

/// Liveness probe (GET /health)
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
