use axum::{
    routing::{get, patch, put},
    Router,
};

use super::handlers;
use super::server::AppState;
use super::websocket;

/// Create API router with all endpoints
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Device registry routes
        .route(
            "/devices",
            get(handlers::list_devices).post(handlers::create_device),
        )
        .route(
            "/devices/:id",
            patch(handlers::update_status).delete(handlers::delete_device),
        )
        .route("/devices/:id/name", put(handlers::rename_device))
        // Real-time channel
        .route("/ws", get(websocket::handle_device_websocket))
        .route("/health", get(handlers::health))
}
