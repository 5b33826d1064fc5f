use anyhow::{Context, Result};
use axum::{http::Method, Router};
use std::future::Future;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::routes;
use super::websocket::SubscriberRegistry;
use crate::config::ServerConfig;
use crate::devices::{DeviceStore, SharedStore};

/// State shared across handlers.
///
/// Lock order: the store lock is always taken before the subscriber lock.
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub subscribers: SubscriberRegistry,
    pub heartbeat: Duration,
}

impl AppState {
    pub fn new(store: DeviceStore, heartbeat: Duration) -> Self {
        Self {
            store: store.into_shared(),
            subscribers: SubscriberRegistry::new(),
            heartbeat,
        }
    }
}

/// Device registry server instance
pub struct DeviceServer {
    config: ServerConfig,
    state: AppState,
}

impl DeviceServer {
    /// Create a server backed by the seeded store
    pub fn new(config: ServerConfig) -> Self {
        let state = AppState::new(DeviceStore::seeded(), config.heartbeat_interval());
        Self { config, state }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Bind the configured address and serve until Ctrl-C
    pub async fn run(self) -> Result<()> {
        let addr = self.config.socket_addr()?;
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind to {}", addr))?;

        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local_addr = listener.local_addr().context("Failed to read local address")?;
        let devices = self.state.store.read().await.len();
        tracing::info!("Device registry listening on http://{}", local_addr);
        tracing::info!(
            devices,
            heartbeat_secs = self.config.heartbeat_secs,
            "Registry ready"
        );

        let app = create_router(self.state);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .context("Server error")?;

        tracing::info!("Device registry stopped");
        Ok(())
    }
}

/// Create the Axum router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::api_routes())
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods([
                        Method::GET,
                        Method::POST,
                        Method::PUT,
                        Method::PATCH,
                        Method::DELETE,
                    ])
                    .allow_headers(Any),
            ),
        )
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        },
    }
}
