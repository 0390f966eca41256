//! # USB Hub Server
//!
//! WebSocket hub that tracks connected clients, routes directed messages
//! between them and logs their USB device reports, plus a small admin API
//! over the event log.

mod api;
mod db;
mod normalize;
mod workers;
mod ws;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

/// Shared application state available to all handlers.
pub struct AppState {
    pub config: usbhub_common::AppConfig,
    pub hub: Arc<ws::hub::Hub>,
}

/// In-memory state for handler tests.
#[cfg(test)]
pub async fn test_state() -> Arc<AppState> {
    let config = usbhub_common::AppConfig::default();
    let hub = ws::hub::Hub::new(db::test_pool().await, &config.events);
    Arc::new(AppState {
        config,
        hub: Arc::new(hub),
    })
}

/// Hub endpoint plus the admin API.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", api::router(state.clone()))
        .merge(ws::router(state))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting USB hub server...");

    let config = usbhub_common::AppConfig::load()?;

    let db = db::connect(&config.database).await?;
    db::migrate(&db).await?;
    tracing::info!(url = %config.database.url, "Database ready, migrations applied");

    let hub = Arc::new(ws::hub::Hub::new(db, &config.events));

    // Nobody is connected to a process that just started
    let stale = hub.registry().clear_stale().await?;
    if stale > 0 {
        tracing::info!(count = stale, "Removed client rows left by a previous run");
    }

    let state = Arc::new(AppState {
        config: config.clone(),
        hub,
    });

    // Start background workers
    let _worker_handles = workers::start_all_workers(state.clone());

    let listener =
        tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(
        listener,
        app(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install CTRL+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
