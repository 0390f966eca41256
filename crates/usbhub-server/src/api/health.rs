//! Health check endpoint.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::AppState;
use usbhub_common::AppResult;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .with_state(state)
}

async fn health_check(State(state): State<Arc<AppState>>) -> AppResult<Json<Value>> {
    let stored_events = state.hub.events().count().await?;

    Ok(Json(json!({
        "status": "healthy",
        "service": "usbhub-server",
        "version": env!("CARGO_PKG_VERSION"),
        "onlineClients": state.hub.registry().online_count(),
        "storedEvents": stored_events,
    })))
}
