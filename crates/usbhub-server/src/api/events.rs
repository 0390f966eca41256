//! USB event log API: recent events, single lookup, delete.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::db::UsbEvent;
use crate::AppState;
use usbhub_common::{AppError, AppResult};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(list_events))
        .route("/{id}", get(get_event).delete(delete_event))
        .with_state(state)
}

// ─── Types ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct EventsQuery {
    /// Clamped by the store; missing or non-positive means the default page.
    limit: Option<i64>,
}

// ─── Handlers ────────────────────────────────────────────────

async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(q): Query<EventsQuery>,
) -> AppResult<Json<Vec<UsbEvent>>> {
    let events = state.hub.events().recent(q.limit).await?;
    Ok(Json(events))
}

async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> AppResult<Json<UsbEvent>> {
    state
        .hub
        .events()
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("USB event {id}")))
}

async fn delete_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let removed = state.hub.events().delete_by_id(id).await?;
    tracing::info!(id, removed, "USB event delete requested");
    Ok(StatusCode::NO_CONTENT)
}
