//! Admin API routes.

mod clients;
mod events;
mod health;

use crate::AppState;
use axum::Router;
use std::sync::Arc;

/// Build the API router with all sub-routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/events", events::router(state.clone()))
        .nest("/clients", clients::router(state.clone()))
        .merge(health::router(state))
}
