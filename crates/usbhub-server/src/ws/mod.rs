//! WebSocket hub for connected clients: presence, directed messages and
//! USB device reports.

mod handler;
pub mod hub;
pub mod message_router;
pub mod registry;

use crate::AppState;
use axum::Router;
use std::sync::Arc;
use usbhub_protocol::HUB_PATH;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(HUB_PATH, axum::routing::get(handler::hub_ws_handler))
        .with_state(state)
}
