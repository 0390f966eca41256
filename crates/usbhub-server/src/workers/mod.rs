//! Background workers: periodic tasks running alongside the server.

pub mod event_pruner;

use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::AppState;

/// Start all background worker tasks. Returns handles that can be
/// used to abort them on shutdown.
pub fn start_all_workers(state: Arc<AppState>) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::new();

    if state.config.events.retention_days > 0 {
        handles.push(event_pruner::start(state));
    } else {
        tracing::info!("Event retention disabled; USB events are kept indefinitely");
    }

    handles
}
