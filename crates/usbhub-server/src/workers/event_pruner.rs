//! Event pruner: deletes USB events past the retention window.
//!
//! Runs once daily, only when `events.retention_days` is non-zero.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::task::JoinHandle;

use crate::db::EventStore;
use crate::AppState;

/// Run once per day (86400 seconds).
const PRUNE_INTERVAL_SECS: u64 = 86400;

pub fn start(state: Arc<AppState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let retention_days = state.config.events.retention_days;
        let mut interval =
            tokio::time::interval(tokio::time::Duration::from_secs(PRUNE_INTERVAL_SECS));

        tracing::info!(
            "Event pruner started (every {}h, retention {}d)",
            PRUNE_INTERVAL_SECS / 3600,
            retention_days
        );

        loop {
            interval.tick().await;

            match prune_once(state.hub.events(), retention_days).await {
                Ok(count) if count > 0 => {
                    tracing::info!(count, "Event pruner: deleted old events");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!("Event pruner query failed: {}", e);
                }
            }
        }
    })
}

/// Delete events detected more than `retention_days` ago.
pub async fn prune_once(events: &EventStore, retention_days: u32) -> Result<u64, sqlx::Error> {
    let cutoff = Utc::now() - Duration::days(i64::from(retention_days));
    events.prune_older_than(cutoff).await
}
