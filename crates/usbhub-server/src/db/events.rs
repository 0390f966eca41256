//! Append-only USB event log.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use usbhub_common::config::EventsConfig;

/// A stored device observation.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UsbEvent {
    pub id: i64,
    pub connection_id: String,
    pub device_index: u32,
    pub vendor_id: u16,
    pub product_id: u16,
    pub serial_number: String,
    pub product_string: String,
    pub manufacturer_string: String,
    pub is_blocked: bool,
    pub detected_at: DateTime<Utc>,
}

/// A normalized observation that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUsbEvent {
    pub connection_id: String,
    pub device_index: u32,
    pub vendor_id: u16,
    pub product_id: u16,
    pub serial_number: String,
    pub product_string: String,
    pub manufacturer_string: String,
    pub is_blocked: bool,
    pub detected_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct EventStore {
    db: SqlitePool,
    default_limit: i64,
    max_limit: i64,
}

impl EventStore {
    pub fn new(db: SqlitePool, config: &EventsConfig) -> Self {
        Self {
            db,
            default_limit: config.default_limit.max(1),
            max_limit: config.max_limit.max(1),
        }
    }

    /// Insert a batch in one transaction. Nothing is stored if any row fails.
    /// Returns the assigned ids in insertion order.
    pub async fn append_batch(&self, events: &[NewUsbEvent]) -> Result<Vec<i64>, sqlx::Error> {
        if events.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.db.begin().await?;
        let mut ids = Vec::with_capacity(events.len());

        for event in events {
            let result = sqlx::query(
                r#"INSERT INTO usb_events (
                       connection_id, device_index, vendor_id, product_id,
                       serial_number, product_string, manufacturer_string,
                       is_blocked, detected_at
                   ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"#,
            )
            .bind(&event.connection_id)
            .bind(event.device_index)
            .bind(event.vendor_id)
            .bind(event.product_id)
            .bind(&event.serial_number)
            .bind(&event.product_string)
            .bind(&event.manufacturer_string)
            .bind(event.is_blocked)
            .bind(event.detected_at)
            .execute(&mut *tx)
            .await?;

            ids.push(result.last_insert_rowid());
        }

        tx.commit().await?;
        Ok(ids)
    }

    /// Effective row count for a `recent` request.
    pub fn clamp_limit(&self, limit: Option<i64>) -> i64 {
        match limit {
            Some(n) if n > 0 => n.min(self.max_limit),
            _ => self.default_limit.min(self.max_limit),
        }
    }

    /// Most recently inserted events, newest first.
    pub async fn recent(&self, limit: Option<i64>) -> Result<Vec<UsbEvent>, sqlx::Error> {
        sqlx::query_as(
            r#"SELECT id, connection_id, device_index, vendor_id, product_id,
                      serial_number, product_string, manufacturer_string,
                      is_blocked, detected_at
               FROM usb_events
               ORDER BY id DESC
               LIMIT ?1"#,
        )
        .bind(self.clamp_limit(limit))
        .fetch_all(&self.db)
        .await
    }

    pub async fn get(&self, id: i64) -> Result<Option<UsbEvent>, sqlx::Error> {
        sqlx::query_as(
            r#"SELECT id, connection_id, device_index, vendor_id, product_id,
                      serial_number, product_string, manufacturer_string,
                      is_blocked, detected_at
               FROM usb_events
               WHERE id = ?1"#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
    }

    /// Delete one event. Returns whether it existed.
    pub async fn delete_by_id(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM usb_events WHERE id = ?1")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete events detected before `cutoff`. Returns the number removed.
    pub async fn prune_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM usb_events WHERE detected_at < ?1")
            .bind(cutoff)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM usb_events")
            .fetch_one(&self.db)
            .await?;

        Ok(count)
    }
}
