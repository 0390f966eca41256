//! Connected-client table.
//!
//! One row per live connection id. Rows are replaced on reconnect with the
//! same id and deleted on disconnect.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

/// Stored identity of a connection, as returned by the presence query.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedClient {
    pub id: i64,
    pub connection_id: String,
    pub name: String,
    pub remote_address: String,
    pub connected_at: DateTime<Utc>,
}

/// Identity resolved at connect time, before it is stored.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientIdentity {
    pub connection_id: String,
    pub name: String,
    pub remote_address: String,
    pub connected_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ClientStore {
    db: SqlitePool,
}

impl ClientStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Insert the row, replacing any previous row with the same connection id.
    pub async fn upsert(&self, client: &ClientIdentity) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"INSERT OR REPLACE INTO connected_clients (connection_id, name, remote_address, connected_at)
               VALUES (?1, ?2, ?3, ?4)"#,
        )
        .bind(&client.connection_id)
        .bind(&client.name)
        .bind(&client.remote_address)
        .bind(client.connected_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Delete the row for `connection_id`. Returns whether a row existed.
    pub async fn remove(&self, connection_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM connected_clients WHERE connection_id = ?1")
            .bind(connection_id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// All rows, oldest connection first.
    pub async fn list(&self) -> Result<Vec<ConnectedClient>, sqlx::Error> {
        sqlx::query_as(
            r#"SELECT id, connection_id, name, remote_address, connected_at
               FROM connected_clients
               ORDER BY connected_at ASC, id ASC"#,
        )
        .fetch_all(&self.db)
        .await
    }

    /// Delete every row. Returns the number removed.
    pub async fn clear(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM connected_clients")
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected())
    }
}
