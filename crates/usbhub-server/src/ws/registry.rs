//! Registry of connected clients.
//!
//! The `connected_clients` table is the source of truth for presence queries.
//! A `DashMap` mirrors the identities held by **this** process so liveness
//! checks don't touch the database.

use dashmap::DashMap;

use crate::db::{ClientIdentity, ClientStore, ConnectedClient};

#[derive(Debug)]
pub struct ConnectionRegistry {
    store: ClientStore,
    /// connection_id → identity resolved at connect time
    live: DashMap<String, ClientIdentity>,
}

impl ConnectionRegistry {
    pub fn new(store: ClientStore) -> Self {
        Self {
            store,
            live: DashMap::new(),
        }
    }

    // ─── Lifecycle ───────────────────────────────────────────

    /// Store the identity, replacing any row with the same connection id.
    pub async fn upsert(&self, client: ClientIdentity) -> Result<(), sqlx::Error> {
        self.store.upsert(&client).await?;
        tracing::info!(
            connection_id = %client.connection_id,
            name = %client.name,
            remote_address = %client.remote_address,
            "Client registered"
        );
        self.live.insert(client.connection_id.clone(), client);
        Ok(())
    }

    /// Forget a connection. Missing ids are not an error.
    pub async fn remove(&self, connection_id: &str) -> Result<(), sqlx::Error> {
        self.live.remove(connection_id);
        if self.store.remove(connection_id).await? {
            tracing::info!(%connection_id, "Client unregistered");
        }
        Ok(())
    }

    /// Drop rows left behind by a previous process. Called once on startup.
    pub async fn clear_stale(&self) -> Result<u64, sqlx::Error> {
        self.store.clear().await
    }

    // ─── Queries ─────────────────────────────────────────────

    /// Presence snapshot, oldest connection first.
    pub async fn list(&self) -> Result<Vec<ConnectedClient>, sqlx::Error> {
        self.store.list().await
    }

    pub fn is_connected(&self, connection_id: &str) -> bool {
        self.live.contains_key(connection_id)
    }

    pub fn online_count(&self) -> usize {
        self.live.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use chrono::Utc;

    fn identity(connection_id: &str) -> ClientIdentity {
        ClientIdentity {
            connection_id: connection_id.into(),
            name: "agent".into(),
            remote_address: "unknown".into(),
            connected_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_mirror_tracks_store() {
        let registry = ConnectionRegistry::new(ClientStore::new(test_pool().await));

        registry.upsert(identity("a")).await.unwrap();
        registry.upsert(identity("b")).await.unwrap();
        assert!(registry.is_connected("a"));
        assert_eq!(registry.online_count(), 2);
        assert_eq!(registry.list().await.unwrap().len(), 2);

        registry.remove("a").await.unwrap();
        assert!(!registry.is_connected("a"));
        assert_eq!(registry.online_count(), 1);

        let rows = registry.list().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].connection_id, "b");
    }

    #[tokio::test]
    async fn test_remove_unknown_is_ok() {
        let registry = ConnectionRegistry::new(ClientStore::new(test_pool().await));
        registry.remove("ghost").await.unwrap();
        assert_eq!(registry.online_count(), 0);
    }

    #[tokio::test]
    async fn test_clear_stale_only_touches_store() {
        let db = test_pool().await;
        let previous = ClientStore::new(db.clone());
        previous.upsert(&identity("left-over")).await.unwrap();

        let registry = ConnectionRegistry::new(ClientStore::new(db));
        assert_eq!(registry.clear_stale().await.unwrap(), 1);
        assert!(registry.list().await.unwrap().is_empty());
    }
}
