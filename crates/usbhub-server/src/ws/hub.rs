//! Hub orchestration.
//!
//! [`Hub`] owns the shared components; every socket drives one
//! [`HubConnection`] through `Connecting → Connected → Disconnected`.

use std::net::IpAddr;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use sqlx::SqlitePool;
use usbhub_common::config::EventsConfig;
use usbhub_protocol::HubCall;

use crate::db::{ClientIdentity, ClientStore, EventStore};
use crate::normalize::{self, DeviceReport};
use crate::ws::message_router::{MessageRouter, WsSender};
use crate::ws::registry::ConnectionRegistry;

/// Display name used when the client sends none.
pub const ANONYMOUS_NAME: &str = "anonymous";

/// Remote address used when the transport cannot tell.
pub const UNKNOWN_ADDRESS: &str = "unknown";

#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("Connection {connection_id} is {state:?}, expected {expected:?}")]
    InvalidState {
        connection_id: String,
        state: ConnectionState,
        expected: ConnectionState,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Failed to encode result: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Components shared by every connection.
#[derive(Debug)]
pub struct Hub {
    registry: ConnectionRegistry,
    router: MessageRouter,
    events: EventStore,
}

impl Hub {
    pub fn new(db: SqlitePool, events: &EventsConfig) -> Self {
        Self {
            registry: ConnectionRegistry::new(ClientStore::new(db.clone())),
            router: MessageRouter::new(),
            events: EventStore::new(db, events),
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn events(&self) -> &EventStore {
        &self.events
    }
}

/// What the transport knows about a client when the socket opens.
#[derive(Debug, Clone, Default)]
pub struct Handshake {
    pub username: Option<String>,
    pub remote_addr: Option<IpAddr>,
}

impl Handshake {
    fn resolve(&self, connection_id: &str) -> ClientIdentity {
        let name = self
            .username
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(ANONYMOUS_NAME);

        ClientIdentity {
            connection_id: connection_id.to_string(),
            name: name.to_string(),
            remote_address: self
                .remote_addr
                .map(|ip| ip.to_string())
                .unwrap_or_else(|| UNKNOWN_ADDRESS.to_string()),
            connected_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
}

/// One client's session with the hub.
#[derive(Debug)]
pub struct HubConnection {
    hub: Arc<Hub>,
    connection_id: String,
    state: ConnectionState,
}

impl HubConnection {
    pub fn new(hub: Arc<Hub>, connection_id: String) -> Self {
        Self {
            hub,
            connection_id,
            state: ConnectionState::Connecting,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    // ─── Lifecycle ───────────────────────────────────────────

    /// Register the client and make it addressable.
    ///
    /// A storage failure ends the connection.
    pub async fn connect(&mut self, handshake: &Handshake, outbound: WsSender) -> Result<(), HubError> {
        self.require_state(ConnectionState::Connecting)?;

        let identity = handshake.resolve(&self.connection_id);
        if let Err(e) = self.hub.registry.upsert(identity).await {
            self.state = ConnectionState::Disconnected;
            return Err(e.into());
        }

        self.hub.router.attach(&self.connection_id, outbound);
        self.state = ConnectionState::Connected;
        Ok(())
    }

    /// Tear the connection down. Safe to call more than once.
    pub async fn disconnect(&mut self, failure: Option<&str>) -> Result<(), HubError> {
        let was_connected = self.state == ConnectionState::Connected;
        self.state = ConnectionState::Disconnected;
        if !was_connected {
            return Ok(());
        }

        self.hub.router.detach(&self.connection_id);
        match failure {
            Some(reason) => {
                tracing::warn!(connection_id = %self.connection_id, %reason, "Client disconnected with error")
            }
            None => tracing::warn!(connection_id = %self.connection_id, "Client disconnected"),
        }
        self.hub.registry.remove(&self.connection_id).await?;
        Ok(())
    }

    // ─── Calls ───────────────────────────────────────────────

    /// Run one hub method. Returns the value for the completion frame.
    pub async fn invoke(&self, call: HubCall) -> Result<Option<Value>, HubError> {
        self.require_state(ConnectionState::Connected)?;

        match call {
            HubCall::SendMessageToClient {
                target_connection_id,
                user,
                message,
            } => {
                tracing::info!(
                    from = %user,
                    to = %target_connection_id,
                    %message,
                    "Direct message"
                );
                self.hub.router.route(&target_connection_id, &user, &message);
                Ok(None)
            }
            HubCall::GetConnectedClients => {
                let clients = self.hub.registry.list().await?;
                Ok(Some(serde_json::to_value(clients)?))
            }
            HubCall::ReportUsbDevices(devices) => {
                self.report(DeviceReport::Structured(devices), "ReportUsbDevices")
                    .await
            }
            HubCall::SendDeviceList(payload) => {
                self.report(DeviceReport::Enveloped(payload), "SendDeviceList")
                    .await
            }
        }
    }

    async fn report(&self, report: DeviceReport, via: &str) -> Result<Option<Value>, HubError> {
        let detected_at = Utc::now();

        let events = match normalize::normalize(&self.connection_id, report, detected_at) {
            Ok(events) => events,
            Err(e) => {
                tracing::error!(
                    connection_id = %self.connection_id,
                    error = %e,
                    "Dropped unreadable device report from {}",
                    via
                );
                return Ok(None);
            }
        };

        if events.is_empty() {
            tracing::info!(
                connection_id = %self.connection_id,
                "Device report from {} had no entries; nothing saved",
                via
            );
            return Ok(None);
        }

        let ids = self.hub.events.append_batch(&events).await.map_err(|e| {
            tracing::error!(connection_id = %self.connection_id, "Failed to save device report: {}", e);
            e
        })?;
        tracing::info!(
            connection_id = %self.connection_id,
            count = ids.len(),
            "Saved USB devices reported via {}",
            via
        );
        Ok(None)
    }

    fn require_state(&self, expected: ConnectionState) -> Result<(), HubError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(HubError::InvalidState {
                connection_id: self.connection_id.clone(),
                state: self.state,
                expected,
            })
        }
    }
}
