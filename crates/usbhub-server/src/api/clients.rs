//! Presence API: the same snapshot hub clients get from `GetConnectedClients`.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};

use crate::db::ConnectedClient;
use crate::AppState;
use usbhub_common::AppResult;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(list_clients))
        .with_state(state)
}

async fn list_clients(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<ConnectedClient>>> {
    Ok(Json(state.hub.registry().list().await?))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    use crate::ws::hub::{Handshake, HubConnection};

    #[tokio::test]
    async fn test_list_clients_and_health() {
        let state = crate::test_state().await;
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut conn = HubConnection::new(state.hub.clone(), "c1".into());
        let handshake = Handshake {
            username: Some("agent1".into()),
            remote_addr: None,
        };
        conn.connect(&handshake, tx).await.unwrap();

        let response = crate::app(state.clone())
            .oneshot(Request::get("/api/clients").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let rows: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(rows[0]["name"], "agent1");
        assert_eq!(rows[0]["remoteAddress"], "unknown");

        let response = crate::app(state)
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let health: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(health["status"], "healthy");
        assert_eq!(health["onlineClients"], 1);
        assert_eq!(health["storedEvents"], 0);
    }
}
