//! WebSocket handler for hub clients.
//!
//! Decodes JSON frames, dispatches invocations through the client's
//! `HubConnection`, and replies with completion frames.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, Query, State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use usbhub_protocol::{Frame, HubCall, MAX_MESSAGE_SIZE};

use crate::ws::hub::{Handshake, Hub, HubConnection};
use crate::ws::message_router::WsSender;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct HubQuery {
    username: Option<String>,
}

/// Hub WebSocket upgrade.
pub async fn hub_ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(query): Query<HubQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let handshake = Handshake {
        username: query.username,
        remote_addr: Some(addr.ip()),
    };
    let hub = state.hub.clone();
    ws.max_message_size(MAX_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_hub_socket(socket, hub, handshake))
}

async fn handle_hub_socket(socket: WebSocket, hub: Arc<Hub>, handshake: Handshake) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Create an mpsc channel so the router can push from other tasks
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    // Forward channel → WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let connection_id = Uuid::new_v4().simple().to_string();
    let mut conn = HubConnection::new(hub, connection_id.clone());

    if let Err(e) = conn.connect(&handshake, tx.clone()).await {
        tracing::error!(%connection_id, "Failed to register client: {}", e);
        send_frame(
            &tx,
            &Frame::Close {
                error: Some(e.to_string()),
            },
        );
        let _ = tx.send(Message::Close(None));
        drop(tx);
        let _ = send_task.await;
        return;
    }

    send_frame(
        &tx,
        &Frame::Handshake {
            connection_id: connection_id.clone(),
        },
    );

    let mut failure: Option<String> = None;

    // Receive loop
    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match Frame::decode(text.as_str()) {
                Ok(Frame::Invocation {
                    invocation_id,
                    target,
                    arguments,
                }) => {
                    let outcome = match HubCall::decode(&target, arguments) {
                        Ok(call) => conn.invoke(call).await.map_err(|e| e.to_string()),
                        Err(e) => {
                            tracing::warn!(%connection_id, %target, "Rejected hub call: {}", e);
                            Err(e.to_string())
                        }
                    };
                    if let Some(invocation_id) = invocation_id {
                        send_frame(&tx, &Frame::completion(invocation_id, outcome));
                    }
                }
                Ok(Frame::Ping) => send_frame(&tx, &Frame::Ping),
                Ok(Frame::Close { error }) => {
                    failure = error;
                    break;
                }
                Ok(_) => {
                    tracing::debug!(%connection_id, "Ignoring unexpected client frame");
                }
                Err(e) => {
                    tracing::warn!(%connection_id, "Failed to decode client frame: {}", e);
                }
            },
            Ok(Message::Binary(_)) => {
                tracing::warn!(%connection_id, "Binary frames are not supported");
            }
            Ok(Message::Ping(data)) => {
                let _ = tx.send(Message::Pong(data));
            }
            Ok(Message::Close(_)) => {
                tracing::info!(%connection_id, "Hub WebSocket closed");
                break;
            }
            Err(e) => {
                tracing::error!(%connection_id, "Hub WebSocket error: {}", e);
                failure = Some(e.to_string());
                break;
            }
            _ => {}
        }
    }

    // ── Cleanup ──────────────────────────────────────────────
    send_task.abort();
    if let Err(e) = conn.disconnect(failure.as_deref()).await {
        tracing::error!(%connection_id, "Failed to unregister client: {}", e);
    }
}

fn send_frame(tx: &WsSender, frame: &Frame) {
    match frame.encode() {
        Ok(text) => {
            let _ = tx.send(Message::Text(text.into()));
        }
        Err(e) => tracing::error!("Failed to encode frame: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::{json, Value};
    use tokio::net::{TcpListener, TcpStream};
    use tokio_tungstenite::tungstenite::Message as WsMessage;
    use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
    use usbhub_protocol::UsbDeviceInfo;

    use super::*;

    type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

    async fn start_server() -> (SocketAddr, Arc<AppState>) {
        let state = crate::test_state().await;
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = crate::app(state.clone());
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });
        (addr, state)
    }

    async fn recv_frame(client: &mut Client) -> Frame {
        loop {
            let msg = tokio::time::timeout(Duration::from_secs(5), client.next())
                .await
                .expect("timed out waiting for a frame")
                .expect("socket closed")
                .unwrap();
            if let WsMessage::Text(text) = msg {
                return Frame::decode(&text).unwrap();
            }
        }
    }

    async fn send(client: &mut Client, frame: &Frame) {
        client
            .send(WsMessage::Text(frame.encode().unwrap()))
            .await
            .unwrap();
    }

    /// Connect and return the client with its server-assigned connection id.
    async fn open(addr: SocketAddr, username: &str) -> (Client, String) {
        let url = format!("ws://{addr}/chathub?username={username}");
        let (mut client, _) = connect_async(url.as_str()).await.unwrap();
        match recv_frame(&mut client).await {
            Frame::Handshake { connection_id } => (client, connection_id),
            other => panic!("expected handshake, got {other:?}"),
        }
    }

    async fn call(client: &mut Client, id: &str, call: HubCall) -> Result<Option<Value>, String> {
        send(client, &call.into_frame(Some(id.to_string())).unwrap()).await;
        loop {
            if let Frame::Completion {
                invocation_id,
                result,
                error,
            } = recv_frame(client).await
            {
                assert_eq!(invocation_id, id);
                return match error {
                    Some(e) => Err(e),
                    None => Ok(result),
                };
            }
        }
    }

    async fn wait_for_presence(state: &AppState, expected: usize) {
        for _ in 0..250 {
            if state.hub.registry().list().await.unwrap().len() == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("presence never reached {expected} rows");
    }

    #[tokio::test]
    async fn test_socket_end_to_end() {
        let (addr, state) = start_server().await;
        let (mut client, connection_id) = open(addr, "agent1").await;

        let presence = call(&mut client, "1", HubCall::GetConnectedClients)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(presence.as_array().unwrap().len(), 1);
        assert_eq!(presence[0]["name"], "agent1");
        assert_eq!(presence[0]["connectionId"], connection_id.as_str());
        assert_eq!(presence[0]["remoteAddress"], "127.0.0.1");

        let report = HubCall::ReportUsbDevices(vec![Some(UsbDeviceInfo {
            device_index: 0,
            vendor_id: 0x046D,
            product_id: 0xC52B,
            serial_number: Some(" SN1 ".into()),
            is_blocked: false,
            ..Default::default()
        })]);
        assert_eq!(call(&mut client, "2", report).await, Ok(None));

        let events = state.hub.events().recent(None).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].serial_number, "SN1");
        assert_eq!(events[0].connection_id, connection_id);

        let envelope = json!({
            "type": "usb",
            "data": [{"deviceIndex": 1, "vendorId": 1234, "productId": 5678,
                      "friendlyName": "Mouse", "isWhitelisted": false}]
        });
        let list = HubCall::SendDeviceList(envelope.to_string());
        assert_eq!(call(&mut client, "3", list).await, Ok(None));

        let events = state.hub.events().recent(None).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].product_string, "Mouse");
        assert!(events[0].is_blocked);
        assert_eq!(events[0].serial_number, "");

        client.close(None).await.unwrap();
        wait_for_presence(&state, 0).await;
        assert_eq!(state.hub.registry().online_count(), 0);
    }

    #[tokio::test]
    async fn test_directed_message_between_sockets() {
        let (addr, state) = start_server().await;
        let (mut alice, _) = open(addr, "alice").await;
        let (mut bob, bob_id) = open(addr, "bob").await;

        let direct = HubCall::SendMessageToClient {
            target_connection_id: bob_id,
            user: "alice".into(),
            message: "hello bob".into(),
        };
        assert_eq!(call(&mut alice, "1", direct).await, Ok(None));
        assert_eq!(
            recv_frame(&mut bob).await,
            Frame::receive_message("alice", "hello bob")
        );

        let nowhere = HubCall::SendMessageToClient {
            target_connection_id: "does-not-exist".into(),
            user: "alice".into(),
            message: "anyone?".into(),
        };
        assert_eq!(call(&mut alice, "2", nowhere).await, Ok(None));

        bob.close(None).await.unwrap();
        wait_for_presence(&state, 1).await;
    }

    #[tokio::test]
    async fn test_bad_calls_keep_connection_open() {
        let (addr, state) = start_server().await;
        let (mut client, _) = open(addr, "agent").await;

        send(&mut client, &Frame::invocation(Some("1".into()), "Broadcast", vec![])).await;
        match recv_frame(&mut client).await {
            Frame::Completion { error, .. } => {
                assert!(error.unwrap().contains("Unknown hub method"))
            }
            other => panic!("expected completion, got {other:?}"),
        }

        client
            .send(WsMessage::Text("not a frame".into()))
            .await
            .unwrap();
        send(&mut client, &Frame::Ping).await;
        assert_eq!(recv_frame(&mut client).await, Frame::Ping);

        let malformed = HubCall::SendDeviceList("{oops".into());
        assert_eq!(call(&mut client, "2", malformed).await, Ok(None));
        assert_eq!(state.hub.events().count().await.unwrap(), 0);

        let presence = call(&mut client, "3", HubCall::GetConnectedClients)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(presence.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_close_frame_disconnects() {
        let (addr, state) = start_server().await;
        let (mut client, _) = open(addr, "agent").await;
        wait_for_presence(&state, 1).await;

        send(
            &mut client,
            &Frame::Close {
                error: Some("shutting down".into()),
            },
        )
        .await;
        wait_for_presence(&state, 0).await;
    }
}
