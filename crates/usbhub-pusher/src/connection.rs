//! One-shot hub session: handshake, single invocation, close.

use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use url::Url;

use usbhub_protocol::{Frame, HubCall};

const INVOCATION_ID: &str = "1";

/// Connect, submit `call` and wait for its completion.
pub async fn push(url: &Url, call: HubCall, timeout: Duration) -> anyhow::Result<()> {
    tokio::time::timeout(timeout, run(url, call))
        .await
        .map_err(|_| anyhow!("Hub did not answer within {}s", timeout.as_secs()))?
}

async fn run(url: &Url, call: HubCall) -> anyhow::Result<()> {
    let (ws_stream, _) = connect_async(url.as_str())
        .await
        .context("WebSocket connection failed")?;
    let (mut ws_write, mut ws_read) = ws_stream.split();

    let target = call.target();
    let mut invoked = false;

    while let Some(msg) = ws_read.next().await {
        let text = match msg? {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        match Frame::decode(&text)? {
            Frame::Handshake { connection_id } if !invoked => {
                tracing::info!(%connection_id, "Connected. Sending {}...", target);
                let frame = call.clone().into_frame(Some(INVOCATION_ID.to_string()))?;
                ws_write.send(Message::Text(frame.encode()?)).await?;
                invoked = true;
            }
            Frame::Completion {
                invocation_id,
                error,
                ..
            } if invocation_id == INVOCATION_ID => {
                let _ = ws_write.send(Message::Close(None)).await;
                return match error {
                    Some(e) => Err(anyhow!("{target} failed: {e}")),
                    None => Ok(()),
                };
            }
            Frame::Close { error } => {
                bail!("Hub closed the connection: {}", error.unwrap_or_default());
            }
            other => tracing::debug!("Ignoring frame {:?}", other),
        }
    }

    bail!("Connection closed before {target} completed")
}
