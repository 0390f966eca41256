//! # USB Hub Pusher
//!
//! Test client that connects to the hub, submits one USB device report
//! read from a file, waits for the hub's completion and exits.
//!
//! ## Usage
//!
//! ```sh
//! usbhub-pusher                                        # ../test.json as SendDeviceList
//! usbhub-pusher --file devices.json --shape list       # JSON array as ReportUsbDevices
//! usbhub-pusher --url ws://hub:5009/chathub --user lab-3
//! ```

mod connection;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;
use url::Url;

use usbhub_protocol::{HubCall, UsbDeviceInfo, USERNAME_PARAM};

/// Push a USB device report to the hub.
#[derive(Parser, Debug)]
#[command(name = "usbhub-pusher")]
#[command(version)]
struct Args {
    /// Hub endpoint
    #[arg(long, env = "HUB_URL", default_value = "ws://localhost:5009/chathub")]
    url: String,

    /// File holding the payload
    #[arg(long, default_value = "../test.json")]
    file: PathBuf,

    /// Display name announced to the hub
    #[arg(long, default_value = "dummy-pusher")]
    user: String,

    /// How the file content is submitted
    #[arg(long, value_enum, default_value_t = Shape::Envelope)]
    shape: Shape,

    /// Give up if the hub has not answered after this many seconds
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Shape {
    /// Raw file text through `SendDeviceList`
    Envelope,
    /// JSON array of devices through `ReportUsbDevices`
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let payload = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let call = build_call(args.shape, payload)?;
    let url = hub_url(&args.url, &args.user)?;

    tracing::info!(%url, user = %args.user, "Connecting to hub...");
    connection::push(&url, call, Duration::from_secs(args.timeout_secs)).await?;
    tracing::info!("Device report accepted by hub");

    Ok(())
}

fn build_call(shape: Shape, payload: String) -> anyhow::Result<HubCall> {
    match shape {
        Shape::Envelope => Ok(HubCall::SendDeviceList(payload)),
        Shape::List => {
            let devices: Vec<Option<UsbDeviceInfo>> = serde_json::from_str(&payload)
                .context("List shape expects a JSON array of devices")?;
            Ok(HubCall::ReportUsbDevices(devices))
        }
    }
}

/// Hub endpoint with the display name in the query string.
fn hub_url(base: &str, user: &str) -> anyhow::Result<Url> {
    let mut url = Url::parse(base).with_context(|| format!("Invalid hub URL: {base}"))?;
    url.query_pairs_mut().append_pair(USERNAME_PARAM, user);
    Ok(url)
}
