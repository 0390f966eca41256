//! # usbhub-protocol
//!
//! Wire types shared by the hub server and its clients.
//! Every WebSocket text frame carries one JSON [`Frame`].

mod call;
mod device;
mod frame;

pub use call::HubCall;
pub use device::{ClientUsbDeviceInfo, DeviceListMessage, UsbDeviceInfo};
pub use frame::Frame;

/// Path the hub is served on.
pub const HUB_PATH: &str = "/chathub";

/// Query parameter carrying the client's display name.
pub const USERNAME_PARAM: &str = "username";

/// Client-bound method used for directed messages.
pub const RECEIVE_MESSAGE: &str = "ReceiveMessage";

/// Maximum frame size (1 MB).
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Errors raised while decoding frames and hub calls.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Malformed frame: {0}")]
    Frame(#[from] serde_json::Error),

    #[error("Unknown hub method: {0}")]
    UnknownTarget(String),

    #[error("{target} expects {expected} argument(s), got {got}")]
    ArgumentCount {
        target: String,
        expected: usize,
        got: usize,
    },

    #[error("Invalid argument {index} for {target}: {source}")]
    Argument {
        target: String,
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Malformed device list: {0}")]
    DeviceList(#[source] serde_json::Error),
}
