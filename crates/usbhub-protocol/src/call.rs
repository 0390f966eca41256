use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{Frame, ProtocolError, UsbDeviceInfo};

const SEND_MESSAGE_TO_CLIENT: &str = "SendMessageToClient";
const GET_CONNECTED_CLIENTS: &str = "GetConnectedClients";
const REPORT_USB_DEVICES: &str = "ReportUsbDevices";
const SEND_DEVICE_LIST: &str = "SendDeviceList";

/// A hub method invoked by a client, decoded by method name.
#[derive(Debug, Clone, PartialEq)]
pub enum HubCall {
    /// Deliver `message` from `user` to one connection.
    SendMessageToClient {
        target_connection_id: String,
        user: String,
        message: String,
    },
    /// Presence query.
    GetConnectedClients,
    /// Structured device report. `None` entries are nulls sent by the client.
    ReportUsbDevices(Vec<Option<UsbDeviceInfo>>),
    /// Enveloped device report, still JSON-encoded.
    SendDeviceList(String),
}

impl HubCall {
    /// Decode the arguments of `target` with that method's schema.
    ///
    /// A null device list or null payload string decodes to the empty value.
    pub fn decode(target: &str, arguments: Vec<Value>) -> Result<Self, ProtocolError> {
        match target {
            SEND_MESSAGE_TO_CLIENT => {
                let [to, user, message] = expect_args::<3>(target, arguments)?;
                Ok(Self::SendMessageToClient {
                    target_connection_id: arg(target, 0, to)?,
                    user: arg(target, 1, user)?,
                    message: arg(target, 2, message)?,
                })
            }
            GET_CONNECTED_CLIENTS => {
                expect_args::<0>(target, arguments)?;
                Ok(Self::GetConnectedClients)
            }
            REPORT_USB_DEVICES => {
                let [devices] = expect_args::<1>(target, arguments)?;
                let devices: Option<Vec<Option<UsbDeviceInfo>>> = arg(target, 0, devices)?;
                Ok(Self::ReportUsbDevices(devices.unwrap_or_default()))
            }
            SEND_DEVICE_LIST => {
                let [payload] = expect_args::<1>(target, arguments)?;
                let payload: Option<String> = arg(target, 0, payload)?;
                Ok(Self::SendDeviceList(payload.unwrap_or_default()))
            }
            other => Err(ProtocolError::UnknownTarget(other.to_string())),
        }
    }

    /// Method name on the wire.
    pub fn target(&self) -> &'static str {
        match self {
            Self::SendMessageToClient { .. } => SEND_MESSAGE_TO_CLIENT,
            Self::GetConnectedClients => GET_CONNECTED_CLIENTS,
            Self::ReportUsbDevices(_) => REPORT_USB_DEVICES,
            Self::SendDeviceList(_) => SEND_DEVICE_LIST,
        }
    }

    /// Build the invocation frame a client sends for this call.
    pub fn into_frame(self, invocation_id: Option<String>) -> Result<Frame, ProtocolError> {
        let target = self.target();
        let arguments = match self {
            Self::SendMessageToClient {
                target_connection_id,
                user,
                message,
            } => vec![
                Value::from(target_connection_id),
                Value::from(user),
                Value::from(message),
            ],
            Self::GetConnectedClients => Vec::new(),
            Self::ReportUsbDevices(devices) => vec![serde_json::to_value(devices)?],
            Self::SendDeviceList(payload) => vec![Value::from(payload)],
        };
        Ok(Frame::invocation(invocation_id, target, arguments))
    }
}

fn expect_args<const N: usize>(
    target: &str,
    arguments: Vec<Value>,
) -> Result<[Value; N], ProtocolError> {
    let got = arguments.len();
    <[Value; N]>::try_from(arguments).map_err(|_| ProtocolError::ArgumentCount {
        target: target.to_string(),
        expected: N,
        got,
    })
}

fn arg<T: DeserializeOwned>(target: &str, index: usize, value: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(value).map_err(|source| ProtocolError::Argument {
        target: target.to_string(),
        index,
        source,
    })
}
