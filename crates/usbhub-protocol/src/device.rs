//! Device report payloads.
//!
//! `ReportUsbDevices` carries a list of [`UsbDeviceInfo`] whose fields already
//! use the canonical names. `SendDeviceList` carries a JSON string holding a
//! [`DeviceListMessage`] envelope, whose keys are matched case-insensitively.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ProtocolError;

/// Structured device descriptor (`ReportUsbDevices`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UsbDeviceInfo {
    pub device_index: u32,
    pub vendor_id: u16,
    pub product_id: u16,
    pub serial_number: Option<String>,
    pub product_string: Option<String>,
    pub manufacturer_string: Option<String>,
    pub is_blocked: bool,
}

/// Envelope sent as the single string argument of `SendDeviceList`.
///
/// Field names below are the lowercased keys; [`DeviceListMessage::parse`]
/// folds every incoming key to lowercase before binding.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DeviceListMessage {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub data: Option<Vec<Option<ClientUsbDeviceInfo>>>,
}

/// Alternate device descriptor used inside [`DeviceListMessage`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClientUsbDeviceInfo {
    #[serde(rename = "deviceindex")]
    pub device_index: u32,
    #[serde(rename = "vendorid")]
    pub vendor_id: u16,
    #[serde(rename = "productid")]
    pub product_id: u16,
    #[serde(rename = "hardwareid")]
    pub hardware_id: Option<String>,
    #[serde(rename = "friendlyname")]
    pub friendly_name: Option<String>,
    #[serde(rename = "iswhitelisted")]
    pub is_whitelisted: bool,
}

impl DeviceListMessage {
    /// Parse an envelope, accepting keys in any letter case.
    pub fn parse(json: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(json).map_err(ProtocolError::DeviceList)?;
        serde_json::from_value(fold_keys(value)).map_err(ProtocolError::DeviceList)
    }
}

fn fold_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k.to_lowercase(), fold_keys(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(fold_keys).collect()),
        other => other,
    }
}
