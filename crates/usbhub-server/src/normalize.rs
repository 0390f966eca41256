//! Device report normalization.
//!
//! Both report shapes end up as [`NewUsbEvent`]s stamped with the reporting
//! connection and one `detected_at` shared by the whole batch. An empty result
//! means there is nothing to store.

use chrono::{DateTime, Utc};
use usbhub_protocol::{DeviceListMessage, ProtocolError, UsbDeviceInfo};

use crate::db::NewUsbEvent;

/// A device report as received, tagged by the hub method that carried it.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceReport {
    /// `ReportUsbDevices`: canonical field names, nullable entries.
    Structured(Vec<Option<UsbDeviceInfo>>),
    /// `SendDeviceList`: JSON envelope with alternate field names.
    Enveloped(String),
}

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("Device list payload is empty")]
    EmptyPayload,

    #[error(transparent)]
    Malformed(#[from] ProtocolError),
}

/// Normalize one report into canonical events.
pub fn normalize(
    connection_id: &str,
    report: DeviceReport,
    detected_at: DateTime<Utc>,
) -> Result<Vec<NewUsbEvent>, NormalizeError> {
    match report {
        DeviceReport::Structured(devices) => {
            Ok(from_structured(connection_id, devices, detected_at))
        }
        DeviceReport::Enveloped(payload) => from_envelope(connection_id, &payload, detected_at),
    }
}

fn from_structured(
    connection_id: &str,
    devices: Vec<Option<UsbDeviceInfo>>,
    detected_at: DateTime<Utc>,
) -> Vec<NewUsbEvent> {
    devices
        .into_iter()
        .flatten()
        .map(|device| NewUsbEvent {
            connection_id: connection_id.to_string(),
            device_index: device.device_index,
            vendor_id: device.vendor_id,
            product_id: device.product_id,
            serial_number: trimmed(device.serial_number),
            product_string: trimmed(device.product_string),
            manufacturer_string: trimmed(device.manufacturer_string),
            is_blocked: device.is_blocked,
            detected_at,
        })
        .collect()
}

fn from_envelope(
    connection_id: &str,
    payload: &str,
    detected_at: DateTime<Utc>,
) -> Result<Vec<NewUsbEvent>, NormalizeError> {
    if payload.trim().is_empty() {
        return Err(NormalizeError::EmptyPayload);
    }

    let message = DeviceListMessage::parse(payload)?;

    Ok(message
        .data
        .unwrap_or_default()
        .into_iter()
        .flatten()
        .map(|device| NewUsbEvent {
            connection_id: connection_id.to_string(),
            device_index: device.device_index,
            vendor_id: device.vendor_id,
            product_id: device.product_id,
            // The envelope shape has no serial number.
            serial_number: String::new(),
            product_string: device.friendly_name.unwrap_or_default(),
            manufacturer_string: device.hardware_id.unwrap_or_default(),
            is_blocked: !device.is_whitelisted,
            detected_at,
        })
        .collect())
}

fn trimmed(value: Option<String>) -> String {
    value.map(|s| s.trim().to_string()).unwrap_or_default()
}
