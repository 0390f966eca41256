//! # usbhub-common
//!
//! Shared configuration and error types for the USB hub.

pub mod config;
pub mod error;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
