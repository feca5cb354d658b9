//! Device synchronization for FingerKonnect
//!
//! Pushes the full rule collection to the connected finger over its local
//! HTTP endpoint and classifies the outcome.

pub mod client;
pub mod connectivity;
pub mod error;

pub use client::{SyncClient, SyncConfig, SyncReport, DEFAULT_ENDPOINT, DEFAULT_TIMEOUT};
pub use connectivity::{Connectivity, DeviceStatus, WatchConnectivity};
pub use error::SyncError;

/// SSID of the access point the device opens
pub const DEVICE_SSID: &str = "FingerKonnect";
