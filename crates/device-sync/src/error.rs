//! Sync error types

use thiserror::Error;

/// Ways a sync attempt can fail
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// The collection is empty; no request was sent
    #[error("No events to sync")]
    NothingToSync,

    /// Another sync is still in flight; no request was sent
    #[error("A sync is already in progress")]
    Busy,

    /// The device answered with a non-2xx status
    #[error("Sync failed: {status} - {body}")]
    RemoteError { status: u16, body: String },

    /// No response at all (unreachable, refused, timed out)
    #[error("Unable to reach the device: {0}")]
    ConnectionError(String),

    /// HTTP client could not be built
    #[error("Failed to set up HTTP client: {0}")]
    Setup(String),
}

impl SyncError {
    /// Message with actionable advice for the user
    #[must_use]
    pub fn guidance(&self) -> String {
        match self {
            Self::NothingToSync => {
                "No events to sync. Please add at least one event.".to_string()
            }
            Self::Busy => "A sync is already running, please wait for it to finish.".to_string(),
            Self::RemoteError { .. } => self.to_string(),
            Self::ConnectionError(detail) => format!(
                "Unable to connect to your connected finger.\n\n\
                 Make sure that:\n\
                 - your connected finger is powered on\n\
                 - you are connected to \"{}\" WiFi\n\
                 - your connected finger is functioning properly\n\n\
                 Error: {detail}",
                crate::DEVICE_SSID
            ),
            Self::Setup(_) => self.to_string(),
        }
    }
}
