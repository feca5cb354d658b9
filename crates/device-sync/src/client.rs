//! HTTP client that pushes the rule collection to the device

use crate::error::SyncError;
use rule_engine::{Rule, WirePayload};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Default address of the device on its own access point
pub const DEFAULT_ENDPOINT: &str = "192.168.4.1";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Sync client configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Device host, optionally with `:port`
    pub endpoint: String,
    pub timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Outcome of a successful sync
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Number of rules accepted by the device
    pub synced: usize,
}

/// Marks the client busy for as long as it lives
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Single-flight sync client
pub struct SyncClient {
    http: reqwest::Client,
    endpoint: String,
    busy: AtomicBool,
}

impl SyncClient {
    /// Create a client for the given device
    pub fn new(config: SyncConfig) -> Result<Self, SyncError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SyncError::Setup(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: config.endpoint,
            busy: AtomicBool::new(false),
        })
    }

    /// Device host the client talks to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// URL rules are posted to
    pub fn events_url(&self) -> String {
        format!("http://{}/events", self.endpoint)
    }

    /// Whether a sync is in flight
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Send every rule to the device in one request.
    ///
    /// Never retries. A call made while another is in flight fails with
    /// [`SyncError::Busy`] without touching the network.
    pub async fn sync(&self, rules: &[Rule]) -> Result<SyncReport, SyncError> {
        if rules.is_empty() {
            return Err(SyncError::NothingToSync);
        }

        let Some(_guard) = BusyGuard::acquire(&self.busy) else {
            tracing::debug!("Sync already in progress, rejecting");
            return Err(SyncError::Busy);
        };

        let url = self.events_url();
        tracing::info!("Syncing {} rules to {}", rules.len(), url);

        let response = self
            .http
            .post(&url)
            .json(&WirePayload::new(rules))
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Sync connection error: {}", e);
                SyncError::ConnectionError(e.to_string())
            })?;

        let status = response.status();
        if status.is_success() {
            tracing::info!("{} rules synced successfully", rules.len());
            return Ok(SyncReport {
                synced: rules.len(),
            });
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("Failed to read device error body: {}", e);
                format!("(unreadable response body: {e})")
            }
        };
        tracing::warn!("Device rejected sync: {} - {}", status, body);
        Err(SyncError::RemoteError {
            status: status.as_u16(),
            body,
        })
    }
}
