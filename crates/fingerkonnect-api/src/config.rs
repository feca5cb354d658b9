//! Server configuration from environment variables

use device_sync::{SyncConfig, DEFAULT_ENDPOINT, DEFAULT_TIMEOUT};
use rule_engine::ValidationPolicy;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub listen: SocketAddr,
    pub policy: ValidationPolicy,
    pub sync: SyncConfig,
    /// Network the host is associated with, if known
    pub ssid: Option<String>,
}

impl Config {
    /// Read configuration from `FINGERKONNECT_*` variables
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let data_dir = lookup("FINGERKONNECT_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data"));

        let listen = match lookup("FINGERKONNECT_LISTEN") {
            Some(addr) => addr.parse::<SocketAddr>()?,
            None => SocketAddr::from(([0, 0, 0, 0], 3000)),
        };

        let policy = match lookup("FINGERKONNECT_POLICY") {
            Some(name) => name
                .parse::<ValidationPolicy>()
                .map_err(anyhow::Error::msg)?,
            None => ValidationPolicy::default(),
        };

        let timeout = match lookup("FINGERKONNECT_SYNC_TIMEOUT_SECS") {
            Some(secs) => Duration::from_secs(secs.parse::<u64>()?),
            None => DEFAULT_TIMEOUT,
        };

        let endpoint =
            lookup("FINGERKONNECT_DEVICE").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        Ok(Self {
            data_dir,
            listen,
            policy,
            sync: SyncConfig { endpoint, timeout },
            ssid: lookup("FINGERKONNECT_SSID").filter(|s| !s.is_empty()),
        })
    }
}
