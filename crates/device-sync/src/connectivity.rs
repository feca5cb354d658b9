//! Connectivity signal
//!
//! Reports which network the host is associated with. Used for display only;
//! a sync is attempted regardless of what this says.

use serde::Serialize;
use tokio::sync::watch;

/// Source of the currently associated network identifier
pub trait Connectivity: Send + Sync {
    /// SSID of the current network, `None` when unknown or disconnected
    fn current_network(&self) -> Option<String>;
}

/// Connectivity fed by the platform through a watch channel
#[derive(Debug)]
pub struct WatchConnectivity {
    tx: watch::Sender<Option<String>>,
}

impl WatchConnectivity {
    #[must_use]
    pub fn new(initial: Option<String>) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    /// Record a network change
    pub fn update(&self, network: Option<String>) {
        tracing::debug!("Network changed: {:?}", network);
        self.tx.send_replace(network);
    }

    /// Subscribe to network changes
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.tx.subscribe()
    }
}

impl Connectivity for WatchConnectivity {
    fn current_network(&self) -> Option<String> {
        self.tx.borrow().clone()
    }
}

/// Snapshot shown to the user before syncing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceStatus {
    pub endpoint: String,
    pub network: Option<String>,
    /// Host is on the device's own access point
    pub on_device_network: bool,
}

impl DeviceStatus {
    pub fn new(connectivity: &dyn Connectivity, endpoint: &str) -> Self {
        let network = connectivity.current_network();
        let on_device_network = network.as_deref() == Some(crate::DEVICE_SSID);
        Self {
            endpoint: endpoint.to_string(),
            network,
            on_device_network,
        }
    }
}
