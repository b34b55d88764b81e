//! Network Monitoring Implementation

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    network::{NetworkChangeStream, NetworkInfo, NetworkMonitor, NetworkStatus, NetworkType},
};
use std::time::Duration;
use tracing::debug;

/// Default probe endpoint: a public DNS resolver reachable over TCP.
const DEFAULT_PROBE_ADDR: &str = "8.8.8.8:53";

/// Desktop network monitor implementation
///
/// Determines reachability by attempting a short TCP connect to a probe
/// endpoint. Platform-specific watchers (netlink, SystemConfiguration,
/// WinAPI) would be more precise but need extra dependencies; a probe is
/// enough for the upload core, which only consumes a reachable/unreachable
/// signal.
pub struct DesktopNetworkMonitor {
    probe_addr: String,
    probe_timeout: Duration,
    poll_interval: Duration,
}

impl DesktopNetworkMonitor {
    /// Create a monitor probing the default endpoint
    pub fn new() -> Self {
        Self {
            probe_addr: DEFAULT_PROBE_ADDR.to_string(),
            probe_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_secs(5),
        }
    }

    /// Create a monitor probing a custom `host:port` endpoint
    pub fn with_probe_addr(probe_addr: impl Into<String>) -> Self {
        Self {
            probe_addr: probe_addr.into(),
            ..Self::new()
        }
    }

    async fn check_connectivity(&self) -> NetworkStatus {
        match tokio::time::timeout(
            self.probe_timeout,
            tokio::net::TcpStream::connect(&self.probe_addr),
        )
        .await
        {
            Ok(Ok(_)) => NetworkStatus::Connected,
            Ok(Err(_)) | Err(_) => NetworkStatus::Disconnected,
        }
    }
}

impl Default for DesktopNetworkMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NetworkMonitor for DesktopNetworkMonitor {
    async fn get_network_info(&self) -> Result<NetworkInfo> {
        let status = self.check_connectivity().await;

        let info = NetworkInfo {
            status,
            // A TCP probe cannot distinguish link types
            network_type: (status == NetworkStatus::Connected).then_some(NetworkType::Other),
            // Desktop connections are typically neither metered nor expensive
            is_metered: false,
            is_expensive: false,
        };

        debug!(status = ?status, "Network info updated");
        Ok(info)
    }

    async fn subscribe_changes(&self) -> Result<Box<dyn NetworkChangeStream>> {
        Ok(Box::new(PollingNetworkChangeStream {
            monitor: DesktopNetworkMonitor {
                probe_addr: self.probe_addr.clone(),
                probe_timeout: self.probe_timeout,
                poll_interval: self.poll_interval,
            },
            last_status: None,
        }))
    }
}

/// Change stream that re-probes on an interval and yields on status change
struct PollingNetworkChangeStream {
    monitor: DesktopNetworkMonitor,
    last_status: Option<NetworkStatus>,
}

#[async_trait]
impl NetworkChangeStream for PollingNetworkChangeStream {
    async fn next(&mut self) -> Option<NetworkInfo> {
        loop {
            tokio::time::sleep(self.monitor.poll_interval).await;

            if let Ok(info) = self.monitor.get_network_info().await {
                if self.last_status != Some(info.status) {
                    self.last_status = Some(info.status);
                    return Some(info);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_probe_reads_disconnected() {
        // TEST-NET-1 address, guaranteed unroutable
        let monitor = DesktopNetworkMonitor {
            probe_addr: "192.0.2.1:9".to_string(),
            probe_timeout: Duration::from_millis(200),
            poll_interval: Duration::from_millis(50),
        };

        let info = monitor.get_network_info().await.unwrap();
        assert_eq!(info.status, NetworkStatus::Disconnected);
        assert!(info.network_type.is_none());
    }

    #[tokio::test]
    async fn test_get_network_info_returns_some_status() {
        let monitor = DesktopNetworkMonitor::new();
        let info = monitor.get_network_info().await.unwrap();

        assert!(matches!(
            info.status,
            NetworkStatus::Connected | NetworkStatus::Disconnected | NetworkStatus::Indeterminate
        ));
    }
}
