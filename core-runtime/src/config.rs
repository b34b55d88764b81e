//! # Core Configuration Module
//!
//! Builder-based configuration for the camera uploads core. A `CoreConfig`
//! holds every injected capability (transfer service, media source, storage
//! bridges, network monitor) plus the numeric upload policy, validated
//! fail-fast so a missing bridge surfaces at startup instead of mid-upload.
//!
//! ## Required Dependencies
//!
//! - `TransferService` - carries staged files to remote storage
//! - `MediaSource` - supplies device media candidates
//!
//! ## Optional Dependencies (with platform defaults)
//!
//! - `StorageInspector` / `FileJanitor` - desktop defaults injected when the
//!   `desktop-shims` feature is enabled
//! - `NetworkMonitor` - without one, reachability must be pushed by the host
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .transfer_service(Arc::new(MyTransferService))
//!     .media_source(Arc::new(MyMediaSource))
//!     .retry_limit(5)
//!     .worker_limit(2)
//!     .build()
//!     .expect("Failed to build config");
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{FileJanitor, MediaSource, NetworkMonitor, StorageInspector, TransferService};
use std::path::PathBuf;
use std::sync::Arc;

/// Default maximum concurrent transfer workers
pub const DEFAULT_WORKER_LIMIT: usize = 4;

/// Default automatic re-queue ceiling for failed transfers
pub const DEFAULT_RETRY_LIMIT: u32 = 3;

/// Default free-space floor below which new transfers are not admitted
pub const DEFAULT_MIN_FREE_SPACE_BYTES: u64 = 100 * 1024 * 1024;

/// Core configuration for the camera uploads core.
///
/// Use [`CoreConfig::builder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Override for the downloads directory (implementation default if None)
    pub downloads_dir: Option<PathBuf>,

    /// Override for the staging directory (implementation default if None)
    pub staging_dir: Option<PathBuf>,

    /// Maximum concurrent transfer workers
    pub worker_limit: usize,

    /// Retry ceiling: failures at or below this count re-queue automatically
    pub retry_limit: u32,

    /// Free-space floor for admitting new transfers
    pub min_free_space_bytes: u64,

    /// Treat metered/cellular networks as unreachable for dispatch
    pub wifi_only: bool,

    /// Event bus buffer size
    pub event_buffer_size: usize,

    /// Remote transfer service (required)
    pub transfer_service: Arc<dyn TransferService>,

    /// Device media source (required)
    pub media_source: Arc<dyn MediaSource>,

    /// Storage inspector (required; desktop default with `desktop-shims`)
    pub storage_inspector: Arc<dyn StorageInspector>,

    /// File janitor (required; desktop default with `desktop-shims`)
    pub file_janitor: Arc<dyn FileJanitor>,

    /// Network monitor (optional; reachability can be pushed instead)
    pub network_monitor: Option<Arc<dyn NetworkMonitor>>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("downloads_dir", &self.downloads_dir)
            .field("staging_dir", &self.staging_dir)
            .field("worker_limit", &self.worker_limit)
            .field("retry_limit", &self.retry_limit)
            .field("min_free_space_bytes", &self.min_free_space_bytes)
            .field("wifi_only", &self.wifi_only)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("transfer_service", &"TransferService { ... }")
            .field("media_source", &"MediaSource { ... }")
            .field("storage_inspector", &"StorageInspector { ... }")
            .field("file_janitor", &"FileJanitor { ... }")
            .field(
                "network_monitor",
                &self.network_monitor.as_ref().map(|_| "NetworkMonitor { ... }"),
            )
            .finish()
    }
}

impl CoreConfig {
    /// Start building a configuration
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }
}

/// Builder for [`CoreConfig`]
#[derive(Default)]
pub struct CoreConfigBuilder {
    downloads_dir: Option<PathBuf>,
    staging_dir: Option<PathBuf>,
    worker_limit: Option<usize>,
    retry_limit: Option<u32>,
    min_free_space_bytes: Option<u64>,
    wifi_only: bool,
    event_buffer_size: Option<usize>,
    transfer_service: Option<Arc<dyn TransferService>>,
    media_source: Option<Arc<dyn MediaSource>>,
    storage_inspector: Option<Arc<dyn StorageInspector>>,
    file_janitor: Option<Arc<dyn FileJanitor>>,
    network_monitor: Option<Arc<dyn NetworkMonitor>>,
}

impl CoreConfigBuilder {
    /// Override the downloads directory
    pub fn downloads_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.downloads_dir = Some(path.into());
        self
    }

    /// Override the staging directory
    pub fn staging_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(path.into());
        self
    }

    /// Set the maximum concurrent transfer workers
    pub fn worker_limit(mut self, limit: usize) -> Self {
        self.worker_limit = Some(limit);
        self
    }

    /// Set the retry ceiling
    pub fn retry_limit(mut self, limit: u32) -> Self {
        self.retry_limit = Some(limit);
        self
    }

    /// Set the free-space floor for admitting transfers
    pub fn min_free_space_bytes(mut self, bytes: u64) -> Self {
        self.min_free_space_bytes = Some(bytes);
        self
    }

    /// Restrict dispatch to unmetered networks
    pub fn wifi_only(mut self, wifi_only: bool) -> Self {
        self.wifi_only = wifi_only;
        self
    }

    /// Set the event bus buffer size
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Inject the transfer service (required)
    pub fn transfer_service(mut self, service: Arc<dyn TransferService>) -> Self {
        self.transfer_service = Some(service);
        self
    }

    /// Inject the media source (required)
    pub fn media_source(mut self, source: Arc<dyn MediaSource>) -> Self {
        self.media_source = Some(source);
        self
    }

    /// Inject a storage inspector
    pub fn storage_inspector(mut self, inspector: Arc<dyn StorageInspector>) -> Self {
        self.storage_inspector = Some(inspector);
        self
    }

    /// Inject a file janitor
    pub fn file_janitor(mut self, janitor: Arc<dyn FileJanitor>) -> Self {
        self.file_janitor = Some(janitor);
        self
    }

    /// Inject a network monitor
    pub fn network_monitor(mut self, monitor: Arc<dyn NetworkMonitor>) -> Self {
        self.network_monitor = Some(monitor);
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::CapabilityMissing` for absent required bridges and
    /// `Error::Config` for invalid numeric settings.
    pub fn build(self) -> Result<CoreConfig> {
        let transfer_service =
            self.transfer_service
                .ok_or_else(|| Error::CapabilityMissing {
                    capability: "TransferService".to_string(),
                    message: "No transfer service provided. Inject the host's remote \
                              transfer adapter via CoreConfigBuilder::transfer_service."
                        .to_string(),
                })?;

        let media_source = self.media_source.ok_or_else(|| Error::CapabilityMissing {
            capability: "MediaSource".to_string(),
            message: "No media source provided. Inject the host's device media \
                      adapter via CoreConfigBuilder::media_source."
                .to_string(),
        })?;

        let storage_inspector = match self.storage_inspector {
            Some(inspector) => inspector,
            None => Self::default_storage_inspector(
                self.downloads_dir.clone(),
                self.staging_dir.clone(),
            )?,
        };

        let file_janitor = match self.file_janitor {
            Some(janitor) => janitor,
            None => Self::default_file_janitor()?,
        };

        let worker_limit = self.worker_limit.unwrap_or(DEFAULT_WORKER_LIMIT);
        if worker_limit == 0 {
            return Err(Error::Config(
                "worker_limit must be at least 1".to_string(),
            ));
        }

        let event_buffer_size = self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE);
        if event_buffer_size == 0 {
            return Err(Error::Config(
                "event_buffer_size must be at least 1".to_string(),
            ));
        }

        Ok(CoreConfig {
            downloads_dir: self.downloads_dir,
            staging_dir: self.staging_dir,
            worker_limit,
            retry_limit: self.retry_limit.unwrap_or(DEFAULT_RETRY_LIMIT),
            min_free_space_bytes: self
                .min_free_space_bytes
                .unwrap_or(DEFAULT_MIN_FREE_SPACE_BYTES),
            wifi_only: self.wifi_only,
            event_buffer_size,
            transfer_service,
            media_source,
            storage_inspector,
            file_janitor,
            network_monitor: self.network_monitor,
        })
    }

    #[cfg(feature = "desktop-shims")]
    fn default_storage_inspector(
        downloads_dir: Option<PathBuf>,
        staging_dir: Option<PathBuf>,
    ) -> Result<Arc<dyn StorageInspector>> {
        use bridge_desktop::DiskStorageInspector;

        Ok(match (downloads_dir, staging_dir) {
            (Some(downloads), Some(staging)) => {
                Arc::new(DiskStorageInspector::with_directories(downloads, staging))
            }
            (None, None) => Arc::new(DiskStorageInspector::new()),
            _ => {
                return Err(Error::Config(
                    "downloads_dir and staging_dir must be overridden together".to_string(),
                ))
            }
        })
    }

    #[cfg(not(feature = "desktop-shims"))]
    fn default_storage_inspector(
        _downloads_dir: Option<PathBuf>,
        _staging_dir: Option<PathBuf>,
    ) -> Result<Arc<dyn StorageInspector>> {
        Err(Error::CapabilityMissing {
            capability: "StorageInspector".to_string(),
            message: "No storage inspector provided. Desktop: enable the desktop-shims \
                      feature. Mobile: inject a platform-native adapter."
                .to_string(),
        })
    }

    #[cfg(feature = "desktop-shims")]
    fn default_file_janitor() -> Result<Arc<dyn FileJanitor>> {
        Ok(Arc::new(bridge_desktop::DiskFileJanitor::new()))
    }

    #[cfg(not(feature = "desktop-shims"))]
    fn default_file_janitor() -> Result<Arc<dyn FileJanitor>> {
        Err(Error::CapabilityMissing {
            capability: "FileJanitor".to_string(),
            message: "No file janitor provided. Desktop: enable the desktop-shims \
                      feature. Mobile: inject a platform-native adapter."
                .to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::{
        error::Result as BridgeResult,
        media::MediaCandidate,
        storage::{DirectoryKind, PurgeOutcome},
        transfer::RemoteHandle,
    };
    use std::path::Path;

    struct NullTransfer;

    #[async_trait]
    impl TransferService for NullTransfer {
        async fn upload(&self, _local_path: &Path) -> BridgeResult<RemoteHandle> {
            Ok(RemoteHandle::new("node:0"))
        }
    }

    struct NullMedia;

    #[async_trait]
    impl MediaSource for NullMedia {
        async fn pending_media(&self) -> BridgeResult<Vec<MediaCandidate>> {
            Ok(Vec::new())
        }
    }

    struct NullInspector;

    #[async_trait]
    impl StorageInspector for NullInspector {
        async fn free_space_bytes(&self) -> u64 {
            u64::MAX
        }

        async fn resolved_directory(&self, kind: DirectoryKind) -> BridgeResult<PathBuf> {
            Ok(std::env::temp_dir().join(kind.as_str()))
        }
    }

    struct NullJanitor;

    #[async_trait]
    impl FileJanitor for NullJanitor {
        async fn remove(&self, _path: &Path) -> bool {
            true
        }

        async fn purge_folder(&self, _folder: &Path) -> PurgeOutcome {
            PurgeOutcome::default()
        }

        async fn purge_folder_containing(&self, _folder: &Path, _fragment: &str) -> PurgeOutcome {
            PurgeOutcome::default()
        }

        async fn purge_folder_recursive_containing(
            &self,
            _folder: &Path,
            _fragment: &str,
        ) -> PurgeOutcome {
            PurgeOutcome::default()
        }

        async fn purge_folder_recursive_with_extension(
            &self,
            _folder: &Path,
            _extension: &str,
        ) -> PurgeOutcome {
            PurgeOutcome::default()
        }
    }

    fn full_builder() -> CoreConfigBuilder {
        CoreConfig::builder()
            .transfer_service(Arc::new(NullTransfer))
            .media_source(Arc::new(NullMedia))
            .storage_inspector(Arc::new(NullInspector))
            .file_janitor(Arc::new(NullJanitor))
    }

    #[test]
    fn test_build_with_all_bridges() {
        let config = full_builder().build().unwrap();
        assert_eq!(config.worker_limit, DEFAULT_WORKER_LIMIT);
        assert_eq!(config.retry_limit, DEFAULT_RETRY_LIMIT);
        assert!(!config.wifi_only);
        assert!(config.network_monitor.is_none());
    }

    #[test]
    fn test_missing_transfer_service_fails_fast() {
        let result = CoreConfig::builder()
            .media_source(Arc::new(NullMedia))
            .storage_inspector(Arc::new(NullInspector))
            .file_janitor(Arc::new(NullJanitor))
            .build();

        match result {
            Err(Error::CapabilityMissing { capability, .. }) => {
                assert_eq!(capability, "TransferService")
            }
            other => panic!("Expected CapabilityMissing, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_missing_media_source_fails_fast() {
        let result = CoreConfig::builder()
            .transfer_service(Arc::new(NullTransfer))
            .storage_inspector(Arc::new(NullInspector))
            .file_janitor(Arc::new(NullJanitor))
            .build();

        assert!(matches!(
            result,
            Err(Error::CapabilityMissing { capability, .. }) if capability == "MediaSource"
        ));
    }

    #[test]
    fn test_zero_worker_limit_rejected() {
        let result = full_builder().worker_limit(0).build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_settings_carried_through() {
        let config = full_builder()
            .worker_limit(2)
            .retry_limit(5)
            .min_free_space_bytes(64)
            .wifi_only(true)
            .staging_dir("/tmp/cuc-staging")
            .downloads_dir("/tmp/cuc-downloads")
            .build()
            .unwrap();

        assert_eq!(config.worker_limit, 2);
        assert_eq!(config.retry_limit, 5);
        assert_eq!(config.min_free_space_bytes, 64);
        assert!(config.wifi_only);
        assert_eq!(config.staging_dir.as_deref(), Some(Path::new("/tmp/cuc-staging")));
    }
}
