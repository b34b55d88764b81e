//! Core service façade and bootstrap helpers.
//!
//! This crate wires a validated [`CoreConfig`] (host-provided transfer
//! service, media source, storage bridges, optional network monitor) into a
//! running camera-uploads coordinator plus event bus, and exposes the small
//! surface a host application embeds: toggle, refresh, state/snapshot
//! queries, event subscription, and storage maintenance helpers.
//!
//! Desktop apps typically enable the `desktop-shims` feature so the storage
//! bridges default to the `bridge-desktop` disk implementations; mobile
//! hosts inject their own adapters.

pub mod error;

pub use error::{CoreError, Result};

use bridge_traits::storage::{DirectoryKind, PurgeOutcome, StorageReport};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus, MaintenanceEvent, Receiver};
use core_upload::{CameraUploadCoordinator, MediaItem, QueueSnapshot, UploadState};
use std::sync::Arc;
use tracing::info;

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CameraUploadsService {
    config: CoreConfig,
    event_bus: EventBus,
    coordinator: Arc<CameraUploadCoordinator>,
}

impl CameraUploadsService {
    /// Build and start the service from a validated configuration.
    ///
    /// Spawns the dispatch loop immediately and, when a network monitor was
    /// injected, a watcher feeding its changes into the coordinator.
    /// Without a monitor the host pushes reachability via
    /// [`set_reachable`](Self::set_reachable).
    pub async fn initialize(config: CoreConfig) -> Result<Self> {
        let event_bus = EventBus::new(config.event_buffer_size);
        let coordinator = Arc::new(CameraUploadCoordinator::from_config(
            &config,
            event_bus.clone(),
        ));

        if let Some(monitor) = &config.network_monitor {
            coordinator
                .spawn_network_watcher(Arc::clone(monitor))
                .await
                .map_err(|e| CoreError::InitializationFailed(e.to_string()))?;
        }

        coordinator.start();
        info!("Camera uploads service initialized");

        Ok(Self {
            config,
            event_bus,
            coordinator,
        })
    }

    /// The event bus carrying state transitions and item events
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Subscribe to core events
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.event_bus.subscribe()
    }

    /// Turn the feature on (starts a fresh session)
    pub async fn enable(&self) {
        self.coordinator.set_enabled(true).await;
    }

    /// Turn the feature off
    pub async fn disable(&self) {
        self.coordinator.set_enabled(false).await;
    }

    /// Push a reachability change from the host
    pub async fn set_reachable(&self, reachable: bool) {
        self.coordinator.set_reachable(reachable).await;
    }

    /// Pull pending candidates from the media source into the queue
    pub async fn refresh_pending(&self) -> Result<usize> {
        Ok(self.coordinator.refresh_pending().await?)
    }

    /// Current derived upload state
    pub async fn state(&self) -> UploadState {
        self.coordinator.current_state().await
    }

    /// Current queue snapshot (`None` until the first refresh)
    pub async fn snapshot(&self) -> Option<QueueSnapshot> {
        self.coordinator.snapshot().await
    }

    /// Permanently failed items, for surfacing or manual retry
    pub async fn failed_items(&self) -> Vec<MediaItem> {
        self.coordinator.queue().failed_items().await
    }

    /// Live storage report: free space plus both resolved directories
    pub async fn storage_report(&self) -> Result<StorageReport> {
        Ok(self.config.storage_inspector.storage_report().await?)
    }

    /// Purge every entry from the staging directory
    pub async fn purge_staging(&self) -> Result<PurgeOutcome> {
        self.purge_directory(DirectoryKind::Staging).await
    }

    /// Purge every entry from the downloads directory
    pub async fn purge_downloads(&self) -> Result<PurgeOutcome> {
        self.purge_directory(DirectoryKind::Downloads).await
    }

    async fn purge_directory(&self, kind: DirectoryKind) -> Result<PurgeOutcome> {
        let folder = self.config.storage_inspector.resolved_directory(kind).await?;
        let outcome = self.config.file_janitor.purge_folder(&folder).await;

        info!(
            folder = %folder.display(),
            removed = outcome.removed,
            failed = outcome.failed,
            "Folder purge completed"
        );
        self.event_bus
            .emit(CoreEvent::Maintenance(MaintenanceEvent::PurgeCompleted {
                folder: folder.display().to_string(),
                removed: outcome.removed,
                failed: outcome.failed,
            }))
            .ok();

        Ok(outcome)
    }

    /// Stop the dispatch loop and watchers
    pub fn shutdown(&self) {
        self.coordinator.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::{
        error::Result as BridgeResult,
        media::{MediaCandidate, MediaSource},
        storage::{FileJanitor, StorageInspector},
        transfer::{RemoteHandle, TransferService},
    };
    use std::path::{Path, PathBuf};

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
            Ok(PathBuf::from("/tmp/cuc-service").join(kind.as_str()))
        }
    }

    struct CountingJanitor;

    #[async_trait]
    impl FileJanitor for CountingJanitor {
        async fn remove(&self, _path: &Path) -> bool {
            true
        }

        async fn purge_folder(&self, _folder: &Path) -> PurgeOutcome {
            PurgeOutcome {
                removed: 2,
                failed: 1,
            }
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

    async fn service() -> CameraUploadsService {
        let config = CoreConfig::builder()
            .transfer_service(Arc::new(NullTransfer))
            .media_source(Arc::new(NullMedia))
            .storage_inspector(Arc::new(NullInspector))
            .file_janitor(Arc::new(CountingJanitor))
            .build()
            .unwrap();

        CameraUploadsService::initialize(config).await.unwrap()
    }

    #[tokio::test]
    async fn test_initialize_and_query_state() {
        let service = service().await;

        // No reachability signal yet
        assert_eq!(service.state().await, UploadState::NoInternetConnection);

        service.set_reachable(true).await;
        assert_eq!(service.state().await, UploadState::Loading);

        service.refresh_pending().await.unwrap();
        assert_eq!(service.state().await, UploadState::Empty);

        service.shutdown();
    }

    #[tokio::test]
    async fn test_disable_enable_roundtrip() {
        let service = service().await;
        service.set_reachable(true).await;
        service.refresh_pending().await.unwrap();

        service.disable().await;
        assert_eq!(service.state().await, UploadState::Disabled);

        service.enable().await;
        assert_eq!(service.state().await, UploadState::Empty);

        service.shutdown();
    }

    #[tokio::test]
    async fn test_purge_emits_maintenance_event() {
        let service = service().await;
        let mut sub = service.subscribe();

        let outcome = service.purge_staging().await.unwrap();
        assert_eq!(outcome.removed, 2);
        assert_eq!(outcome.failed, 1);

        let mut saw_purge = false;
        while let Ok(event) = sub.try_recv() {
            if let CoreEvent::Maintenance(MaintenanceEvent::PurgeCompleted {
                removed, failed, ..
            }) = event
            {
                assert_eq!(removed, 2);
                assert_eq!(failed, 1);
                saw_purge = true;
            }
        }
        assert!(saw_purge);

        service.shutdown();
    }

    #[tokio::test]
    async fn test_storage_report_passthrough() {
        let service = service().await;
        let report = service.storage_report().await.unwrap();
        assert_eq!(report.free_space_bytes, u64::MAX);
        assert!(report.staging_dir.ends_with("staging"));

        service.shutdown();
    }
}
