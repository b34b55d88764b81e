//! # Camera Upload Coordinator
//!
//! Orchestrates the camera-backup feature: aggregates the user toggle,
//! reachability, and queue occupancy into the derived [`UploadState`],
//! drives bounded transfer workers, and emits every state transition on the
//! event bus.
//!
//! ## Workflow
//!
//! 1. Host constructs the coordinator with its collaborators (dependency
//!    injection; no shared singletons)
//! 2. `refresh_pending` pulls candidates from the `MediaSource` and
//!    enqueues them (idempotent by identifier)
//! 3. `start` spawns the dispatch loop: while enabled and reachable, claim
//!    queued items and upload them on up to `worker_limit` concurrent
//!    workers
//! 4. Worker results flow back through the queue (`mark_done` /
//!    `mark_failed`), each followed by a state recompute
//! 5. Every state *transition* emits
//!    `CoreEvent::Upload(UploadEvent::StateChanged)` with the triggering
//!    snapshot; unchanged recomputes emit nothing
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_upload::{CameraUploadCoordinator, UploadConfig};
//! use std::sync::Arc;
//!
//! # async fn example(coordinator: Arc<CameraUploadCoordinator>) {
//! coordinator.refresh_pending().await.ok();
//! coordinator.start();
//! coordinator.set_reachable(true).await;
//! # }
//! ```

use bridge_traits::{
    media::MediaSource,
    network::{NetworkInfo, NetworkMonitor, NetworkType},
    storage::{FileJanitor, StorageInspector},
    transfer::TransferService,
};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus, MaintenanceEvent, UploadEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::item::MediaItem;
use crate::queue::{FailureDisposition, QueueSnapshot, UploadQueue};
use crate::state::UploadState;

/// Coordinator configuration
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Maximum concurrent transfer workers
    pub worker_limit: usize,

    /// Retry ceiling for failed transfers
    pub retry_limit: u32,

    /// Free-space floor below which new transfers are not admitted
    pub min_free_space_bytes: u64,

    /// Treat metered/cellular networks as unreachable for dispatch
    pub wifi_only: bool,

    /// How long the dispatch loop sleeps when there is nothing to do
    pub dispatch_idle: Duration,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            worker_limit: 4,
            retry_limit: 3,
            min_free_space_bytes: 100 * 1024 * 1024,
            wifi_only: false,
            dispatch_idle: Duration::from_millis(200),
        }
    }
}

impl From<&CoreConfig> for UploadConfig {
    fn from(config: &CoreConfig) -> Self {
        Self {
            worker_limit: config.worker_limit,
            retry_limit: config.retry_limit,
            min_free_space_bytes: config.min_free_space_bytes,
            wifi_only: config.wifi_only,
            ..Self::default()
        }
    }
}

/// Mutable reducer inputs plus transition bookkeeping
struct Signals {
    enabled: bool,
    reachable: bool,
    snapshot_ready: bool,
    last_state: Option<UploadState>,
    session_id: Uuid,
}

/// Coordinator for the camera-upload feature
pub struct CameraUploadCoordinator {
    config: UploadConfig,
    queue: Arc<UploadQueue>,
    transfer_service: Arc<dyn TransferService>,
    media_source: Arc<dyn MediaSource>,
    storage_inspector: Arc<dyn StorageInspector>,
    event_bus: EventBus,
    signals: Mutex<Signals>,
    transfer_slots: Arc<Semaphore>,
    shutdown: CancellationToken,
}

impl CameraUploadCoordinator {
    /// Create a new coordinator.
    ///
    /// All collaborators are injected; the queue is built internally around
    /// the janitor and the configured retry ceiling. The feature starts
    /// enabled but unreachable: reachability arrives from a network watcher
    /// or `set_reachable`.
    pub fn new(
        config: UploadConfig,
        transfer_service: Arc<dyn TransferService>,
        media_source: Arc<dyn MediaSource>,
        storage_inspector: Arc<dyn StorageInspector>,
        file_janitor: Arc<dyn FileJanitor>,
        event_bus: EventBus,
    ) -> Self {
        let queue = Arc::new(UploadQueue::new(file_janitor, config.retry_limit));
        let transfer_slots = Arc::new(Semaphore::new(config.worker_limit));

        Self {
            config,
            queue,
            transfer_service,
            media_source,
            storage_inspector,
            event_bus,
            signals: Mutex::new(Signals {
                enabled: true,
                reachable: false,
                snapshot_ready: false,
                last_state: None,
                session_id: Uuid::new_v4(),
            }),
            transfer_slots,
            shutdown: CancellationToken::new(),
        }
    }

    /// Create a coordinator from a validated [`CoreConfig`]
    pub fn from_config(config: &CoreConfig, event_bus: EventBus) -> Self {
        Self::new(
            UploadConfig::from(config),
            Arc::clone(&config.transfer_service),
            Arc::clone(&config.media_source),
            Arc::clone(&config.storage_inspector),
            Arc::clone(&config.file_janitor),
            event_bus,
        )
    }

    /// The queue backing this coordinator
    pub fn queue(&self) -> Arc<UploadQueue> {
        Arc::clone(&self.queue)
    }

    /// Toggle the feature.
    ///
    /// Re-enabling after a disable starts a fresh session: completion and
    /// failure bookkeeping reset and a new session id is assigned.
    pub async fn set_enabled(&self, enabled: bool) {
        {
            let mut signals = self.signals.lock().await;
            if signals.enabled == enabled {
                return;
            }

            if enabled {
                signals.session_id = Uuid::new_v4();
                info!(session_id = %signals.session_id, "Camera uploads enabled");
            } else {
                info!("Camera uploads disabled");
            }
            signals.enabled = enabled;
        }

        if enabled {
            self.queue.reset_session().await;
        }
        self.recompute().await;
    }

    /// Push a reachability change
    pub async fn set_reachable(&self, reachable: bool) {
        {
            let mut signals = self.signals.lock().await;
            if signals.reachable == reachable {
                return;
            }
            signals.reachable = reachable;
        }

        debug!(reachable, "Reachability changed");
        self.recompute().await;
    }

    /// Apply a network info update, honoring `wifi_only`
    pub async fn apply_network_info(&self, info: &NetworkInfo) {
        let mut reachable = info.is_reachable();

        if reachable && self.config.wifi_only {
            let on_wifi = matches!(info.network_type, Some(NetworkType::WiFi));
            if !on_wifi || info.is_metered {
                debug!("WiFi-only mode: metered/non-WiFi network treated as unreachable");
                reachable = false;
            }
        }

        self.set_reachable(reachable).await;
    }

    /// Watch a network monitor and feed its changes into the coordinator.
    ///
    /// Applies the current info immediately, then consumes the monitor's
    /// change stream until shutdown.
    pub async fn spawn_network_watcher(
        self: &Arc<Self>,
        monitor: Arc<dyn NetworkMonitor>,
    ) -> Result<()> {
        if let Ok(info) = monitor.get_network_info().await {
            self.apply_network_info(&info).await;
        }

        let mut stream = monitor.subscribe_changes().await?;
        let coordinator = Arc::clone(self);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = coordinator.shutdown.cancelled() => break,
                    next = stream.next() => match next {
                        Some(info) => coordinator.apply_network_info(&info).await,
                        None => break,
                    },
                }
            }
            debug!("Network watcher stopped");
        });

        Ok(())
    }

    /// Pull candidates from the media source and enqueue them.
    ///
    /// Marks the queue snapshot available (resolving `Loading`) and returns
    /// how many candidates were newly enqueued.
    #[instrument(skip(self))]
    pub async fn refresh_pending(&self) -> Result<usize> {
        let candidates = self.media_source.pending_media().await?;
        let mut added = 0usize;

        for candidate in candidates {
            if self.queue.enqueue(candidate).await {
                added += 1;
            }
        }

        self.signals.lock().await.snapshot_ready = true;
        info!(added, "Refreshed pending media");

        self.recompute().await;
        Ok(added)
    }

    /// Spawn the dispatch loop.
    ///
    /// The loop runs until [`shutdown`](Self::shutdown): while the feature
    /// is enabled, the network reachable, and free space above the floor,
    /// it claims queued items and uploads each on its own worker task,
    /// bounded by `worker_limit`.
    pub fn start(self: &Arc<Self>) {
        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            coordinator.run_dispatch_loop().await;
        });
    }

    /// Stop the dispatch loop and any watchers
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    async fn run_dispatch_loop(self: Arc<Self>) {
        info!(
            worker_limit = self.config.worker_limit,
            "Dispatch loop started"
        );

        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            let (enabled, reachable) = {
                let signals = self.signals.lock().await;
                (signals.enabled, signals.reachable)
            };

            if !enabled || !reachable {
                self.idle_wait().await;
                continue;
            }

            let free_space = self.storage_inspector.free_space_bytes().await;
            if free_space < self.config.min_free_space_bytes {
                warn!(
                    free_space,
                    floor = self.config.min_free_space_bytes,
                    "Low storage, holding new transfers"
                );
                self.idle_wait().await;
                continue;
            }

            let permit = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                permit = Arc::clone(&self.transfer_slots).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let Some(item) = self.queue.claim_next().await else {
                drop(permit);
                self.idle_wait().await;
                continue;
            };

            let coordinator = Arc::clone(&self);
            tokio::spawn(async move {
                coordinator.process_item(item, permit).await;
            });
        }

        info!("Dispatch loop stopped");
    }

    async fn idle_wait(&self) {
        tokio::select! {
            _ = self.shutdown.cancelled() => {}
            _ = tokio::time::sleep(self.config.dispatch_idle) => {}
        }
    }

    /// Upload one claimed item and submit the result back to the queue
    #[instrument(skip(self, item, _permit), fields(item_id = %item.id))]
    async fn process_item(&self, item: MediaItem, _permit: OwnedSemaphorePermit) {
        match self.transfer_service.upload(&item.local_path).await {
            Ok(handle) => match self.queue.mark_done(&item.id, handle).await {
                Ok(Some(completed)) => {
                    self.event_bus
                        .emit(CoreEvent::Upload(UploadEvent::ItemCompleted {
                            item_id: completed.item.id.to_string(),
                            remote_handle: completed
                                .item
                                .remote_handle
                                .as_ref()
                                .map(|h| h.as_str().to_string())
                                .unwrap_or_default(),
                            size_bytes: completed.item.size_bytes,
                        }))
                        .ok();

                    if !completed.cleanup_ok {
                        self.event_bus
                            .emit(CoreEvent::Maintenance(MaintenanceEvent::CleanupFailed {
                                path: completed.item.local_path.display().to_string(),
                                message: "uploaded file survived cleanup".to_string(),
                            }))
                            .ok();
                    }
                }
                Ok(None) => {}
                Err(e) => error!(error = %e, "Failed to record completed upload"),
            },
            Err(e) => {
                debug!(error = %e, "Transfer attempt failed");
                match self.queue.mark_failed(&item.id, e.to_string()).await {
                    Ok(FailureDisposition::Permanent { attempts, message }) => {
                        self.event_bus
                            .emit(CoreEvent::Upload(UploadEvent::ItemFailedPermanently {
                                item_id: item.id.to_string(),
                                message,
                                attempts,
                            }))
                            .ok();
                    }
                    Ok(FailureDisposition::Requeued { .. }) => {}
                    Err(e) => error!(error = %e, "Failed to record transfer failure"),
                }
            }
        }

        self.recompute().await;
    }

    /// Re-derive the state and emit a `StateChanged` event on transition.
    ///
    /// Safe to call from anywhere; unchanged states emit nothing.
    pub async fn recompute(&self) {
        let mut signals = self.signals.lock().await;

        let snapshot = if signals.snapshot_ready {
            Some(self.queue.snapshot().await)
        } else {
            None
        };

        let state = UploadState::derive(signals.enabled, signals.reachable, snapshot.as_ref());
        if signals.last_state == Some(state) {
            return;
        }

        info!(
            state = %state,
            previous = ?signals.last_state.map(|s| s.as_str()),
            "Upload state changed"
        );
        signals.last_state = Some(state);

        let counts = snapshot.unwrap_or_default();
        self.event_bus
            .emit(CoreEvent::Upload(UploadEvent::StateChanged {
                session_id: signals.session_id.to_string(),
                state: state.as_str().to_string(),
                queued: counts.queued,
                in_flight: counts.in_flight,
                failed: counts.failed,
                completed: counts.completed,
            }))
            .ok();
    }

    /// Derive the current state without emitting
    pub async fn current_state(&self) -> UploadState {
        let signals = self.signals.lock().await;
        let snapshot = if signals.snapshot_ready {
            Some(self.queue.snapshot().await)
        } else {
            None
        };
        UploadState::derive(signals.enabled, signals.reachable, snapshot.as_ref())
    }

    /// Current queue snapshot, `None` until the first refresh completes
    pub async fn snapshot(&self) -> Option<QueueSnapshot> {
        let signals = self.signals.lock().await;
        if signals.snapshot_ready {
            Some(self.queue.snapshot().await)
        } else {
            None
        }
    }
}

impl Drop for CameraUploadCoordinator {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::media::MediaCandidate;
    use bridge_traits::storage::{DirectoryKind, PurgeOutcome};
    use bridge_traits::transfer::RemoteHandle;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicU64, Ordering};

    struct StubTransfer;

    #[async_trait]
    impl TransferService for StubTransfer {
        async fn upload(&self, local_path: &Path) -> BridgeResult<RemoteHandle> {
            Ok(RemoteHandle::new(format!("node:{}", local_path.display())))
        }
    }

    struct StubMedia {
        candidates: Vec<MediaCandidate>,
    }

    #[async_trait]
    impl MediaSource for StubMedia {
        async fn pending_media(&self) -> BridgeResult<Vec<MediaCandidate>> {
            Ok(self.candidates.clone())
        }
    }

    struct StubInspector {
        free: AtomicU64,
    }

    #[async_trait]
    impl StorageInspector for StubInspector {
        async fn free_space_bytes(&self) -> u64 {
            self.free.load(Ordering::SeqCst)
        }

        async fn resolved_directory(&self, kind: DirectoryKind) -> BridgeResult<PathBuf> {
            Ok(std::env::temp_dir().join(kind.as_str()))
        }
    }

    struct StubJanitor;

    #[async_trait]
    impl FileJanitor for StubJanitor {
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

    fn candidate(id: &str) -> MediaCandidate {
        MediaCandidate {
            identifier: id.to_string(),
            local_path: PathBuf::from(format!("/tmp/staging/{}.heic", id)),
            size_bytes: 1_000,
            captured_at: 1_700_000_000,
        }
    }

    fn coordinator_with(candidates: Vec<MediaCandidate>) -> (CameraUploadCoordinator, EventBus) {
        let event_bus = EventBus::new(64);
        let coordinator = CameraUploadCoordinator::new(
            UploadConfig {
                dispatch_idle: Duration::from_millis(10),
                ..UploadConfig::default()
            },
            Arc::new(StubTransfer),
            Arc::new(StubMedia { candidates }),
            Arc::new(StubInspector {
                free: AtomicU64::new(u64::MAX),
            }),
            Arc::new(StubJanitor),
            event_bus.clone(),
        );
        (coordinator, event_bus)
    }

    #[tokio::test]
    async fn test_initial_state_is_no_internet() {
        let (coordinator, _bus) = coordinator_with(vec![]);
        assert_eq!(
            coordinator.current_state().await,
            UploadState::NoInternetConnection
        );
    }

    #[tokio::test]
    async fn test_loading_until_first_refresh() {
        let (coordinator, _bus) = coordinator_with(vec![]);
        coordinator.set_reachable(true).await;
        assert_eq!(coordinator.current_state().await, UploadState::Loading);
        assert!(coordinator.snapshot().await.is_none());

        coordinator.refresh_pending().await.unwrap();
        assert_eq!(coordinator.current_state().await, UploadState::Empty);
        assert!(coordinator.snapshot().await.is_some());
    }

    #[tokio::test]
    async fn test_disabled_overrides_all() {
        let (coordinator, _bus) = coordinator_with(vec![candidate("a")]);
        coordinator.set_reachable(true).await;
        coordinator.refresh_pending().await.unwrap();
        assert_eq!(coordinator.current_state().await, UploadState::Uploading);

        coordinator.set_enabled(false).await;
        assert_eq!(coordinator.current_state().await, UploadState::Disabled);
    }

    #[tokio::test]
    async fn test_recompute_emits_only_on_transition() {
        let (coordinator, bus) = coordinator_with(vec![]);
        let mut sub = bus.subscribe();

        coordinator.set_reachable(true).await; // -> Loading
        coordinator.recompute().await; // unchanged, no event
        coordinator.recompute().await; // unchanged, no event
        coordinator.refresh_pending().await.unwrap(); // -> Empty

        let mut states = Vec::new();
        while let Ok(event) = sub.try_recv() {
            if let CoreEvent::Upload(UploadEvent::StateChanged { state, .. }) = event {
                states.push(state);
            }
        }
        assert_eq!(states, vec!["loading".to_string(), "empty".to_string()]);
    }

    #[tokio::test]
    async fn test_refresh_is_idempotent() {
        let (coordinator, _bus) = coordinator_with(vec![candidate("a"), candidate("b")]);
        coordinator.set_reachable(true).await;

        assert_eq!(coordinator.refresh_pending().await.unwrap(), 2);
        assert_eq!(coordinator.refresh_pending().await.unwrap(), 0);
        assert_eq!(coordinator.snapshot().await.unwrap().queued, 2);
    }

    #[tokio::test]
    async fn test_wifi_only_treats_cellular_as_unreachable() {
        let event_bus = EventBus::new(16);
        let coordinator = CameraUploadCoordinator::new(
            UploadConfig {
                wifi_only: true,
                ..UploadConfig::default()
            },
            Arc::new(StubTransfer),
            Arc::new(StubMedia { candidates: vec![] }),
            Arc::new(StubInspector {
                free: AtomicU64::new(u64::MAX),
            }),
            Arc::new(StubJanitor),
            event_bus,
        );

        let cellular = NetworkInfo {
            status: bridge_traits::network::NetworkStatus::Connected,
            network_type: Some(NetworkType::Cellular),
            is_metered: true,
            is_expensive: true,
        };
        coordinator.apply_network_info(&cellular).await;
        assert_eq!(
            coordinator.current_state().await,
            UploadState::NoInternetConnection
        );

        let wifi = NetworkInfo {
            status: bridge_traits::network::NetworkStatus::Connected,
            network_type: Some(NetworkType::WiFi),
            is_metered: false,
            is_expensive: false,
        };
        coordinator.apply_network_info(&wifi).await;
        assert_eq!(coordinator.current_state().await, UploadState::Loading);
    }

    #[tokio::test]
    async fn test_reenable_starts_fresh_session() {
        let (coordinator, bus) = coordinator_with(vec![]);
        let mut sub = bus.subscribe();
        coordinator.set_reachable(true).await;
        coordinator.refresh_pending().await.unwrap();

        let first_session = {
            let mut session = None;
            while let Ok(event) = sub.try_recv() {
                if let CoreEvent::Upload(UploadEvent::StateChanged { session_id, .. }) = event {
                    session = Some(session_id);
                }
            }
            session.unwrap()
        };

        coordinator.set_enabled(false).await;
        coordinator.set_enabled(true).await;

        let second_session = {
            let mut session = None;
            while let Ok(event) = sub.try_recv() {
                if let CoreEvent::Upload(UploadEvent::StateChanged { session_id, .. }) = event {
                    session = Some(session_id);
                }
            }
            session.unwrap()
        };

        assert_ne!(first_session, second_session);
    }

    #[tokio::test]
    async fn test_low_storage_holds_dispatch() {
        let event_bus = EventBus::new(16);
        let inspector = Arc::new(StubInspector {
            free: AtomicU64::new(0),
        });
        let coordinator = Arc::new(CameraUploadCoordinator::new(
            UploadConfig {
                dispatch_idle: Duration::from_millis(5),
                min_free_space_bytes: 1024,
                ..UploadConfig::default()
            },
            Arc::new(StubTransfer),
            Arc::new(StubMedia {
                candidates: vec![candidate("a")],
            }),
            Arc::clone(&inspector) as Arc<dyn StorageInspector>,
            Arc::new(StubJanitor),
            event_bus,
        ));

        coordinator.set_reachable(true).await;
        coordinator.refresh_pending().await.unwrap();
        coordinator.start();

        // Storage reads as full: the item must stay queued
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(coordinator.snapshot().await.unwrap().queued, 1);

        // Free space recovers: the item uploads
        inspector.free.store(u64::MAX, Ordering::SeqCst);
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            if coordinator.snapshot().await.unwrap().completed == 1 {
                break;
            }
            assert!(tokio::time::Instant::now() < deadline, "upload never completed");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        coordinator.shutdown();
    }
}
