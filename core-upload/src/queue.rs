//! # Upload Queue
//!
//! Holds pending media items awaiting transfer, with per-item lifecycle
//! (queued → transferring → done/failed).
//!
//! ## Ownership Model
//!
//! The queue is the single logical owner of every item's status. Transfer
//! workers never mutate items directly; they submit status-change requests
//! (`mark_transferring`, `mark_done`, `mark_failed`) that the queue applies
//! atomically, one at a time, behind one async mutex. The
//! `Queued → Transferring` transition is compare-and-swap-like: it only
//! succeeds from `Queued`, so a single item is never claimed by two workers.
//!
//! ## Cleanup
//!
//! On `mark_done` the queue hands the item's local path to the
//! [`FileJanitor`] and removes the item from its own bookkeeping only after
//! the deletion settles. A failed deletion is logged and counted, never
//! blocking completion: a leftover local file is preferable to re-uploading.

use bridge_traits::{media::MediaCandidate, storage::FileJanitor, transfer::RemoteHandle};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{Result, UploadError};
use crate::item::{MediaItem, MediaItemId, TransferStatus};

/// Read-only aggregate view of queue counts at a point in time.
///
/// Produced in O(1) from incrementally maintained counters; never mutated
/// by consumers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    /// Items waiting to transfer
    pub queued: u64,
    /// Items currently transferring
    pub in_flight: u64,
    /// Items failed permanently this session
    pub failed: u64,
    /// Items completed this session
    pub completed: u64,
}

impl QueueSnapshot {
    /// Items still tracked by the queue
    pub fn total(&self) -> u64 {
        self.queued + self.in_flight + self.failed
    }

    /// Live work: items that still want a transfer worker
    pub fn active(&self) -> u64 {
        self.queued + self.in_flight
    }

    /// Whether no live work remains
    pub fn is_drained(&self) -> bool {
        self.active() == 0
    }
}

/// Outcome of `mark_failed`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureDisposition {
    /// Below the retry ceiling; the item went back to `Queued`
    Requeued {
        /// Failures recorded so far
        attempt: u32,
    },
    /// Ceiling exhausted; the item is parked as a permanent failure
    Permanent {
        /// Total failed attempts
        attempts: u32,
        /// Last error message
        message: String,
    },
}

/// Outcome of `mark_done`
#[derive(Debug, Clone)]
pub struct CompletedUpload {
    /// The completed item, with its remote handle recorded
    pub item: MediaItem,
    /// Whether the local file is confirmed gone
    pub cleanup_ok: bool,
}

struct QueueInner {
    items: HashMap<MediaItemId, MediaItem>,
    /// FIFO claim order; lazily pruned (ids whose status left `Queued` are
    /// skipped on pop)
    pending: VecDeque<MediaItemId>,
    /// Identifiers completed this session; re-enqueues of these are no-ops
    completed_ids: HashSet<MediaItemId>,
    queued: u64,
    in_flight: u64,
    failed: u64,
    completed: u64,
    cleanup_failures: u64,
}

impl QueueInner {
    fn new() -> Self {
        Self {
            items: HashMap::new(),
            pending: VecDeque::new(),
            completed_ids: HashSet::new(),
            queued: 0,
            in_flight: 0,
            failed: 0,
            completed: 0,
            cleanup_failures: 0,
        }
    }

    fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            queued: self.queued,
            in_flight: self.in_flight,
            failed: self.failed,
            completed: self.completed,
        }
    }

    fn release_count_for(&mut self, status: TransferStatus) {
        match status {
            TransferStatus::Queued => self.queued -= 1,
            TransferStatus::Transferring => self.in_flight -= 1,
            TransferStatus::Failed => self.failed -= 1,
            TransferStatus::Done => {}
        }
    }
}

/// Work queue for media items awaiting upload
pub struct UploadQueue {
    janitor: Arc<dyn FileJanitor>,
    retry_limit: u32,
    inner: Mutex<QueueInner>,
}

impl UploadQueue {
    /// Create a queue with the given cleanup janitor and retry ceiling
    pub fn new(janitor: Arc<dyn FileJanitor>, retry_limit: u32) -> Self {
        Self {
            janitor,
            retry_limit,
            inner: Mutex::new(QueueInner::new()),
        }
    }

    /// The configured retry ceiling
    pub fn retry_limit(&self) -> u32 {
        self.retry_limit
    }

    /// Enqueue a candidate for upload.
    ///
    /// Idempotent by identifier: an id already tracked in any live status,
    /// or already completed this session, is a no-op. Returns whether the
    /// item was actually added.
    pub async fn enqueue(&self, candidate: MediaCandidate) -> bool {
        let item = MediaItem::from_candidate(candidate);
        let mut inner = self.inner.lock().await;

        if inner.items.contains_key(&item.id) || inner.completed_ids.contains(&item.id) {
            debug!(item_id = %item.id, "Duplicate enqueue ignored");
            return false;
        }

        info!(
            item_id = %item.id,
            size_bytes = item.size_bytes,
            "Enqueued media item"
        );

        inner.pending.push_back(item.id.clone());
        inner.items.insert(item.id.clone(), item);
        inner.queued += 1;
        true
    }

    /// Atomically pick and claim the oldest queued item.
    ///
    /// Returns `None` when nothing is claimable. The returned copy already
    /// has status `Transferring`.
    pub async fn claim_next(&self) -> Option<MediaItem> {
        let mut inner = self.inner.lock().await;

        while let Some(id) = inner.pending.pop_front() {
            let Some(item) = inner.items.get_mut(&id) else {
                continue;
            };
            if item.status != TransferStatus::Queued {
                continue;
            }

            item.start_transfer();
            let claimed = item.clone();
            inner.queued -= 1;
            inner.in_flight += 1;

            debug!(
                item_id = %claimed.id,
                retry_count = claimed.retry_count,
                "Claimed item for transfer"
            );
            return Some(claimed);
        }

        None
    }

    /// Explicit `Queued → Transferring` transition for a known id.
    ///
    /// # Errors
    ///
    /// `ItemNotFound` for unknown ids, `InvalidStatus` unless the item is
    /// currently `Queued` (the compare-and-swap guarantee).
    pub async fn mark_transferring(&self, id: &MediaItemId) -> Result<MediaItem> {
        let mut inner = self.inner.lock().await;

        let item = inner
            .items
            .get_mut(id)
            .ok_or_else(|| UploadError::ItemNotFound {
                item_id: id.to_string(),
            })?;

        if item.status != TransferStatus::Queued {
            return Err(UploadError::InvalidStatus {
                item_id: id.to_string(),
                from: item.status.to_string(),
                to: TransferStatus::Transferring.to_string(),
            });
        }

        item.start_transfer();
        let claimed = item.clone();
        inner.queued -= 1;
        inner.in_flight += 1;
        Ok(claimed)
    }

    /// Record a durable upload and clean up the local file.
    ///
    /// The local path goes to the janitor first; the item leaves the
    /// queue's bookkeeping only once the deletion settles (removed, or
    /// confirmed unnecessary because the path is already absent). A
    /// surviving file is logged and counted without blocking completion.
    ///
    /// Returns `Ok(None)` when the id already completed this session (the
    /// repeated-call no-op), `ItemNotFound` for ids never seen.
    pub async fn mark_done(
        &self,
        id: &MediaItemId,
        handle: RemoteHandle,
    ) -> Result<Option<CompletedUpload>> {
        let mut inner = self.inner.lock().await;

        if !inner.items.contains_key(id) {
            if inner.completed_ids.contains(id) {
                debug!(item_id = %id, "Repeated mark_done ignored");
                return Ok(None);
            }
            return Err(UploadError::ItemNotFound {
                item_id: id.to_string(),
            });
        }

        let mut item = inner.items.remove(id).expect("checked above");
        inner.release_count_for(item.status);
        item.complete(handle);

        // Deletion settles while the queue lock is held: mutations stay
        // serialized and the invariant "file exists iff status is live"
        // holds from any observer's view of the queue.
        let cleanup_ok = self.janitor.remove(&item.local_path).await;
        if !cleanup_ok {
            inner.cleanup_failures += 1;
            warn!(
                item_id = %item.id,
                path = ?item.local_path,
                "Uploaded file survived cleanup; leaving it behind"
            );
        }

        inner.completed_ids.insert(item.id.clone());
        inner.completed += 1;

        info!(
            item_id = %item.id,
            remote_handle = %item.remote_handle.as_ref().expect("set by complete"),
            cleanup_ok,
            "Media item uploaded"
        );

        Ok(Some(CompletedUpload { item, cleanup_ok }))
    }

    /// Record a transfer failure.
    ///
    /// Below the retry ceiling the item re-queues automatically; at or
    /// above it the item is parked as a permanent failure and excluded from
    /// further claiming. Calling this for an already-permanent item changes
    /// nothing and reports the existing disposition.
    pub async fn mark_failed(
        &self,
        id: &MediaItemId,
        reason: impl Into<String>,
    ) -> Result<FailureDisposition> {
        let reason = reason.into();
        let mut inner = self.inner.lock().await;

        let item = inner
            .items
            .get_mut(id)
            .ok_or_else(|| UploadError::ItemNotFound {
                item_id: id.to_string(),
            })?;

        if item.status == TransferStatus::Failed {
            return Ok(FailureDisposition::Permanent {
                attempts: item.retry_count,
                message: item.last_error.clone().unwrap_or_default(),
            });
        }

        let prior = item.status;
        item.fail(reason.clone(), self.retry_limit);
        let attempts = item.retry_count;
        let requeued = item.status == TransferStatus::Queued;
        let id_owned = item.id.clone();

        inner.release_count_for(prior);
        if requeued {
            inner.queued += 1;
            inner.pending.push_back(id_owned.clone());
            warn!(
                item_id = %id_owned,
                attempt = attempts,
                retry_limit = self.retry_limit,
                error = %reason,
                "Transfer failed, re-queued"
            );
            Ok(FailureDisposition::Requeued { attempt: attempts })
        } else {
            inner.failed += 1;
            warn!(
                item_id = %id_owned,
                attempts,
                error = %reason,
                "Transfer failed permanently"
            );
            Ok(FailureDisposition::Permanent {
                attempts,
                message: reason,
            })
        }
    }

    /// O(1) aggregate view of the queue
    pub async fn snapshot(&self) -> QueueSnapshot {
        self.inner.lock().await.snapshot()
    }

    /// Post-upload cleanups that left a file behind
    pub async fn cleanup_failures(&self) -> u64 {
        self.inner.lock().await.cleanup_failures
    }

    /// Copies of the permanently failed items, for surfacing or manual retry
    pub async fn failed_items(&self) -> Vec<MediaItem> {
        let inner = self.inner.lock().await;
        inner
            .items
            .values()
            .filter(|item| item.status == TransferStatus::Failed)
            .cloned()
            .collect()
    }

    /// Start a fresh session: drop completion/failure bookkeeping.
    ///
    /// Permanently failed items are forgotten (their local files remain, so
    /// the media source will offer them again); live items are untouched.
    pub async fn reset_session(&self) {
        let mut inner = self.inner.lock().await;

        let failed_ids: Vec<MediaItemId> = inner
            .items
            .values()
            .filter(|item| item.status == TransferStatus::Failed)
            .map(|item| item.id.clone())
            .collect();
        for id in &failed_ids {
            inner.items.remove(id);
        }

        inner.failed = 0;
        inner.completed = 0;
        inner.cleanup_failures = 0;
        inner.completed_ids.clear();

        info!(
            dropped_failed = failed_ids.len(),
            "Queue session bookkeeping reset"
        );
    }
}
