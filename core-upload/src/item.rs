//! # Media Item Model
//!
//! A media item is one capture (photo or video) staged for backup, tracked
//! by the upload queue from enqueue until its upload is durable and the
//! local file is cleaned up.

use bridge_traits::{media::MediaCandidate, transfer::RemoteHandle};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::UploadError;

/// Stable device-local identifier of a capture.
///
/// Assigned by the device media source (not by this crate), which is why it
/// is an opaque string rather than a generated UUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaItemId(String);

impl MediaItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MediaItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MediaItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Transfer status of a media item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    /// Waiting for a transfer worker
    Queued,
    /// A worker is transferring the item
    Transferring,
    /// Upload confirmed durable; local file cleaned up
    Done,
    /// Retry ceiling exhausted; will not re-queue automatically
    Failed,
}

impl TransferStatus {
    /// String representation for events and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Transferring => "transferring",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// Check if status is terminal (done or permanently failed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Check if status represents live work (queued or transferring)
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Queued | Self::Transferring)
    }
}

impl FromStr for TransferStatus {
    type Err = UploadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "transferring" => Ok(Self::Transferring),
            "done" => Ok(Self::Done),
            "failed" => Ok(Self::Failed),
            _ => Err(UploadError::Internal(format!(
                "Invalid transfer status: {}",
                s
            ))),
        }
    }
}

impl std::fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One capture tracked by the upload queue.
///
/// The queue owns the item exclusively until `Done`; while its status is
/// `Queued`, `Transferring`, or `Failed` the local file exists on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaItem {
    /// Stable device-local identifier
    pub id: MediaItemId,
    /// Staged file on local disk
    pub local_path: PathBuf,
    /// File size in bytes
    pub size_bytes: u64,
    /// Capture timestamp (Unix epoch seconds)
    pub captured_at: i64,
    /// Remote node handle, assigned when the upload completes
    pub remote_handle: Option<RemoteHandle>,
    /// Current status
    pub status: TransferStatus,
    /// Automatic re-queue attempts consumed
    pub retry_count: u32,
    /// Last transfer error message
    pub last_error: Option<String>,
    /// When the item entered the queue (Unix epoch seconds)
    pub enqueued_at: i64,
}

impl MediaItem {
    /// Create a queued item from a media-source candidate
    pub fn from_candidate(candidate: MediaCandidate) -> Self {
        Self {
            id: MediaItemId::new(candidate.identifier),
            local_path: candidate.local_path,
            size_bytes: candidate.size_bytes,
            captured_at: candidate.captured_at,
            remote_handle: None,
            status: TransferStatus::Queued,
            retry_count: 0,
            last_error: None,
            enqueued_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Whether another automatic re-queue is allowed after a failure.
    ///
    /// Failing exactly `ceiling` times still re-queues; the next failure is
    /// permanent.
    pub fn can_retry(&self, ceiling: u32) -> bool {
        self.retry_count <= ceiling
    }

    /// Mark the item as claimed by a transfer worker
    pub(crate) fn start_transfer(&mut self) {
        self.status = TransferStatus::Transferring;
    }

    /// Mark the upload durable and record the remote handle
    pub(crate) fn complete(&mut self, handle: RemoteHandle) {
        self.remote_handle = Some(handle);
        self.status = TransferStatus::Done;
    }

    /// Record a transfer failure; re-queues below the ceiling, parks the
    /// item as permanently failed above it.
    pub(crate) fn fail(&mut self, reason: impl Into<String>, ceiling: u32) {
        self.retry_count += 1;
        self.last_error = Some(reason.into());

        if self.can_retry(ceiling) {
            self.status = TransferStatus::Queued;
        } else {
            self.status = TransferStatus::Failed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str) -> MediaCandidate {
        MediaCandidate {
            identifier: id.to_string(),
            local_path: PathBuf::from(format!("/tmp/staging/{}.heic", id)),
            size_bytes: 1_000,
            captured_at: 1_700_000_000,
        }
    }

    #[test]
    fn test_transfer_status_roundtrip() {
        assert_eq!(TransferStatus::Queued.as_str(), "queued");
        assert_eq!(
            "transferring".parse::<TransferStatus>().unwrap(),
            TransferStatus::Transferring
        );
        assert!(TransferStatus::Done.is_terminal());
        assert!(TransferStatus::Failed.is_terminal());
        assert!(TransferStatus::Queued.is_active());
        assert!(!TransferStatus::Done.is_active());
    }

    #[test]
    fn test_item_from_candidate() {
        let item = MediaItem::from_candidate(candidate("asset-1"));
        assert_eq!(item.id.as_str(), "asset-1");
        assert_eq!(item.status, TransferStatus::Queued);
        assert_eq!(item.retry_count, 0);
        assert!(item.remote_handle.is_none());
    }

    #[test]
    fn test_item_complete_records_handle() {
        let mut item = MediaItem::from_candidate(candidate("asset-1"));
        item.start_transfer();
        assert_eq!(item.status, TransferStatus::Transferring);

        item.complete(RemoteHandle::new("node:9"));
        assert_eq!(item.status, TransferStatus::Done);
        assert_eq!(item.remote_handle.as_ref().unwrap().as_str(), "node:9");
    }

    #[test]
    fn test_fail_requeues_until_past_ceiling() {
        let ceiling = 2;
        let mut item = MediaItem::from_candidate(candidate("asset-1"));

        // Failures 1 and 2 re-queue (failing exactly `ceiling` times still
        // re-queues)
        item.fail("timeout", ceiling);
        assert_eq!(item.status, TransferStatus::Queued);
        item.fail("timeout", ceiling);
        assert_eq!(item.status, TransferStatus::Queued);
        assert_eq!(item.retry_count, 2);

        // Failure 3 is permanent
        item.fail("timeout", ceiling);
        assert_eq!(item.status, TransferStatus::Failed);
        assert_eq!(item.retry_count, 3);
        assert_eq!(item.last_error.as_deref(), Some("timeout"));
    }
}
