//! Local Storage Abstractions
//!
//! Provides platform-agnostic traits for inspecting device storage and for
//! cleaning up staged media files. Any concrete backend (local disk,
//! sandboxed app container, network volume) can satisfy these two contracts.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Well-known directories the upload feature works with.
///
/// The exact on-disk names are a configuration detail of the implementation;
/// callers only ever ask for a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DirectoryKind {
    /// Directory for files fetched from remote storage.
    Downloads,
    /// Local holding area for media awaiting or pending confirmation of upload.
    Staging,
}

impl DirectoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Downloads => "downloads",
            Self::Staging => "staging",
        }
    }
}

impl std::fmt::Display for DirectoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Point-in-time view of device storage.
///
/// Recomputed on demand, never cached: free space changes underneath us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageReport {
    /// Free space on the file system holding the staging area, in bytes.
    pub free_space_bytes: u64,
    /// Resolved downloads directory.
    pub downloads_dir: PathBuf,
    /// Resolved staging directory.
    pub staging_dir: PathBuf,
}

/// Storage inspection trait
///
/// Reports free space and resolves the well-known directories. Every call
/// reflects live system state; implementations must not cache across calls.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::{DirectoryKind, StorageInspector};
///
/// async fn has_headroom(inspector: &dyn StorageInspector, need: u64) -> bool {
///     inspector.free_space_bytes().await >= need
/// }
/// ```
#[async_trait]
pub trait StorageInspector: Send + Sync {
    /// Amount of free space on the underlying file system, in bytes.
    ///
    /// A query error collapses to 0 rather than propagating; "no space" is
    /// the safe default for upload admission.
    async fn free_space_bytes(&self) -> u64;

    /// Resolve a well-known directory, creating it on first use.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::DirectoryUnavailable` if the OS denies creation.
    async fn resolved_directory(&self, kind: DirectoryKind) -> Result<PathBuf>;

    /// Aggregate report of free space plus both resolved directories.
    async fn storage_report(&self) -> Result<StorageReport> {
        Ok(StorageReport {
            free_space_bytes: self.free_space_bytes().await,
            downloads_dir: self.resolved_directory(DirectoryKind::Downloads).await?,
            staging_dir: self.resolved_directory(DirectoryKind::Staging).await?,
        })
    }
}

/// Result of a folder purge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeOutcome {
    /// Entries actually removed.
    pub removed: u64,
    /// Entries that matched but could not be removed (permissions, in use).
    pub failed: u64,
}

impl PurgeOutcome {
    /// Merge another outcome into this one.
    pub fn absorb(&mut self, other: PurgeOutcome) {
        self.removed += other.removed;
        self.failed += other.failed;
    }
}

/// File cleanup trait
///
/// Deletes individual files/folders and purges folder contents by filter.
/// All operations are fail-soft: an entry that cannot be deleted is skipped
/// and counted, never aborting the remaining purge. A purge never deletes
/// the folder itself, only its contents.
///
/// The substring and extension filters are deliberately separate operations;
/// there is no combined filter semantic.
#[async_trait]
pub trait FileJanitor: Send + Sync {
    /// Best-effort removal of a single file or folder.
    ///
    /// Returns whether the target is absent afterwards: `true` for a
    /// successful delete or an already-missing path, `false` when the entry
    /// survived. Failures are logged by the implementation, never raised;
    /// callers that care (e.g. post-upload cleanup) inspect the flag.
    async fn remove(&self, path: &Path) -> bool;

    /// Delete every direct child of `folder`.
    async fn purge_folder(&self, folder: &Path) -> PurgeOutcome;

    /// Delete direct children of `folder` whose name contains `fragment`.
    async fn purge_folder_containing(&self, folder: &Path, fragment: &str) -> PurgeOutcome;

    /// Recursively delete entries under `folder` whose name contains
    /// `fragment`, descending into non-matching subfolders.
    async fn purge_folder_recursive_containing(
        &self,
        folder: &Path,
        fragment: &str,
    ) -> PurgeOutcome;

    /// Recursively delete files under `folder` with the given extension
    /// (matched case-insensitively, without the leading dot).
    async fn purge_folder_recursive_with_extension(
        &self,
        folder: &Path,
        extension: &str,
    ) -> PurgeOutcome;
}
