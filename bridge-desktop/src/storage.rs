//! Storage Inspection over the Local File System

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::{DirectoryKind, StorageInspector},
};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Disk-backed storage inspector
///
/// Resolves the downloads and staging directories under the platform data
/// directory (overridable) and answers free-space queries against the volume
/// holding the staging area. Nothing is cached: every call reflects live
/// system state.
pub struct DiskStorageInspector {
    downloads_dir: PathBuf,
    staging_dir: PathBuf,
}

impl DiskStorageInspector {
    /// Create an inspector with default directories under the platform data dir
    pub fn new() -> Self {
        let base = dirs::data_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("camera-uploads-core");

        Self {
            downloads_dir: base.join("downloads"),
            staging_dir: base.join("staging"),
        }
    }

    /// Create an inspector with custom directories
    pub fn with_directories(downloads_dir: PathBuf, staging_dir: PathBuf) -> Self {
        Self {
            downloads_dir,
            staging_dir,
        }
    }

    fn directory_for(&self, kind: DirectoryKind) -> &Path {
        match kind {
            DirectoryKind::Downloads => &self.downloads_dir,
            DirectoryKind::Staging => &self.staging_dir,
        }
    }

    /// Deepest existing ancestor of the staging directory.
    ///
    /// `available_space` needs a path that exists; before first use the
    /// staging directory itself may not.
    fn capacity_probe_path(&self) -> Option<&Path> {
        let mut probe = self.staging_dir.as_path();
        loop {
            if probe.exists() {
                return Some(probe);
            }
            probe = probe.parent()?;
        }
    }
}

impl Default for DiskStorageInspector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageInspector for DiskStorageInspector {
    async fn free_space_bytes(&self) -> u64 {
        let Some(probe) = self.capacity_probe_path() else {
            warn!(path = ?self.staging_dir, "No existing ancestor for capacity query");
            return 0;
        };

        match fs4::available_space(probe) {
            Ok(bytes) => {
                debug!(path = ?probe, bytes, "Queried free space");
                bytes
            }
            Err(e) => {
                warn!(path = ?probe, error = %e, "Free space query failed, treating as full");
                0
            }
        }
    }

    async fn resolved_directory(&self, kind: DirectoryKind) -> Result<PathBuf> {
        let path = self.directory_for(kind);

        if !path.exists() {
            fs::create_dir_all(path)
                .await
                .map_err(|e| BridgeError::DirectoryUnavailable {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })?;
            debug!(path = ?path, kind = %kind, "Created directory");
        }

        Ok(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir()
            .join("cuc-inspector-tests")
            .join(uuid::Uuid::new_v4().to_string())
    }

    #[tokio::test]
    async fn test_resolved_directory_created_on_first_use() {
        let base = scratch_dir();
        let inspector = DiskStorageInspector::with_directories(
            base.join("downloads"),
            base.join("staging"),
        );

        let staging = inspector
            .resolved_directory(DirectoryKind::Staging)
            .await
            .unwrap();
        assert!(staging.exists());
        assert_eq!(staging, base.join("staging"));

        // Second resolution is a no-op returning the same path
        let again = inspector
            .resolved_directory(DirectoryKind::Staging)
            .await
            .unwrap();
        assert_eq!(again, staging);

        tokio::fs::remove_dir_all(&base).await.unwrap();
    }

    #[tokio::test]
    async fn test_free_space_nonzero_on_real_volume() {
        let base = scratch_dir();
        let inspector = DiskStorageInspector::with_directories(
            base.join("downloads"),
            base.join("staging"),
        );

        // Staging does not exist yet; the probe walks up to an existing
        // ancestor (the temp dir) and still answers.
        let free = inspector.free_space_bytes().await;
        assert!(free > 0);
    }

    #[tokio::test]
    async fn test_storage_report_aggregates_both_paths() {
        let base = scratch_dir();
        let inspector = DiskStorageInspector::with_directories(
            base.join("downloads"),
            base.join("staging"),
        );

        let report = inspector.storage_report().await.unwrap();
        assert_eq!(report.downloads_dir, base.join("downloads"));
        assert_eq!(report.staging_dir, base.join("staging"));
        assert!(report.downloads_dir.exists());
        assert!(report.staging_dir.exists());

        tokio::fs::remove_dir_all(&base).await.unwrap();
    }
}
