//! Fail-Soft File Cleanup over the Local File System

use async_trait::async_trait;
use bridge_traits::storage::{FileJanitor, PurgeOutcome};
use std::ffi::OsStr;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use tokio::fs;
use tracing::{debug, warn};

/// Disk-backed file janitor
///
/// Every operation is best-effort: a missing target is fine, and an entry
/// that cannot be deleted is skipped and counted without aborting the rest
/// of the purge. The purged folder itself is always left in place.
pub struct DiskFileJanitor;

impl DiskFileJanitor {
    pub fn new() -> Self {
        Self
    }

    /// Delete one entry, file or folder. Returns whether anything was removed.
    async fn delete_entry(path: &Path, is_dir: bool) -> Option<bool> {
        let result = if is_dir {
            fs::remove_dir_all(path).await
        } else {
            fs::remove_file(path).await
        };

        match result {
            Ok(()) => {
                debug!(path = ?path, "Deleted entry");
                Some(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = ?path, "Entry already absent");
                None
            }
            Err(e) => {
                warn!(path = ?path, error = %e, "Failed to delete entry");
                Some(false)
            }
        }
    }

    /// Purge direct children of `folder` whose name satisfies `matches`.
    async fn purge_children<F>(folder: &Path, matches: F) -> PurgeOutcome
    where
        F: Fn(&OsStr) -> bool,
    {
        let mut outcome = PurgeOutcome::default();

        let mut read_dir = match fs::read_dir(folder).await {
            Ok(rd) => rd,
            Err(e) => {
                warn!(path = ?folder, error = %e, "Cannot enumerate folder");
                return outcome;
            }
        };

        loop {
            let entry = match read_dir.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(path = ?folder, error = %e, "Folder enumeration interrupted");
                    outcome.failed += 1;
                    break;
                }
            };

            if !matches(entry.file_name().as_os_str()) {
                continue;
            }

            let is_dir = entry
                .file_type()
                .await
                .map(|t| t.is_dir())
                .unwrap_or(false);

            match Self::delete_entry(&entry.path(), is_dir).await {
                Some(true) => outcome.removed += 1,
                Some(false) => outcome.failed += 1,
                None => {}
            }
        }

        outcome
    }
}

impl Default for DiskFileJanitor {
    fn default() -> Self {
        Self::new()
    }
}

/// Recursive purge filter. Substring and extension matching stay separate
/// operations; no combined semantic exists.
#[derive(Clone, Copy)]
enum RecursiveFilter<'a> {
    NameContains(&'a str),
    Extension(&'a str),
}

impl RecursiveFilter<'_> {
    fn matches(&self, name: &OsStr) -> bool {
        let Some(name) = name.to_str() else {
            return false;
        };
        match self {
            Self::NameContains(fragment) => name.contains(fragment),
            Self::Extension(extension) => Path::new(name)
                .extension()
                .and_then(OsStr::to_str)
                .is_some_and(|ext| ext.eq_ignore_ascii_case(extension)),
        }
    }

    /// Whether a matching directory is deleted wholesale. Extension matching
    /// applies to files only; directories are always descended into.
    fn deletes_directories(&self) -> bool {
        matches!(self, Self::NameContains(_))
    }
}

fn purge_recursive<'a>(
    folder: &'a Path,
    filter: RecursiveFilter<'a>,
) -> Pin<Box<dyn Future<Output = PurgeOutcome> + Send + 'a>> {
    Box::pin(async move {
        let mut outcome = PurgeOutcome::default();

        let mut read_dir = match fs::read_dir(folder).await {
            Ok(rd) => rd,
            Err(e) => {
                warn!(path = ?folder, error = %e, "Cannot enumerate folder");
                return outcome;
            }
        };

        loop {
            let entry = match read_dir.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(path = ?folder, error = %e, "Folder enumeration interrupted");
                    outcome.failed += 1;
                    break;
                }
            };

            let is_dir = entry
                .file_type()
                .await
                .map(|t| t.is_dir())
                .unwrap_or(false);
            let name = entry.file_name();

            let delete_here = filter.matches(name.as_os_str())
                && (!is_dir || filter.deletes_directories());

            if delete_here {
                match DiskFileJanitor::delete_entry(&entry.path(), is_dir).await {
                    Some(true) => outcome.removed += 1,
                    Some(false) => outcome.failed += 1,
                    None => {}
                }
            } else if is_dir {
                outcome.absorb(purge_recursive(&entry.path(), filter).await);
            }
        }

        outcome
    })
}

#[async_trait]
impl FileJanitor for DiskFileJanitor {
    async fn remove(&self, path: &Path) -> bool {
        let is_dir = match fs::symlink_metadata(path).await {
            Ok(meta) => meta.is_dir(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return true,
            Err(e) => {
                warn!(path = ?path, error = %e, "Cannot stat entry for removal");
                return false;
            }
        };

        match Self::delete_entry(path, is_dir).await {
            Some(removed) => removed,
            None => true,
        }
    }

    async fn purge_folder(&self, folder: &Path) -> PurgeOutcome {
        Self::purge_children(folder, |_| true).await
    }

    async fn purge_folder_containing(&self, folder: &Path, fragment: &str) -> PurgeOutcome {
        Self::purge_children(folder, |name| {
            name.to_str().is_some_and(|n| n.contains(fragment))
        })
        .await
    }

    async fn purge_folder_recursive_containing(
        &self,
        folder: &Path,
        fragment: &str,
    ) -> PurgeOutcome {
        purge_recursive(folder, RecursiveFilter::NameContains(fragment)).await
    }

    async fn purge_folder_recursive_with_extension(
        &self,
        folder: &Path,
        extension: &str,
    ) -> PurgeOutcome {
        let extension = extension.trim_start_matches('.');
        purge_recursive(folder, RecursiveFilter::Extension(extension)).await
    }
}
