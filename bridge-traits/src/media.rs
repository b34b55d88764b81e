//! Device Media Source Abstraction
//!
//! Supplies upload candidates discovered on the device. The core never
//! enumerates the photo library itself; the host pushes what it finds
//! through this trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;

/// A photo or video the device has staged for backup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaCandidate {
    /// Stable device-local identifier for the capture.
    pub identifier: String,
    /// Path to the staged file on local disk.
    pub local_path: PathBuf,
    /// File size in bytes.
    pub size_bytes: u64,
    /// Capture timestamp (Unix epoch seconds).
    pub captured_at: i64,
}

/// Device media source trait
///
/// # Contract
///
/// - `pending_media` returns every candidate not yet confirmed uploaded, in
///   capture order. Returning an item the core already tracks is harmless;
///   enqueue is idempotent by identifier.
/// - Implementations own staging (export from the asset library into the
///   staging directory) before a candidate appears here.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// List candidates currently awaiting upload.
    async fn pending_media(&self) -> Result<Vec<MediaCandidate>>;
}
