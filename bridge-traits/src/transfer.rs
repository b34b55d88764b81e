//! Remote Transfer Abstraction
//!
//! The boundary to whatever service carries bytes to remote storage. The
//! core submits a local path and receives a remote handle or a failure;
//! backoff policy beyond the queue's retry ceiling lives behind this trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

/// Opaque identifier of a node in remote storage, assigned on upload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteHandle(String);

impl RemoteHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RemoteHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Remote transfer service trait
///
/// # Contract
///
/// - `upload` reads the file at `local_path` and transfers it to the
///   destination the implementation is configured for.
/// - On success it returns the handle of the created remote node.
/// - A failed transfer surfaces as `BridgeError::TransferFailed`; the caller
///   decides whether to retry.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::transfer::TransferService;
///
/// async fn push(svc: &dyn TransferService, path: &std::path::Path) {
///     match svc.upload(path).await {
///         Ok(handle) => tracing::info!(%handle, "uploaded"),
///         Err(e) => tracing::warn!(error = %e, "upload failed"),
///     }
/// }
/// ```
#[async_trait]
pub trait TransferService: Send + Sync {
    /// Transfer the file at `local_path` to remote storage.
    async fn upload(&self, local_path: &Path) -> Result<RemoteHandle>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_handle_roundtrip() {
        let handle = RemoteHandle::new("node:abc123");
        assert_eq!(handle.as_str(), "node:abc123");
        assert_eq!(handle.to_string(), "node:abc123");
    }
}
