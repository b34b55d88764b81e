//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the upload core and
//! platform-specific implementations. Each trait represents a capability the
//! core requires but that must be implemented differently per platform
//! (desktop, iOS, Android).
//!
//! ## Traits
//!
//! ### Storage
//! - [`StorageInspector`](storage::StorageInspector) - Free space and well-known directory resolution
//! - [`FileJanitor`](storage::FileJanitor) - Fail-soft file removal and folder purges
//!
//! ### Platform Integration
//! - [`NetworkMonitor`](network::NetworkMonitor) - Connectivity and metered network detection
//! - [`TransferService`](transfer::TransferService) - Remote upload boundary
//! - [`MediaSource`](media::MediaSource) - Device media candidates awaiting backup
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type for
//! consistent error handling. Platform implementations should:
//!
//! - Convert platform-specific errors to `BridgeError`
//! - Provide actionable error messages
//! - Include error context (e.g., file paths, network status)
//!
//! The storage traits additionally absorb local I/O errors at their own
//! boundary: a free-space query error reads as 0 and a failed deletion is
//! counted, so state derivation upstream never has to handle a thrown
//! storage error.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds to support safe concurrent
//! usage across async tasks. Implementations must ensure thread safety.

pub mod error;
pub mod media;
pub mod network;
pub mod storage;
pub mod transfer;

pub use error::BridgeError;

// Re-export commonly used types
pub use media::{MediaCandidate, MediaSource};
pub use network::{NetworkInfo, NetworkMonitor, NetworkStatus, NetworkType};
pub use storage::{DirectoryKind, FileJanitor, PurgeOutcome, StorageInspector, StorageReport};
pub use transfer::{RemoteHandle, TransferService};
