//! # Camera Uploads Module
//!
//! The core of the camera-backup feature: deciding, from connectivity,
//! available local storage, and pending media, what state the feature is
//! in, and coordinating enqueuing, uploading, and cleanup of media files
//! without data loss or duplicate work.
//!
//! ## Components
//!
//! - **Media Item** (`item`): one capture tracked from enqueue to durable
//!   upload, with validated status transitions and retry bookkeeping
//! - **Upload Queue** (`queue`): single-owner work queue with idempotent
//!   enqueue, compare-and-swap claiming, a retry ceiling, and post-upload
//!   cleanup through the file janitor
//! - **State Machine** (`state`): the six observable states and the pure
//!   reducer deriving the active one from (enabled, reachable, snapshot)
//! - **Coordinator** (`coordinator`): wires the signals together, drives
//!   bounded transfer workers, and emits state transitions on the event bus

pub mod coordinator;
pub mod error;
pub mod item;
pub mod queue;
pub mod state;

pub use coordinator::{CameraUploadCoordinator, UploadConfig};
pub use error::{Result, UploadError};
pub use item::{MediaItem, MediaItemId, TransferStatus};
pub use queue::{CompletedUpload, FailureDisposition, QueueSnapshot, UploadQueue};
pub use state::UploadState;
