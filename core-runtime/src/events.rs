//! # Event Bus System
//!
//! Provides an event-driven architecture for the upload core using
//! `tokio::sync::broadcast`. Modules publish typed events; the presentation
//! adapter (and anything else) subscribes without coupling to the emitters.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: Strongly-typed enum hierarchies for each domain
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Wrapper for consuming events with filtering
//! - **Subscription Management**: Multiple subscribers listen independently
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, UploadEvent};
//!
//! let event_bus = EventBus::new(100);
//! let mut subscriber = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Upload(UploadEvent::StateChanged {
//!         session_id: "session-1".to_string(),
//!         state: "uploading".to_string(),
//!         queued: 2,
//!         in_flight: 1,
//!         failed: 0,
//!         completed: 0,
//!     }))
//!     .ok();
//! ```
//!
//! ## Error Handling
//!
//! The bus uses `tokio::sync::broadcast`, which produces two receive errors:
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events. Non-fatal;
//!   it keeps receiving new events.
//! - **`RecvError::Closed`**: all senders dropped; treat as shutdown.
//!
//! ## Thread Safety
//!
//! The event bus is fully thread-safe (`Send + Sync`) and cheap to clone;
//! share it across tasks with `Arc` or by value.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// Balances memory usage with the ability to absorb bursts of transfer
/// completions. Subscribers that can't keep up receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Camera-upload lifecycle events
    Upload(UploadEvent),
    /// Local storage maintenance events
    Maintenance(MaintenanceEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Upload(e) => e.description(),
            CoreEvent::Maintenance(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Upload(UploadEvent::ItemFailedPermanently { .. }) => EventSeverity::Error,
            CoreEvent::Maintenance(MaintenanceEvent::CleanupFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Upload(UploadEvent::StateChanged { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Upload Events
// ============================================================================

/// Events emitted by the camera-upload state machine and queue.
///
/// Payloads are plain values (ids and counts as strings/integers) so the
/// bus stays decoupled from the `core-upload` types that produce them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum UploadEvent {
    /// The derived upload state changed, with the snapshot that triggered it.
    StateChanged {
        /// Upload session the transition belongs to.
        session_id: String,
        /// New state (`disabled`, `uploading`, `completed`,
        /// `no_internet_connection`, `empty`, `loading`).
        state: String,
        /// Items waiting to transfer.
        queued: u64,
        /// Items currently transferring.
        in_flight: u64,
        /// Items failed permanently this session.
        failed: u64,
        /// Items completed this session.
        completed: u64,
    },
    /// One item finished uploading and its local file was cleaned up.
    ItemCompleted {
        /// Device-local item identifier.
        item_id: String,
        /// Remote node handle assigned by the transfer service.
        remote_handle: String,
        /// Bytes transferred.
        size_bytes: u64,
    },
    /// One item exhausted its retry ceiling and will not re-queue.
    ItemFailedPermanently {
        /// Device-local item identifier.
        item_id: String,
        /// Last transfer error message.
        message: String,
        /// Total attempts made.
        attempts: u32,
    },
}

impl UploadEvent {
    fn description(&self) -> &str {
        match self {
            UploadEvent::StateChanged { .. } => "Upload state changed",
            UploadEvent::ItemCompleted { .. } => "Media item uploaded",
            UploadEvent::ItemFailedPermanently { .. } => "Media item failed permanently",
        }
    }
}

// ============================================================================
// Maintenance Events
// ============================================================================

/// Events emitted by local storage maintenance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum MaintenanceEvent {
    /// A folder purge finished.
    PurgeCompleted {
        /// Folder that was purged.
        folder: String,
        /// Entries removed.
        removed: u64,
        /// Entries that could not be removed.
        failed: u64,
    },
    /// A post-upload cleanup could not delete the local file.
    ///
    /// The item still counts as uploaded; a leftover local file is
    /// preferable to re-uploading it.
    CleanupFailed {
        /// Path that survived deletion.
        path: String,
        /// Why the deletion failed.
        message: String,
    },
}

impl MaintenanceEvent {
    fn description(&self) -> &str {
        match self {
            MaintenanceEvent::PurgeCompleted { .. } => "Folder purge completed",
            MaintenanceEvent::CleanupFailed { .. } => "Local cleanup failed",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Uses `tokio::sync::broadcast` internally, which provides:
/// - Multiple producers (clone the `EventBus`)
/// - Multiple consumers (each `subscribe()` creates a new receiver)
/// - Non-blocking sends (events are cloned for each subscriber)
/// - Lagging detection (slow subscribers get `RecvError::Lagged`)
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of events buffered per subscriber.
    ///   A subscriber falling behind by more than this receives
    ///   `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Creates a new event bus with the default buffer size.
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error if there are no active subscribers.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive events.
    ///
    /// Each call creates an independent receiver that will receive all
    /// future events. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

/// Type alias for event filter functions.
type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with additional filtering
/// capabilities: subscribe once, then keep only the events you care about.
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Adds a filter function to this stream.
    ///
    /// Only events matching the filter are returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n`
    /// events, `RecvError::Closed` once all senders are gone.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;

            let Some(filter) = &self.filter else {
                return Ok(event);
            };

            if filter(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no matching events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    let Some(filter) = &self.filter else {
                        return Some(Ok(event));
                    };

                    if filter(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
