//! # Camera-Upload State Machine
//!
//! The six observable states of the camera-backup feature and the pure
//! reducer that derives the active one from three inputs: the user toggle,
//! reachability, and the queue snapshot.
//!
//! ## State Derivation
//!
//! ```text
//! enabled? ──no──────────────────────────▶ Disabled
//!    │yes
//! reachable? ──no───────────────────────▶ NoInternetConnection
//!    │yes
//! snapshot? ──none──────────────────────▶ Loading
//!    │some
//! active work (queued + in-flight)? ─yes▶ Uploading
//!    │none
//! completed this session? ──yes─────────▶ Completed
//!    │no
//!    ▼
//!  Empty
//! ```
//!
//! `Disabled` and `NoInternetConnection` take precedence over every
//! queue-derived state; `Loading` is transient and resolves as soon as a
//! real snapshot exists. The reducer performs no I/O and never fails: a
//! valid state exists for every input combination.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::UploadError;
use crate::queue::QueueSnapshot;

/// Observable state of the camera-upload feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadState {
    /// Feature toggled off by user/config
    Disabled,
    /// Transfers pending or in flight
    Uploading,
    /// Queue drained with at least one completion this session
    Completed,
    /// No usable network path
    NoInternetConnection,
    /// Nothing to upload and nothing uploaded yet
    Empty,
    /// Queue snapshot not yet available
    Loading,
}

impl UploadState {
    /// Derive the state from the three reducer inputs.
    ///
    /// Computed fresh on every triggering event; never mutated in place.
    /// Permanently failed items are not active work; they surface only
    /// through the snapshot's `failed` count.
    pub fn derive(enabled: bool, reachable: bool, snapshot: Option<&QueueSnapshot>) -> Self {
        if !enabled {
            return Self::Disabled;
        }

        if !reachable {
            return Self::NoInternetConnection;
        }

        let Some(snapshot) = snapshot else {
            return Self::Loading;
        };

        if snapshot.active() > 0 {
            Self::Uploading
        } else if snapshot.completed > 0 {
            Self::Completed
        } else {
            Self::Empty
        }
    }

    /// String representation for events and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Uploading => "uploading",
            Self::Completed => "completed",
            Self::NoInternetConnection => "no_internet_connection",
            Self::Empty => "empty",
            Self::Loading => "loading",
        }
    }
}

impl FromStr for UploadState {
    type Err = UploadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "disabled" => Ok(Self::Disabled),
            "uploading" => Ok(Self::Uploading),
            "completed" => Ok(Self::Completed),
            "no_internet_connection" => Ok(Self::NoInternetConnection),
            "empty" => Ok(Self::Empty),
            "loading" => Ok(Self::Loading),
            _ => Err(UploadError::Internal(format!(
                "Invalid upload state: {}",
                s
            ))),
        }
    }
}

impl std::fmt::Display for UploadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(queued: u64, in_flight: u64, failed: u64, completed: u64) -> QueueSnapshot {
        QueueSnapshot {
            queued,
            in_flight,
            failed,
            completed,
        }
    }

    #[test]
    fn test_disabled_wins_over_everything() {
        let busy = snapshot(3, 2, 1, 4);
        assert_eq!(
            UploadState::derive(false, true, Some(&busy)),
            UploadState::Disabled
        );
        assert_eq!(
            UploadState::derive(false, false, Some(&busy)),
            UploadState::Disabled
        );
        assert_eq!(UploadState::derive(false, true, None), UploadState::Disabled);
    }

    #[test]
    fn test_no_internet_wins_over_queue_states() {
        // Regardless of queue contents, a dead network reads as offline
        for snap in [
            snapshot(0, 0, 0, 0),
            snapshot(5, 0, 0, 0),
            snapshot(0, 2, 0, 0),
            snapshot(0, 0, 0, 7),
        ] {
            assert_eq!(
                UploadState::derive(true, false, Some(&snap)),
                UploadState::NoInternetConnection
            );
        }
        assert_eq!(
            UploadState::derive(true, false, None),
            UploadState::NoInternetConnection
        );
    }

    #[test]
    fn test_loading_until_snapshot_available() {
        assert_eq!(UploadState::derive(true, true, None), UploadState::Loading);

        // Loading is transient: any real snapshot resolves it
        let empty = snapshot(0, 0, 0, 0);
        assert_ne!(
            UploadState::derive(true, true, Some(&empty)),
            UploadState::Loading
        );
    }

    #[test]
    fn test_active_work_reads_as_uploading() {
        assert_eq!(
            UploadState::derive(true, true, Some(&snapshot(3, 0, 0, 0))),
            UploadState::Uploading
        );
        assert_eq!(
            UploadState::derive(true, true, Some(&snapshot(0, 1, 0, 0))),
            UploadState::Uploading
        );
        assert_eq!(
            UploadState::derive(true, true, Some(&snapshot(2, 2, 1, 3))),
            UploadState::Uploading
        );
    }

    #[test]
    fn test_drained_with_completions_is_completed() {
        assert_eq!(
            UploadState::derive(true, true, Some(&snapshot(0, 0, 0, 3))),
            UploadState::Completed
        );
        // Permanent failures do not demote Completed
        assert_eq!(
            UploadState::derive(true, true, Some(&snapshot(0, 0, 2, 1))),
            UploadState::Completed
        );
    }

    #[test]
    fn test_drained_without_completions_is_empty() {
        assert_eq!(
            UploadState::derive(true, true, Some(&snapshot(0, 0, 0, 0))),
            UploadState::Empty
        );
        // Only permanent failures, nothing completed
        assert_eq!(
            UploadState::derive(true, true, Some(&snapshot(0, 0, 2, 0))),
            UploadState::Empty
        );
    }

    #[test]
    fn test_state_string_roundtrip() {
        for state in [
            UploadState::Disabled,
            UploadState::Uploading,
            UploadState::Completed,
            UploadState::NoInternetConnection,
            UploadState::Empty,
            UploadState::Loading,
        ] {
            assert_eq!(state.as_str().parse::<UploadState>().unwrap(), state);
        }
        assert!("paused".parse::<UploadState>().is_err());
    }

    #[test]
    fn test_serde_matches_as_str() {
        let json = serde_json::to_string(&UploadState::NoInternetConnection).unwrap();
        assert_eq!(json, "\"no_internet_connection\"");
    }
}
