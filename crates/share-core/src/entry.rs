//! Managed entry: one local path and its shared counterpart.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use crate::decision::{Decision, decide};
use crate::location::Location;

/// Observed state of one side of a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SideState {
    /// Last modification time.
    pub modified: SystemTime,
    /// Size in bytes, when known.
    pub size: Option<u64>,
}

impl SideState {
    /// Create a side state.
    pub fn new(modified: SystemTime, size: Option<u64>) -> Self {
        Self { modified, size }
    }
}

/// A local path, its shared location and what was observed on both sides.
///
/// Built fresh for each decision and dropped afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedEntry {
    /// Local path as named (or as mapped back from the shared tree).
    pub local: PathBuf,
    /// Mapped shared location.
    pub shared: Location,
    /// Local side, if it exists as a regular file.
    pub local_state: Option<SideState>,
    /// Shared side, if it exists.
    pub shared_state: Option<SideState>,
}

impl ManagedEntry {
    /// Create an entry from observed states.
    pub fn new(
        local: PathBuf,
        shared: Location,
        local_state: Option<SideState>,
        shared_state: Option<SideState>,
    ) -> Self {
        Self {
            local,
            shared,
            local_state,
            shared_state,
        }
    }

    /// Whether the local side exists.
    pub fn local_exists(&self) -> bool {
        self.local_state.is_some()
    }

    /// Whether the shared side exists.
    pub fn shared_exists(&self) -> bool {
        self.shared_state.is_some()
    }

    /// Local modification time.
    pub fn local_mtime(&self) -> Option<SystemTime> {
        self.local_state.map(|s| s.modified)
    }

    /// Shared modification time.
    pub fn shared_mtime(&self) -> Option<SystemTime> {
        self.shared_state.map(|s| s.modified)
    }

    /// Classify this entry.
    pub fn decision(&self, tolerance: Duration) -> Decision {
        decide(self.local_mtime(), self.shared_mtime(), tolerance)
    }
}
