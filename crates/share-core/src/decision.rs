//! Newer-wins decision policy.
//!
//! A pair is classified from which sides exist and, when both do, from their
//! modification times. Two times are "the same" unless one is ahead of the
//! other by more than the tolerance.

use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use strum::Display;

/// Direction of a copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    /// Local → shared.
    Push,
    /// Shared → local.
    Pull,
}

/// Which branches of the decision a command is allowed to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncMode {
    /// Only push branches (`push`, `pushall`).
    Push,
    /// Only pull branches (`pull`, `pullall`).
    Pull,
    /// Whatever the decision selects (`sync`, `syncall`).
    Both,
}

/// Outcome of comparing a local/shared pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    /// Only the local side exists.
    PushNew,
    /// Only the shared side exists.
    PullNew,
    /// Both exist and local is newer beyond the tolerance.
    PushNewer,
    /// Both exist and shared is newer beyond the tolerance.
    PullNewer,
    /// Both exist within the tolerance of each other.
    Synced,
    /// Neither side exists.
    Neither,
}

impl Decision {
    /// The copy this decision calls for, if any.
    pub fn direction(self) -> Option<Direction> {
        match self {
            Self::PushNew | Self::PushNewer => Some(Direction::Push),
            Self::PullNew | Self::PullNewer => Some(Direction::Pull),
            Self::Synced | Self::Neither => None,
        }
    }

    /// The copy to perform under `mode`. Branches outside the mode are no-ops.
    pub fn action(self, mode: SyncMode) -> Option<Direction> {
        match (mode, self.direction()) {
            (SyncMode::Both, dir) => dir,
            (SyncMode::Push, Some(Direction::Push)) => Some(Direction::Push),
            (SyncMode::Pull, Some(Direction::Pull)) => Some(Direction::Pull),
            _ => None,
        }
    }

    /// Whether the counterpart was absent before the copy.
    pub fn is_new(self) -> bool {
        matches!(self, Self::PushNew | Self::PullNew)
    }

    /// Short reason used in status lines.
    pub fn reason(self) -> &'static str {
        match self {
            Self::PushNew | Self::PullNew => "new",
            Self::PushNewer => "local newer",
            Self::PullNewer => "shared newer",
            Self::Synced => "synced",
            Self::Neither => "missing",
        }
    }
}

/// `t1` is newer than `t2` by strictly more than `tolerance`.
pub fn is_newer(t1: SystemTime, t2: SystemTime, tolerance: Duration) -> bool {
    t1.duration_since(t2)
        .map(|ahead| ahead > tolerance)
        .unwrap_or(false)
}

/// Classify a pair from the mtimes of the sides that exist.
///
/// `None` means that side does not exist.
pub fn decide(local: Option<SystemTime>, shared: Option<SystemTime>, tolerance: Duration) -> Decision {
    match (local, shared) {
        (None, None) => Decision::Neither,
        (Some(_), None) => Decision::PushNew,
        (None, Some(_)) => Decision::PullNew,
        (Some(local), Some(shared)) => {
            if is_newer(local, shared, tolerance) {
                Decision::PushNewer
            } else if is_newer(shared, local, tolerance) {
                Decision::PullNewer
            } else {
                Decision::Synced
            }
        }
    }
}
