//! Whole-tree status classification.
//!
//! Every tracked file under the shared root is mapped back to its local
//! path and placed in exactly one group.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use serde::Serialize;

use share_core::{Decision, PathMapper, ShareError, decide};
use share_scan::{SharedFile, local_state};

/// Status group of a tracked file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// Both sides agree within the tolerance.
    Synced,
    /// Local is newer.
    NeedPush,
    /// Shared is newer.
    NeedPull,
    /// No local counterpart.
    OnlyShared,
}

impl SyncState {
    /// Classify a tracked file from its local mtime (if any) and shared mtime.
    pub fn classify(local: Option<SystemTime>, shared: SystemTime, tolerance: Duration) -> Self {
        match decide(local, Some(shared), tolerance) {
            Decision::PushNewer => Self::NeedPush,
            Decision::PullNewer => Self::NeedPull,
            Decision::PullNew => Self::OnlyShared,
            _ => Self::Synced,
        }
    }
}

/// Grouped status of the whole shared tree.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusReport {
    /// Shared root, rendered.
    pub shared_root: String,
    /// Local root, if configured.
    pub local_root: Option<PathBuf>,
    /// Local paths of synced files.
    pub synced: Vec<PathBuf>,
    /// Local paths that are newer than their shared copy.
    pub need_push: Vec<PathBuf>,
    /// Local paths whose shared copy is newer.
    pub need_pull: Vec<PathBuf>,
    /// Local paths that do not exist yet.
    pub only_shared: Vec<PathBuf>,
}

impl StatusReport {
    /// Classify every listed shared file.
    pub fn build(
        mapper: &PathMapper,
        files: &[SharedFile],
        tolerance: Duration,
    ) -> Result<Self, ShareError> {
        let mut report = Self {
            shared_root: mapper.shared_root().to_string(),
            local_root: mapper.local_root().map(PathBuf::from),
            ..Default::default()
        };

        for file in files {
            let local = mapper.local_for(&file.relative);
            let local_mtime = local_state(&local)?.map(|s| s.modified);
            let group = match SyncState::classify(local_mtime, file.state.modified, tolerance) {
                SyncState::Synced => &mut report.synced,
                SyncState::NeedPush => &mut report.need_push,
                SyncState::NeedPull => &mut report.need_pull,
                SyncState::OnlyShared => &mut report.only_shared,
            };
            group.push(local);
        }

        Ok(report)
    }

    /// Number of tracked files.
    pub fn total(&self) -> usize {
        self.synced.len() + self.need_push.len() + self.need_pull.len() + self.only_shared.len()
    }

    /// Check if nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Check if every tracked file is synced.
    pub fn is_clean(&self) -> bool {
        self.need_push.is_empty() && self.need_pull.is_empty() && self.only_shared.is_empty()
    }
}
