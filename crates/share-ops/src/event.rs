//! Structured events emitted while running a command.
//!
//! The runner never prints; front ends render these however they like.

use std::path::PathBuf;

use share_analyze::AuditFinding;
use share_core::{Decision, Direction, Location, ManagedEntry, ShareError};
use share_scan::SkipReason;

use crate::operation::ShareOp;

/// Something that happened to one entry.
#[derive(Debug)]
pub enum SyncEvent {
    /// A file was copied, or would be in preview mode.
    Transferred {
        op: ShareOp,
        local: PathBuf,
        shared: Location,
        direction: Direction,
        /// `None` for unconditional copies (`put`, `get`).
        decision: Option<Decision>,
        preview: bool,
    },
    /// The decision called for no copy under this command.
    Unchanged {
        op: ShareOp,
        local: PathBuf,
        decision: Decision,
    },
    /// The ignore matcher skipped an entry.
    Skipped { path: PathBuf, reason: SkipReason },
    /// Result of `check`.
    Checked { entry: ManagedEntry, decision: Decision },
    /// The shared copy was removed, or would be in preview mode.
    Removed {
        local: PathBuf,
        shared: Location,
        pruned: usize,
        preview: bool,
    },
    /// `rm` named a path that has no shared copy.
    NotShared { local: PathBuf },
    /// Audit verdict for one entry.
    Audited(AuditFinding),
    /// The local shared root did not exist and was created.
    RootCreated { root: PathBuf, preview: bool },
    /// An entry failed. Counted, never fatal to the rest of the run.
    Failed { path: PathBuf, error: ShareError },
}

impl SyncEvent {
    /// Check if this event reports a failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Receives events as they happen.
pub trait EventSink {
    /// Handle one event.
    fn emit(&mut self, event: SyncEvent);
}

impl EventSink for Vec<SyncEvent> {
    fn emit(&mut self, event: SyncEvent) {
        self.push(event);
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn emit(&mut self, event: SyncEvent) {
        (**self).emit(event);
    }
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: SyncEvent) {}
}
