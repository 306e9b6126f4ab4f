//! Mutating operations for share.
//!
//! This crate runs share commands: it walks named paths or the shared tree,
//! applies the newer-wins decision to each entry, executes the resulting
//! copies and removals, and reports everything as [`SyncEvent`]s.
//!
//! Every command honors preview mode, in which decisions are computed and
//! reported but nothing on disk (or on a remote host) changes.

mod event;
mod operation;
mod runner;
mod transfer;

pub use event::{EventSink, NullSink, SyncEvent};
pub use operation::ShareOp;
pub use runner::{RunSummary, Runner};
pub use transfer::{Transfer, copy_local, prune_empty_parents, remove_shadow};
