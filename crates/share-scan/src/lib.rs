//! Read-only filesystem inspection for share.
//!
//! This crate walks local trees and looks at both sides of managed pairs,
//! without ever modifying anything.
//!
//! # Overview
//!
//! - **Ignore rules** from `.shareignore` files, inherited downward only
//! - **Private-name heuristic** for `_`, `~`, `.`, `#` and `._` prefixes
//! - **Traversal** in skipping or no-skip mode, summing per-entry failures
//! - **Probing** of local and shared (local or remote) file state
//! - **Shared-tree listing** for whole-tree operations
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use share_scan::{IgnoreRules, TreeWalker, Visit, Visitor};
//!
//! struct Print;
//!
//! impl Visitor for Print {
//!     fn visit(&mut self, visit: Visit<'_>) -> usize {
//!         println!("{}", visit.path.display());
//!         0
//!     }
//! }
//!
//! let failures = TreeWalker::skipping().apply(&mut Print, Path::new("."), &IgnoreRules::new());
//! assert_eq!(failures, 0);
//! ```

mod ignore;
mod probe;
mod shared_tree;
mod walk;

pub use ignore::{
    IGNORE_FILE, IgnoreRules, PRIVATE_PREFIXES, SHADOW_PREFIX, SkipReason, is_shadow,
    looks_private, parse_ignore_file, read_ignore_file, shadow_name, should_skip,
};
pub use probe::{Prober, local_state, parse_epoch, parse_remote_stat};
pub use shared_tree::{SharedFile, list_shared, parse_listing};
pub use walk::{TreeWalker, Visit, Visitor, WalkMode};

// Re-export core types for convenience
pub use share_core::{Location, ManagedEntry, ShareError, SharedRoot, SideState};
