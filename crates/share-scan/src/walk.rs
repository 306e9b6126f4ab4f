//! Ignore-aware recursive traversal.
//!
//! The walk runs on jwalk in serial, sorted order. Each directory read picks
//! up the inherited rule set as its read-dir state, extends it with that
//! directory's `.shareignore` (so the extension only reaches the subtree)
//! and tags filtered children so they are reported but never descended.
//! Every surviving file is handed to a [`Visitor`], and the per-entry
//! failure counts are summed.

use std::io;
use std::path::Path;

use jwalk::{Parallelism, WalkDirGeneric};
use tracing::{debug, warn};

use crate::ignore::{IgnoreRules, SkipReason, read_ignore_file, should_skip};

/// Read-dir state carries the rules in force; entry state the skip verdict.
type WalkState = (IgnoreRules, Option<SkipReason>);

/// How the walker filters entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkMode {
    /// Apply ignore patterns and the private-name heuristic.
    ///
    /// Used by additive operations (put, push, sync, check, audit).
    Skipping,
    /// Apply ignore patterns only, and tell the visitor that missing
    /// counterparts of descendants are not errors.
    ///
    /// Used by retrieval and removal (get, pull, rm).
    NoSkip,
}

/// A path reached by the walker.
#[derive(Debug, Clone, Copy)]
pub struct Visit<'a> {
    /// The path, as built from the walk root.
    pub path: &'a Path,
    /// Reached by descending into a directory rather than named directly.
    pub nested: bool,
    /// Mode of the walk that produced this visit.
    pub mode: WalkMode,
}

impl Visit<'_> {
    /// Whether a missing side should be reported as an error.
    pub fn reports_missing(&self) -> bool {
        !(self.nested && self.mode == WalkMode::NoSkip)
    }
}

/// Per-entry operation applied by the walker.
pub trait Visitor {
    /// Handle one path. Returns the number of failures (0 on success).
    fn visit(&mut self, visit: Visit<'_>) -> usize;

    /// Called for each entry filtered out.
    fn skipped(&mut self, _path: &Path, _reason: &SkipReason) {}

    /// Called when a directory cannot be read. Counts as one failure.
    fn unreadable(&mut self, _path: &Path, _error: io::Error) {}
}

/// Recursive directory walker.
#[derive(Debug, Clone, Copy)]
pub struct TreeWalker {
    mode: WalkMode,
}

impl TreeWalker {
    /// Create a walker with the given mode.
    pub fn new(mode: WalkMode) -> Self {
        Self { mode }
    }

    /// Walker that skips ignored and private entries.
    pub fn skipping() -> Self {
        Self::new(WalkMode::Skipping)
    }

    /// Walker that skips ignored entries only.
    pub fn no_skip() -> Self {
        Self::new(WalkMode::NoSkip)
    }

    /// The filtering mode.
    pub fn mode(&self) -> WalkMode {
        self.mode
    }

    /// Apply `visitor` to `path`.
    ///
    /// A non-directory path (including one that does not exist) is visited
    /// directly. A directory is walked with `rules` as the inherited set.
    /// Returns the summed failure count; 0 means every entry succeeded.
    pub fn apply<V>(&self, visitor: &mut V, path: &Path, rules: &IgnoreRules) -> usize
    where
        V: Visitor + ?Sized,
    {
        if !path.is_dir() {
            return visitor.visit(Visit {
                path,
                nested: false,
                mode: self.mode,
            });
        }

        let mut failures = 0;
        for entry_result in self.walker(path, rules) {
            let entry = match entry_result {
                Ok(e) => e,
                Err(err) => {
                    let failed = err.path().unwrap_or(path).to_path_buf();
                    visitor.unreadable(&failed, io::Error::other(err.to_string()));
                    failures += 1;
                    continue;
                }
            };
            if entry.depth == 0 {
                continue;
            }

            let entry_path = entry.path();
            if let Some(reason) = &entry.client_state {
                visitor.skipped(&entry_path, reason);
                continue;
            }

            let file_type = entry.file_type();
            if file_type.is_dir() {
                continue;
            }
            if file_type.is_symlink() && entry_path.is_dir() {
                debug!(path = %entry_path.display(), "not descending into symlinked directory");
                continue;
            }
            if entry_path.is_file() {
                failures += visitor.visit(Visit {
                    path: &entry_path,
                    nested: true,
                    mode: self.mode,
                });
            }
        }
        failures
    }

    fn walker(&self, root: &Path, rules: &IgnoreRules) -> WalkDirGeneric<WalkState> {
        let skip_private = self.mode == WalkMode::Skipping;

        WalkDirGeneric::<WalkState>::new(root)
            .parallelism(Parallelism::Serial)
            .skip_hidden(false)
            .follow_links(false)
            .sort(true)
            .root_read_dir_state(rules.clone())
            .process_read_dir(move |depth, dir, rules, children| {
                // The first read only yields the root entry itself.
                if depth.is_none() {
                    return;
                }

                match read_ignore_file(dir) {
                    Ok(patterns) if patterns.is_empty() => {}
                    Ok(patterns) => {
                        debug!(dir = %dir.display(), count = patterns.len(), "loaded ignore rules");
                        *rules = rules.extended(patterns);
                    }
                    Err(e) => warn!(dir = %dir.display(), error = %e, "could not read ignore file"),
                }

                for child in children.iter_mut().flatten() {
                    let name = child.file_name.to_string_lossy().into_owned();
                    let reason = should_skip(&name, &child.path(), rules, skip_private);
                    if reason.is_some() {
                        child.read_children_path = None;
                    }
                    child.client_state = reason;
                }
            })
    }
}
