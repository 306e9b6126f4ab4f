//! Command runner.
//!
//! Per-path commands walk each named path and reconcile every file they
//! reach. Whole-tree commands derive their work list from the shared tree.
//! Either way a failing entry is reported, counted and skipped; it never
//! stops the rest of the run.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use share_analyze::{AuditFinding, AuditOutcome, Auditor, StatusReport};
use share_core::{
    Decision, Direction, Location, ManagedEntry, PathMapper, RemoteTools, ShareError, SharedRoot,
    Side, SyncConfig, SyncMode,
};
use share_scan::{
    IgnoreRules, Prober, SkipReason, TreeWalker, Visit, Visitor, list_shared, local_state,
};

use crate::event::{EventSink, SyncEvent};
use crate::operation::ShareOp;
use crate::transfer::Transfer;

/// Totals for one command invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Command that ran.
    pub op: ShareOp,
    /// Files copied (or that would be, in preview mode).
    pub transferred: usize,
    /// Pairs whose content was compared.
    pub audited: usize,
    /// Audited pairs whose content differed. Not failures.
    pub mismatches: usize,
    /// Entries that failed.
    pub failures: usize,
}

impl RunSummary {
    /// Create an empty summary.
    pub fn new(op: ShareOp) -> Self {
        Self {
            op,
            transferred: 0,
            audited: 0,
            mismatches: 0,
            failures: 0,
        }
    }

    /// Check if every entry succeeded.
    pub fn is_success(&self) -> bool {
        self.failures == 0
    }

    /// Closing line of a whole-tree sweep.
    pub fn sweep_message(&self) -> String {
        match self.op {
            ShareOp::AuditAll | ShareOp::Audit => format!(
                "Audited {} files, {} mismatched",
                self.audited, self.mismatches
            ),
            _ if self.transferred == 0 => "Already up to date".to_string(),
            _ => format!("{} {} files", self.op.past_tense(), self.transferred),
        }
    }

    /// Closing line when some entries failed.
    pub fn error_message(&self) -> Option<String> {
        (self.failures > 0)
            .then(|| format!("'{}' completed with {} errors", self.op, self.failures))
    }

    fn absorb(&mut self, other: &Self) {
        self.transferred += other.transferred;
        self.audited += other.audited;
        self.mismatches += other.mismatches;
        self.failures += other.failures;
    }
}

/// Runs share commands against one configuration.
pub struct Runner<'a, S> {
    config: &'a SyncConfig,
    mapper: PathMapper,
    tools: RemoteTools,
    prober: Prober,
    transfer: Transfer,
    auditor: Auditor,
    sink: S,
}

impl<'a, S: EventSink> Runner<'a, S> {
    /// Create a runner resolving relative paths against `cwd`.
    pub fn new(config: &'a SyncConfig, cwd: impl Into<PathBuf>, sink: S) -> Self {
        let tools = config.remote_tools();
        Self {
            config,
            mapper: PathMapper::new(config, cwd),
            prober: Prober::new(tools.clone()),
            transfer: Transfer::new(tools.clone()),
            auditor: Auditor::new(config.tolerance),
            tools,
            sink,
        }
    }

    /// Compute and report everything without touching the filesystem.
    pub fn with_preview(mut self, preview: bool) -> Self {
        self.transfer = self.transfer.with_preview(preview);
        self
    }

    /// Check if mutations are suppressed.
    pub fn is_preview(&self) -> bool {
        self.transfer.is_preview()
    }

    /// The path mapper in use.
    pub fn mapper(&self) -> &PathMapper {
        &self.mapper
    }

    /// The event sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Consume the runner, returning its sink.
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Run a per-path command over each path in turn.
    pub fn run_paths<P: AsRef<Path>>(&mut self, op: ShareOp, paths: &[P]) -> RunSummary {
        let mut summary = RunSummary::new(op);
        if op.is_whole_tree() {
            self.fail(
                Path::new(""),
                ShareError::Config {
                    message: format!("'{op}' does not take paths"),
                },
            );
            summary.failures += 1;
            return summary;
        }

        let walker = TreeWalker::new(op.walk_mode());
        let rules = IgnoreRules::new();
        for path in paths {
            let path = self.mapper.absolute(path.as_ref());
            let mut visitor = PathVisitor {
                runner: self,
                op,
                summary: RunSummary::new(op),
            };
            let failures = walker.apply(&mut visitor, &path, &rules);
            let mut partial = visitor.summary;
            partial.failures = failures;
            summary.absorb(&partial);
        }
        summary
    }

    /// Run a whole-tree sweep (`pushall`, `pullall`, `syncall`, `auditall`).
    ///
    /// Every regular file under the shared root is mapped back under the
    /// local root and decided on its own.
    pub fn sweep(&mut self, op: ShareOp) -> Result<RunSummary, ShareError> {
        if !matches!(
            op,
            ShareOp::PushAll | ShareOp::PullAll | ShareOp::SyncAll | ShareOp::AuditAll
        ) {
            return Err(ShareError::Config {
                message: format!("'{op}' is not a whole-tree sweep"),
            });
        }
        if self.mapper.local_root().is_none() {
            return Err(ShareError::config_unset(op.to_string()));
        }

        let files = list_shared(self.mapper.shared_root(), &self.tools)?;
        debug!(op = %op, count = files.len(), "sweeping shared tree");

        let mut summary = RunSummary::new(op);
        for file in files {
            let local = self.mapper.local_for(&file.relative);
            let shared = self.mapper.shared_for(&file.relative);
            let result = local_state(&local).and_then(|local_state| {
                let entry = ManagedEntry::new(local.clone(), shared, local_state, Some(file.state));
                match op.sync_mode() {
                    Some(mode) => self.reconcile(op, mode, entry, false, &mut summary),
                    None => self.audit(entry, false, &mut summary),
                }
            });
            if let Err(error) = result {
                self.fail(&local, error);
                summary.failures += 1;
            }
        }
        Ok(summary)
    }

    /// Group every tracked file by state.
    ///
    /// A missing local shared root is created first, unless previewing.
    pub fn status(&mut self) -> Result<StatusReport, ShareError> {
        if let SharedRoot::Local(root) = self.mapper.shared_root() {
            if !root.exists() {
                let preview = self.transfer.is_preview();
                if !preview {
                    fs::create_dir_all(root).map_err(|e| ShareError::io(root, e))?;
                }
                self.sink.emit(SyncEvent::RootCreated {
                    root: root.clone(),
                    preview,
                });
            }
        }

        let files = list_shared(self.mapper.shared_root(), &self.tools)?;
        StatusReport::build(&self.mapper, &files, self.config.tolerance)
    }

    /// Local paths of every tracked file.
    ///
    /// Without a local root these are shared-relative paths.
    pub fn list(&self) -> Result<Vec<PathBuf>, ShareError> {
        let files = list_shared(self.mapper.shared_root(), &self.tools)?;
        Ok(files
            .into_iter()
            .map(|file| match self.mapper.local_root() {
                Some(_) => self.mapper.local_for(&file.relative),
                None => file.relative,
            })
            .collect())
    }

    fn run_entry(
        &mut self,
        op: ShareOp,
        local: &Path,
        reports_missing: bool,
        summary: &mut RunSummary,
    ) -> Result<(), ShareError> {
        let shared = self.mapper.to_shared(local)?;
        let entry = self.prober.probe(local.to_path_buf(), shared)?;

        let result = match op {
            ShareOp::Put => self.force(op, Direction::Push, entry, summary),
            ShareOp::Get => self.force(op, Direction::Pull, entry, summary),
            ShareOp::Check => {
                let decision = entry.decision(self.config.tolerance);
                self.sink.emit(SyncEvent::Checked { entry, decision });
                Ok(())
            }
            ShareOp::Remove => self.remove(entry, reports_missing),
            ShareOp::Audit => self.audit(entry, true, summary),
            _ => match op.sync_mode() {
                Some(mode) => self.reconcile(op, mode, entry, true, summary),
                None => Ok(()),
            },
        };

        match result {
            Err(error) if error.is_missing() && !reports_missing => {
                debug!(path = %local.display(), "no counterpart for nested entry");
                Ok(())
            }
            other => other,
        }
    }

    /// Unconditional copy in one direction (`put`, `get`).
    fn force(
        &mut self,
        op: ShareOp,
        direction: Direction,
        entry: ManagedEntry,
        summary: &mut RunSummary,
    ) -> Result<(), ShareError> {
        match direction {
            Direction::Push if !entry.local_exists() => {
                return Err(ShareError::missing(entry.local.display(), Side::Local));
            }
            Direction::Pull if !entry.shared_exists() => {
                return Err(ShareError::missing(entry.local.display(), Side::Shared));
            }
            _ => {}
        }
        self.execute(op, direction, entry, None)?;
        summary.transferred += 1;
        Ok(())
    }

    /// Newer-wins reconciliation narrowed to `mode`.
    ///
    /// `named` entries come from the command line: a missing required side
    /// is an error and no-op decisions are reported. Sweep entries are
    /// silent unless something is copied.
    fn reconcile(
        &mut self,
        op: ShareOp,
        mode: SyncMode,
        entry: ManagedEntry,
        named: bool,
        summary: &mut RunSummary,
    ) -> Result<(), ShareError> {
        let decision = entry.decision(self.config.tolerance);
        debug!(path = %entry.local.display(), ?decision, "decided");

        if named {
            match mode {
                SyncMode::Push if !entry.local_exists() => {
                    return Err(ShareError::missing(entry.local.display(), Side::Local));
                }
                SyncMode::Pull if !entry.shared_exists() => {
                    return Err(ShareError::missing(entry.local.display(), Side::Shared));
                }
                SyncMode::Both if decision == Decision::Neither => {
                    return Err(ShareError::MissingBoth {
                        path: entry.local.display().to_string(),
                    });
                }
                _ => {}
            }
        }

        match decision.action(mode) {
            Some(direction) => {
                self.execute(op, direction, entry, Some(decision))?;
                summary.transferred += 1;
            }
            None if named => self.sink.emit(SyncEvent::Unchanged {
                op,
                local: entry.local,
                decision,
            }),
            None => {}
        }
        Ok(())
    }

    fn execute(
        &mut self,
        op: ShareOp,
        direction: Direction,
        entry: ManagedEntry,
        decision: Option<Decision>,
    ) -> Result<(), ShareError> {
        let local = Location::Local(entry.local.clone());
        match direction {
            Direction::Push => self.transfer.copy(&local, &entry.shared)?,
            Direction::Pull => self.transfer.copy(&entry.shared, &local)?,
        }
        self.sink.emit(SyncEvent::Transferred {
            op,
            local: entry.local,
            shared: entry.shared,
            direction,
            decision,
            preview: self.transfer.is_preview(),
        });
        Ok(())
    }

    fn remove(&mut self, entry: ManagedEntry, reports_missing: bool) -> Result<(), ShareError> {
        if !entry.shared_exists() {
            if reports_missing {
                self.sink.emit(SyncEvent::NotShared { local: entry.local });
            }
            return Ok(());
        }

        let pruned = self.transfer.remove(&entry.shared, self.mapper.shared_root())?;
        self.sink.emit(SyncEvent::Removed {
            local: entry.local,
            shared: entry.shared,
            pruned,
            preview: self.transfer.is_preview(),
        });
        Ok(())
    }

    /// Audit one entry. Sweeps (`named == false`) only report synced pairs.
    fn audit(
        &mut self,
        entry: ManagedEntry,
        named: bool,
        summary: &mut RunSummary,
    ) -> Result<(), ShareError> {
        let outcome = self.auditor.audit_entry(&entry);
        match &outcome {
            AuditOutcome::NotSynced {
                decision: Decision::Neither,
            } => return Err(ShareError::missing(entry.local.display(), Side::Local)),
            AuditOutcome::NotSynced { .. } if !named => return Ok(()),
            AuditOutcome::Failed { message } => {
                return Err(ShareError::io(&entry.local, io::Error::other(message.clone())));
            }
            AuditOutcome::Verified { .. } => summary.audited += 1,
            AuditOutcome::Mismatched { .. } => {
                summary.audited += 1;
                summary.mismatches += 1;
            }
            AuditOutcome::Unauditable | AuditOutcome::NotSynced { .. } => {}
        }

        self.sink.emit(SyncEvent::Audited(AuditFinding {
            shared: entry.shared.to_string(),
            local: entry.local,
            outcome,
        }));
        Ok(())
    }

    fn fail(&mut self, path: &Path, error: ShareError) {
        debug!(path = %path.display(), error = %error, "entry failed");
        self.sink.emit(SyncEvent::Failed {
            path: path.to_path_buf(),
            error,
        });
    }
}

struct PathVisitor<'r, 'a, S> {
    runner: &'r mut Runner<'a, S>,
    op: ShareOp,
    summary: RunSummary,
}

impl<S: EventSink> Visitor for PathVisitor<'_, '_, S> {
    fn visit(&mut self, visit: Visit<'_>) -> usize {
        let reports_missing = visit.reports_missing();
        match self
            .runner
            .run_entry(self.op, visit.path, reports_missing, &mut self.summary)
        {
            Ok(()) => 0,
            Err(error) => {
                self.runner.fail(visit.path, error);
                1
            }
        }
    }

    fn skipped(&mut self, path: &Path, reason: &SkipReason) {
        self.runner.sink.emit(SyncEvent::Skipped {
            path: path.to_path_buf(),
            reason: reason.clone(),
        });
    }

    fn unreadable(&mut self, path: &Path, error: io::Error) {
        self.runner.fail(path, ShareError::io(path, error));
    }
}
