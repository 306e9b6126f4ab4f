use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use share_analyze::{AuditOutcome, hash_file};
use share_core::{Decision, Direction, ShareError, SharedRoot, SyncConfig};
use share_ops::{NullSink, Runner, ShareOp, SyncEvent};
use share_scan::SkipReason;
use tempfile::TempDir;

struct Fixture {
    _temp: TempDir,
    local: PathBuf,
    shared: PathBuf,
    config: SyncConfig,
}

impl Fixture {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let base = temp.path().canonicalize().unwrap();
        let local = base.join("local");
        let shared = base.join("shared");
        fs::create_dir_all(&local).unwrap();
        fs::create_dir_all(&shared).unwrap();
        let config = SyncConfig::new(Some(local.clone()), SharedRoot::Local(shared.clone()));
        Self {
            _temp: temp,
            local,
            shared,
            config,
        }
    }

    fn runner(&self) -> Runner<'_, Vec<SyncEvent>> {
        Runner::new(&self.config, &self.local, Vec::new())
    }

    fn write_local(&self, rel: &str, contents: &str, time: SystemTime) -> PathBuf {
        write_at(&self.local.join(rel), contents, time)
    }

    fn write_shared(&self, rel: &str, contents: &str, time: SystemTime) -> PathBuf {
        write_at(&self.shared.join(rel), contents, time)
    }
}

fn write_at(path: &Path, contents: &str, time: SystemTime) -> PathBuf {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
    set_mtime(path, time);
    path.to_path_buf()
}

fn set_mtime(path: &Path, time: SystemTime) {
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(time)
        .unwrap();
}

fn mtime(path: &Path) -> SystemTime {
    fs::metadata(path).unwrap().modified().unwrap()
}

fn t0() -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(1_700_000_000)
}

fn transfers(events: &[SyncEvent]) -> Vec<(PathBuf, Direction, Option<Decision>)> {
    events
        .iter()
        .filter_map(|e| match e {
            SyncEvent::Transferred {
                local,
                direction,
                decision,
                ..
            } => Some((local.clone(), *direction, *decision)),
            _ => None,
        })
        .collect()
}

#[test]
fn test_push_new_preserves_mtime() {
    let fx = Fixture::new();
    let local = fx.write_local("a.txt", "hello", t0());

    let mut runner = fx.runner();
    let summary = runner.run_paths(ShareOp::Push, &[&local]);
    assert!(summary.is_success());
    assert_eq!(summary.transferred, 1);

    let shared = fx.shared.join("a.txt");
    assert_eq!(fs::read_to_string(&shared).unwrap(), "hello");
    assert_eq!(mtime(&shared), t0());
    assert_eq!(
        transfers(runner.sink()),
        vec![(local, Direction::Push, Some(Decision::PushNew))]
    );
}

#[test]
fn test_check_within_tolerance_is_synced() {
    let fx = Fixture::new();
    let local = fx.write_local("a.txt", "x", t0() + Duration::from_millis(500));
    fx.write_shared("a.txt", "x", t0());

    let mut runner = fx.runner();
    let summary = runner.run_paths(ShareOp::Check, &[&local]);
    assert!(summary.is_success());
    assert_eq!(summary.transferred, 0);

    let events = runner.into_sink();
    assert!(matches!(
        events.as_slice(),
        [SyncEvent::Checked {
            decision: Decision::Synced,
            ..
        }]
    ));
}

#[test]
fn test_sync_local_newer_pushes() {
    let fx = Fixture::new();
    let local = fx.write_local("a.txt", "new", t0() + Duration::from_secs(5));
    let shared = fx.write_shared("a.txt", "old", t0());

    let mut runner = fx.runner();
    runner.run_paths(ShareOp::Sync, &[&local]);

    let moved = transfers(runner.sink());
    assert_eq!(moved.len(), 1);
    assert_eq!(moved[0].1, Direction::Push);
    assert_eq!(moved[0].2.map(Decision::reason), Some("local newer"));
    assert_eq!(fs::read_to_string(&shared).unwrap(), "new");
    assert_eq!(mtime(&shared), t0() + Duration::from_secs(5));
}

#[test]
fn test_sync_shared_newer_pulls() {
    let fx = Fixture::new();
    let local = fx.write_local("a.txt", "old", t0());
    fx.write_shared("a.txt", "new", t0() + Duration::from_secs(5));

    let mut runner = fx.runner();
    runner.run_paths(ShareOp::Sync, &[&local]);

    assert_eq!(
        transfers(runner.sink()),
        vec![(local.clone(), Direction::Pull, Some(Decision::PullNewer))]
    );
    assert_eq!(fs::read_to_string(&local).unwrap(), "new");
}

#[test]
fn test_push_directory_skips_ignored_and_private() {
    let fx = Fixture::new();
    let dir = fx.local.join("proj");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(".shareignore"), "*.env\n").unwrap();
    fx.write_local("proj/secret.env", "TOKEN=1", t0());
    fx.write_local("proj/_private.txt", "x", t0());
    fx.write_local("proj/notes.txt", "x", t0());
    fx.write_local("proj/src/main.rs", "fn main() {}", t0());

    let mut runner = fx.runner();
    let summary = runner.run_paths(ShareOp::Push, &[&dir]);
    assert!(summary.is_success());
    assert_eq!(summary.transferred, 2);

    assert!(fx.shared.join("proj/notes.txt").exists());
    assert!(fx.shared.join("proj/src/main.rs").exists());
    assert!(!fx.shared.join("proj/secret.env").exists());
    assert!(!fx.shared.join("proj/_private.txt").exists());
    assert!(!fx.shared.join("proj/.shareignore").exists());

    let skipped: Vec<_> = runner
        .sink()
        .iter()
        .filter_map(|e| match e {
            SyncEvent::Skipped { path, reason } => Some((path.clone(), reason.clone())),
            _ => None,
        })
        .collect();
    assert!(skipped.contains(&(dir.join("secret.env"), SkipReason::Pattern("*.env".into()))));
    assert!(skipped.contains(&(dir.join("_private.txt"), SkipReason::Private)));
}

#[test]
fn test_sync_twice_is_idempotent() {
    let fx = Fixture::new();
    fx.write_local("a.txt", "a", t0());
    fx.write_local("docs/b.txt", "b", t0() + Duration::from_secs(10));
    fx.write_shared("docs/b.txt", "old b", t0());
    fx.write_shared("c.txt", "c", t0());

    let first = fx.runner().run_paths(ShareOp::Sync, &[&fx.local]);
    assert_eq!(first.transferred, 2);

    let mut runner = fx.runner();
    let second = runner.run_paths(ShareOp::Sync, &[&fx.local]);
    assert_eq!(second.transferred, 0);
    assert!(second.is_success());
    assert!(transfers(runner.sink()).is_empty());
}

#[test]
fn test_put_then_get_round_trip() {
    let fx = Fixture::new();
    let local = fx.write_local("data/blob.bin", "payload \u{1F4E6}", t0());
    let original = hash_file(&local).unwrap();

    assert!(fx.runner().run_paths(ShareOp::Put, &[&local]).is_success());
    fs::remove_file(&local).unwrap();
    fs::remove_dir(fx.local.join("data")).unwrap();

    assert!(fx.runner().run_paths(ShareOp::Get, &[&local]).is_success());
    assert_eq!(hash_file(&local).unwrap(), original);

    let mut runner = fx.runner();
    let summary = runner.run_paths(ShareOp::Audit, &[&local]);
    assert_eq!(summary.audited, 1);
    assert_eq!(summary.mismatches, 0);
}

#[test]
fn test_put_overwrites_newer_shared() {
    let fx = Fixture::new();
    let local = fx.write_local("a.txt", "mine", t0());
    let shared = fx.write_shared("a.txt", "theirs", t0() + Duration::from_secs(60));

    let mut runner = fx.runner();
    runner.run_paths(ShareOp::Put, &[&local]);
    assert_eq!(fs::read_to_string(&shared).unwrap(), "mine");
    assert_eq!(transfers(runner.sink()), vec![(local, Direction::Push, None)]);
}

#[test]
fn test_push_not_newer_is_noop() {
    let fx = Fixture::new();
    let local = fx.write_local("a.txt", "mine", t0());
    let shared = fx.write_shared("a.txt", "theirs", t0() + Duration::from_secs(60));

    let mut runner = fx.runner();
    let summary = runner.run_paths(ShareOp::Push, &[&local]);
    assert!(summary.is_success());
    assert_eq!(fs::read_to_string(&shared).unwrap(), "theirs");
    assert!(matches!(
        runner.sink().as_slice(),
        [SyncEvent::Unchanged {
            decision: Decision::PullNewer,
            ..
        }]
    ));
}

#[test]
fn test_rm_prunes_empty_parents() {
    let fx = Fixture::new();
    let local = fx.write_local("a/b/c.txt", "x", t0());
    fx.write_shared("a/b/c.txt", "x", t0());
    fx.write_shared("a/keep.txt", "x", t0());

    let mut runner = fx.runner();
    let summary = runner.run_paths(ShareOp::Remove, &[&local]);
    assert!(summary.is_success());
    assert!(!fx.shared.join("a/b").exists());
    assert!(fx.shared.join("a/keep.txt").exists());
    assert!(local.exists());
    assert!(matches!(
        runner.sink().as_slice(),
        [SyncEvent::Removed { pruned: 1, .. }]
    ));
}

#[test]
fn test_rm_not_shared_is_not_an_error() {
    let fx = Fixture::new();
    let local = fx.write_local("a.txt", "x", t0());

    let mut runner = fx.runner();
    assert!(runner.run_paths(ShareOp::Remove, &[&local]).is_success());
    assert!(matches!(
        runner.sink().as_slice(),
        [SyncEvent::NotShared { .. }]
    ));
}

#[test]
fn test_rm_directory_reaches_private_files() {
    let fx = Fixture::new();
    fx.write_local("d/_private.txt", "x", t0());
    fx.write_local("d/other.txt", "x", t0());
    fx.write_shared("d/_private.txt", "x", t0());

    let mut runner = fx.runner();
    let summary = runner.run_paths(ShareOp::Remove, &[&fx.local.join("d")]);
    assert!(summary.is_success());
    assert!(!fx.shared.join("d/_private.txt").exists());
    // other.txt has no shared copy; nested entries stay quiet.
    assert!(
        !runner
            .sink()
            .iter()
            .any(|e| matches!(e, SyncEvent::NotShared { .. }))
    );
}

#[test]
fn test_preview_mutates_nothing() {
    let fx = Fixture::new();
    let pushed = fx.write_local("new.txt", "x", t0());
    let removed = fx.write_local("old.txt", "x", t0());
    fx.write_shared("old.txt", "x", t0());

    let mut runner = fx.runner().with_preview(true);
    let push = runner.run_paths(ShareOp::Push, &[&pushed]);
    let rm = runner.run_paths(ShareOp::Remove, &[&removed]);
    assert_eq!(push.transferred, 1);
    assert!(rm.is_success());

    assert!(!fx.shared.join("new.txt").exists());
    assert!(fx.shared.join("old.txt").exists());
    let events = runner.into_sink();
    assert!(matches!(
        events[0],
        SyncEvent::Transferred { preview: true, .. }
    ));
    assert!(matches!(events[1], SyncEvent::Removed { preview: true, .. }));
}

#[test]
fn test_named_missing_sources_are_errors() {
    let fx = Fixture::new();
    let present = fx.write_local("a.txt", "x", t0());
    let missing = fx.local.join("nope.txt");

    let mut runner = fx.runner();
    let summary = runner.run_paths(ShareOp::Push, &[&present, &missing]);
    assert_eq!(summary.transferred, 1);
    assert_eq!(summary.failures, 1);
    assert_eq!(
        summary.error_message().unwrap(),
        "'push' completed with 1 errors"
    );

    let pull = fx.runner().run_paths(ShareOp::Pull, &[&missing]);
    assert_eq!(pull.failures, 1);
    let mut runner = fx.runner();
    let sync = runner.run_paths(ShareOp::Sync, &[&missing]);
    assert_eq!(sync.failures, 1);
    match runner.sink().as_slice() {
        [SyncEvent::Failed { error, .. }] => {
            assert!(matches!(error, ShareError::MissingBoth { .. }));
            assert!(error.to_string().starts_with("File exists in neither location"));
        }
        other => panic!("unexpected events: {other:?}"),
    }
}

#[test]
fn test_get_directory_ignores_unshared_descendants() {
    let fx = Fixture::new();
    fx.write_local("d/a.txt", "old", t0());
    fx.write_local("d/local-only.txt", "x", t0());
    fx.write_shared("d/a.txt", "new", t0() + Duration::from_secs(30));

    let summary = fx
        .runner()
        .run_paths(ShareOp::Pull, &[&fx.local.join("d")]);
    assert!(summary.is_success());
    assert_eq!(summary.transferred, 1);
    assert_eq!(fs::read_to_string(fx.local.join("d/a.txt")).unwrap(), "new");
}

#[test]
fn test_not_under_root_fails_entry() {
    let fx = Fixture::new();
    let outside = TempDir::new().unwrap();
    let stray = write_at(&outside.path().join("stray.txt"), "x", t0());

    let mut runner = fx.runner();
    let summary = runner.run_paths(ShareOp::Push, &[&stray]);
    assert_eq!(summary.failures, 1);
    assert!(matches!(
        runner.sink().as_slice(),
        [SyncEvent::Failed {
            error: ShareError::NotUnderRoot { .. },
            ..
        }]
    ));
}

#[test]
fn test_sweeps_need_local_root() {
    let temp = TempDir::new().unwrap();
    let config = SyncConfig::new(None, SharedRoot::Local(temp.path().to_path_buf()));
    let mut runner = Runner::new(&config, temp.path(), NullSink);

    for op in [ShareOp::PushAll, ShareOp::PullAll, ShareOp::SyncAll, ShareOp::AuditAll] {
        let err = runner.sweep(op).unwrap_err();
        assert!(matches!(err, ShareError::ConfigUnset { .. }), "{op}");
    }
}

#[test]
fn test_pullall_and_pushall() {
    let fx = Fixture::new();
    fx.write_shared("only-shared.txt", "s", t0());
    fx.write_shared("docs/newer-shared.txt", "new", t0() + Duration::from_secs(20));
    fx.write_local("docs/newer-shared.txt", "old", t0());
    fx.write_shared("newer-local.txt", "old", t0());
    fx.write_local("newer-local.txt", "new", t0() + Duration::from_secs(20));
    fx.write_shared("._shadow.txt", "fork", t0());

    let mut runner = fx.runner();
    let pulled = runner.sweep(ShareOp::PullAll).unwrap();
    assert_eq!(pulled.transferred, 2);
    assert_eq!(pulled.sweep_message(), "Pulled 2 files");
    assert_eq!(fs::read_to_string(fx.local.join("only-shared.txt")).unwrap(), "s");
    assert_eq!(
        fs::read_to_string(fx.local.join("docs/newer-shared.txt")).unwrap(),
        "new"
    );
    assert!(!fx.local.join("._shadow.txt").exists());

    let pushed = runner.sweep(ShareOp::PushAll).unwrap();
    assert_eq!(pushed.transferred, 1);
    assert_eq!(
        fs::read_to_string(fx.shared.join("newer-local.txt")).unwrap(),
        "new"
    );

    let again = runner.sweep(ShareOp::SyncAll).unwrap();
    assert_eq!(again.sweep_message(), "Already up to date");
}

#[test]
fn test_auditall_reports_mismatch_without_failing() {
    let fx = Fixture::new();
    fx.write_local("same.txt", "same", t0());
    fx.write_shared("same.txt", "same", t0());
    fx.write_local("skewed.txt", "local edit", t0());
    fx.write_shared("skewed.txt", "shared edit", t0());
    fx.write_shared("unsynced.txt", "x", t0());

    let mut runner = fx.runner();
    let summary = runner.sweep(ShareOp::AuditAll).unwrap();
    assert!(summary.is_success());
    assert_eq!(summary.audited, 2);
    assert_eq!(summary.mismatches, 1);

    let mismatched: Vec<_> = runner
        .sink()
        .iter()
        .filter_map(|e| match e {
            SyncEvent::Audited(finding) if finding.outcome.is_mismatch() => Some(finding.local.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(mismatched, vec![fx.local.join("skewed.txt")]);
    assert_eq!(
        fs::read_to_string(fx.local.join("skewed.txt")).unwrap(),
        "local edit"
    );
}

#[test]
fn test_audit_named_not_synced() {
    let fx = Fixture::new();
    let local = fx.write_local("a.txt", "x", t0() + Duration::from_secs(9));
    fx.write_shared("a.txt", "y", t0());

    let mut runner = fx.runner();
    let summary = runner.run_paths(ShareOp::Audit, &[&local]);
    assert!(summary.is_success());
    assert_eq!(summary.audited, 0);
    assert!(matches!(
        runner.sink().as_slice(),
        [SyncEvent::Audited(finding)] if finding.outcome == AuditOutcome::NotSynced { decision: Decision::PushNewer }
    ));
}

#[test]
fn test_status_creates_missing_root_unless_preview() {
    let temp = TempDir::new().unwrap();
    let shared = temp.path().join("not-yet");
    let config = SyncConfig::new(Some(temp.path().to_path_buf()), SharedRoot::Local(shared.clone()));

    let mut preview = Runner::new(&config, temp.path(), Vec::new()).with_preview(true);
    assert!(preview.status().unwrap().is_empty());
    assert!(!shared.exists());

    let mut runner = Runner::new(&config, temp.path(), Vec::new());
    assert!(runner.status().unwrap().is_empty());
    assert!(shared.is_dir());
    assert!(matches!(
        runner.sink().as_slice(),
        [SyncEvent::RootCreated { preview: false, .. }]
    ));
}

#[test]
fn test_list_maps_back_to_local() {
    let fx = Fixture::new();
    fx.write_shared("b.txt", "x", t0());
    fx.write_shared("a/c.txt", "x", t0());

    let listed = fx.runner().list().unwrap();
    assert_eq!(listed, vec![fx.local.join("a/c.txt"), fx.local.join("b.txt")]);

    let nameless = SyncConfig::new(None, SharedRoot::Local(fx.shared.clone()));
    let listed = Runner::new(&nameless, &fx.local, NullSink).list().unwrap();
    assert_eq!(listed, vec![PathBuf::from("a/c.txt"), PathBuf::from("b.txt")]);
}

#[test]
fn test_remote_failure_is_counted() {
    let fx = Fixture::new();
    let local = fx.write_local("a.txt", "x", t0());
    let config = SyncConfig::builder()
        .local_root(fx.local.clone())
        .shared_root(SharedRoot::parse("me@nas.invalid:/dump").unwrap())
        .remote_shell("false")
        .remote_copy("false")
        .build()
        .unwrap();

    // `false` as the remote shell reads as "absent", so this is a new push
    // whose copy then fails.
    let mut runner = Runner::new(&config, &fx.local, Vec::new());
    let summary = runner.run_paths(ShareOp::Push, &[&local, &local]);
    assert_eq!(summary.failures, 2);
    assert_eq!(summary.transferred, 0);
    assert!(runner.sink().iter().all(SyncEvent::is_failure));
    assert!(matches!(
        runner.sink()[0],
        SyncEvent::Failed {
            error: ShareError::TransferFailure { .. },
            ..
        }
    ));
}

#[test]
fn test_remote_mkdir_failure_still_copies() {
    let fx = Fixture::new();
    let local = fx.write_local("sub/a.txt", "x", t0());
    let config = SyncConfig::builder()
        .local_root(fx.local.clone())
        .shared_root(SharedRoot::parse("me@nas.invalid:/dump").unwrap())
        .remote_shell("false")
        .remote_copy("true")
        .build()
        .unwrap();

    // Directory pre-creation runs through the failing shell; the copy is
    // attempted regardless and succeeds.
    let mut runner = Runner::new(&config, &fx.local, Vec::new());
    let summary = runner.run_paths(ShareOp::Push, &[&local]);
    assert_eq!(summary.failures, 0);
    assert_eq!(summary.transferred, 1);
    assert!(matches!(
        runner.sink().as_slice(),
        [SyncEvent::Transferred {
            direction: Direction::Push,
            ..
        }]
    ));
}
