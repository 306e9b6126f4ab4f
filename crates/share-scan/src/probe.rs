//! Stat both sides of a managed pair.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use share_core::{Location, ManagedEntry, RemotePath, RemoteTools, ShareError, SideState, remote};

/// Exit status of `test -f` for a missing file.
const REMOTE_ABSENT: i32 = 1;

/// Observes existence, mtime and size on both sides of a pair.
#[derive(Debug, Clone)]
pub struct Prober {
    tools: RemoteTools,
}

impl Prober {
    /// Create a prober using `tools` for remote shared roots.
    pub fn new(tools: RemoteTools) -> Self {
        Self { tools }
    }

    /// Build a [`ManagedEntry`] by stat-ing both sides.
    pub fn probe(&self, local: PathBuf, shared: Location) -> Result<ManagedEntry, ShareError> {
        let local_state = local_state(&local)?;
        let shared_state = self.state(&shared)?;
        Ok(ManagedEntry::new(local, shared, local_state, shared_state))
    }

    /// State of any location.
    pub fn state(&self, location: &Location) -> Result<Option<SideState>, ShareError> {
        match location {
            Location::Local(path) => local_state(path),
            Location::Remote(remote) => self.remote_state(remote),
        }
    }

    fn remote_state(&self, target: &RemotePath) -> Result<Option<SideState>, ShareError> {
        let mut cmd = self.tools.stat(target);
        let line = remote::describe(&cmd);
        let output = cmd
            .output()
            .map_err(|e| ShareError::transfer(target, target, format!("failed to run `{line}`: {e}")))?;

        match output.status.code() {
            Some(0) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                parse_remote_stat(&stdout).map(Some).ok_or_else(|| {
                    ShareError::transfer(target, target, format!("unexpected stat output: {}", stdout.trim()))
                })
            }
            Some(REMOTE_ABSENT) => Ok(None),
            _ => Err(ShareError::transfer(
                target,
                target,
                format!(
                    "`{line}` exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            )),
        }
    }
}

/// State of a local path. Only regular files count as existing.
pub fn local_state(path: &Path) -> Result<Option<SideState>, ShareError> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() => {
            let modified = meta.modified().map_err(|e| ShareError::io(path, e))?;
            Ok(Some(SideState::new(modified, Some(meta.len()))))
        }
        Ok(_) => Ok(None),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ShareError::io(path, e)),
    }
}

/// Parse `<mtime> <size>` as printed by `stat -c '%Y %s'`.
pub fn parse_remote_stat(output: &str) -> Option<SideState> {
    let mut parts = output.split_whitespace();
    let modified = parse_epoch(parts.next()?)?;
    let size = parts.next().and_then(|s| s.parse().ok());
    Some(SideState::new(modified, size))
}

/// Parse fractional seconds since the epoch.
pub fn parse_epoch(text: &str) -> Option<SystemTime> {
    let secs: f64 = text.trim().parse().ok()?;
    Duration::try_from_secs_f64(secs).ok().map(|d| UNIX_EPOCH + d)
}
