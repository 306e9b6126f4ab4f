//! Transfer executor.
//!
//! Copies one file between a local path and a shared location, keeping
//! modification times and permission bits. Local pairs are copied in
//! process; anything involving a remote endpoint goes through the remote
//! copy program. Preview mode turns every mutation into a no-op.

use std::fs::{self, File, FileTimes};
use std::path::Path;

use tracing::{debug, info, warn};

use share_core::{Location, RemoteTools, ShareError, SharedRoot, remote};
use share_scan::shadow_name;

/// Executes copies and removals.
#[derive(Debug, Clone)]
pub struct Transfer {
    tools: RemoteTools,
    preview: bool,
}

impl Transfer {
    /// Create an executor using `tools` for remote endpoints.
    pub fn new(tools: RemoteTools) -> Self {
        Self {
            tools,
            preview: false,
        }
    }

    /// Enable or disable preview mode.
    pub fn with_preview(mut self, preview: bool) -> Self {
        self.preview = preview;
        self
    }

    /// Check if mutations are suppressed.
    pub fn is_preview(&self) -> bool {
        self.preview
    }

    /// Copy `from` over `to`, creating the destination parent as needed.
    pub fn copy(&self, from: &Location, to: &Location) -> Result<(), ShareError> {
        if self.preview {
            debug!(from = %from, to = %to, "preview: skipping copy");
            return Ok(());
        }

        match (from, to) {
            (Location::Local(src), Location::Local(dst)) => {
                copy_local(src, dst)?;
            }
            _ => self.copy_remote(from, to)?,
        }

        if let Location::Local(dst) = to {
            remove_shadow(dst);
        }
        info!(from = %from, to = %to, "copied");
        Ok(())
    }

    /// Remove a shared file.
    ///
    /// For a local shared root, parent directories left empty are pruned up
    /// to (not including) the root. Returns the number of pruned directories.
    pub fn remove(&self, target: &Location, root: &SharedRoot) -> Result<usize, ShareError> {
        if self.preview {
            debug!(target = %target, "preview: skipping removal");
            return Ok(0);
        }

        let pruned = match target {
            Location::Local(path) => {
                fs::remove_file(path).map_err(|e| ShareError::io(path, e))?;
                match root {
                    SharedRoot::Local(stop) => prune_empty_parents(path, stop),
                    SharedRoot::Remote(_) => 0,
                }
            }
            Location::Remote(remote_path) => {
                remote::run(self.tools.remove(remote_path))
                    .map_err(|message| ShareError::transfer(target, target, message))?;
                0
            }
        };
        info!(target = %target, pruned, "removed");
        Ok(pruned)
    }

    fn copy_remote(&self, from: &Location, to: &Location) -> Result<(), ShareError> {
        match to {
            Location::Remote(dst) => {
                if let Some(parent) = dst.parent() {
                    // The copy below reports the real failure if this one mattered.
                    if let Err(message) = remote::run(self.tools.mkdir_p(&dst.endpoint, &parent)) {
                        warn!(dir = %parent, error = %message, "could not pre-create remote directory");
                    }
                }
            }
            Location::Local(dst) => create_parent(dst)?,
        }

        remote::run(self.tools.copy(&from.to_string(), &to.to_string()))
            .map_err(|message| ShareError::transfer(from, to, message))?;
        Ok(())
    }
}

/// Copy a local file, then carry over its access and modification times.
///
/// `fs::copy` has already given the destination the source's mode, which may
/// be read-only, so the times are set through a read handle.
pub fn copy_local(src: &Path, dst: &Path) -> Result<u64, ShareError> {
    create_parent(dst)?;

    let failed = |e: std::io::Error| ShareError::transfer(src.display(), dst.display(), e.to_string());

    let bytes = fs::copy(src, dst).map_err(failed)?;
    let metadata = fs::metadata(src).map_err(failed)?;
    let mut times = FileTimes::new().set_modified(metadata.modified().map_err(failed)?);
    if let Ok(accessed) = metadata.accessed() {
        times = times.set_accessed(accessed);
    }
    File::open(dst)
        .and_then(|file| file.set_times(times))
        .map_err(failed)?;

    Ok(bytes)
}

fn create_parent(path: &Path) -> Result<(), ShareError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| ShareError::io(parent, e))
        }
        _ => Ok(()),
    }
}

/// Delete a `._<name>` sibling of a freshly written file. Best-effort.
pub fn remove_shadow(written: &Path) -> bool {
    let (Some(parent), Some(name)) = (written.parent(), written.file_name()) else {
        return false;
    };
    let shadow = parent.join(shadow_name(&name.to_string_lossy()));
    if fs::symlink_metadata(&shadow).is_err() {
        return false;
    }
    match fs::remove_file(&shadow) {
        Ok(()) => {
            debug!(path = %shadow.display(), "removed shadow file");
            true
        }
        Err(e) => {
            warn!(path = %shadow.display(), error = %e, "could not remove shadow file");
            false
        }
    }
}

/// Remove empty directories from `path`'s parent upward, stopping at `stop`.
/// Best-effort: the first directory that cannot be removed ends the climb.
pub fn prune_empty_parents(path: &Path, stop: &Path) -> usize {
    let mut pruned = 0;
    let mut current = path.parent();
    while let Some(dir) = current {
        if dir == stop || !dir.starts_with(stop) {
            break;
        }
        if fs::remove_dir(dir).is_err() {
            break;
        }
        debug!(dir = %dir.display(), "pruned empty directory");
        pruned += 1;
        current = dir.parent();
    }
    pruned
}
