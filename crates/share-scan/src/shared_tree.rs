//! Enumeration of the files tracked under the shared root.
//!
//! Whole-tree operations derive their work list from here: every regular
//! file below the shared root is a tracked entry, except platform shadow
//! files.

use std::path::{Path, PathBuf};

use jwalk::{Parallelism, WalkDir};
use tracing::{debug, warn};

use share_core::{RemoteEndpoint, RemoteTools, ShareError, SharedRoot, SideState, remote};

use crate::ignore::is_shadow;
use crate::probe::parse_epoch;

/// A tracked file, relative to the shared root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedFile {
    /// Path relative to the shared root.
    pub relative: PathBuf,
    /// Observed state on the shared side.
    pub state: SideState,
}

/// List every tracked file under the shared root, sorted by path.
///
/// A local shared root that does not exist yields an empty list.
pub fn list_shared(root: &SharedRoot, tools: &RemoteTools) -> Result<Vec<SharedFile>, ShareError> {
    let mut files = match root {
        SharedRoot::Local(path) => list_local(path)?,
        SharedRoot::Remote(endpoint) => list_remote(endpoint, tools)?,
    };
    files.sort_by(|a, b| a.relative.cmp(&b.relative));
    Ok(files)
}

fn list_local(root: &Path) -> Result<Vec<SharedFile>, ShareError> {
    if !root.is_dir() {
        debug!(root = %root.display(), "shared root does not exist yet");
        return Ok(Vec::new());
    }

    let walker = WalkDir::new(root)
        .parallelism(Parallelism::Serial)
        .skip_hidden(false)
        .follow_links(false)
        .sort(true);

    let mut files = Vec::new();
    for entry_result in walker {
        let entry = match entry_result {
            Ok(e) => e,
            Err(err) => {
                let path = err.path().map(|p| p.to_path_buf()).unwrap_or_default();
                warn!(path = %path.display(), error = %err, "skipping unreadable shared entry");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if is_shadow(&name) {
            continue;
        }

        let path = entry.path();
        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping shared entry without metadata");
                continue;
            }
        };
        let modified = metadata.modified().map_err(|e| ShareError::io(&path, e))?;

        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        files.push(SharedFile {
            relative: relative.to_path_buf(),
            state: SideState::new(modified, Some(metadata.len())),
        });
    }
    Ok(files)
}

fn list_remote(endpoint: &RemoteEndpoint, tools: &RemoteTools) -> Result<Vec<SharedFile>, ShareError> {
    let cmd = tools.list_files(endpoint, &endpoint.path);
    let output = remote::run(cmd)
        .map_err(|message| ShareError::transfer(endpoint, "listing", message))?;
    Ok(parse_listing(&String::from_utf8_lossy(&output.stdout)))
}

/// Parse `find -printf '%T@\t%P\n'` output.
pub fn parse_listing(output: &str) -> Vec<SharedFile> {
    output
        .lines()
        .filter_map(|line| {
            let (mtime, relative) = line.split_once('\t')?;
            if relative.is_empty() {
                return None;
            }
            let name = relative.rsplit('/').next().unwrap_or(relative);
            if is_shadow(name) {
                return None;
            }
            let modified = parse_epoch(mtime)?;
            Some(SharedFile {
                relative: PathBuf::from(relative),
                state: SideState::new(modified, None),
            })
        })
        .collect()
}
