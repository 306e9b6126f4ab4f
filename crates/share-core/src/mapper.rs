//! Mapping between local paths and shared locations.

use std::path::{Path, PathBuf};

use crate::config::SyncConfig;
use crate::error::ShareError;
use crate::location::{Location, SharedRoot};
use crate::paths::resolve_path;

/// Maps local paths to shared locations and back.
///
/// With a local root configured, a local path maps to the same relative path
/// under the shared root. Without one, only the final component is kept; two
/// files with the same name in different directories then collide.
#[derive(Debug, Clone)]
pub struct PathMapper {
    local_root: Option<PathBuf>,
    shared_root: SharedRoot,
    cwd: PathBuf,
}

impl PathMapper {
    /// Create a mapper resolving relative paths against `cwd`.
    pub fn new(config: &SyncConfig, cwd: impl Into<PathBuf>) -> Self {
        Self {
            local_root: config.local_root.clone(),
            shared_root: config.shared_root.clone(),
            cwd: cwd.into(),
        }
    }

    /// Local root, if configured.
    pub fn local_root(&self) -> Option<&Path> {
        self.local_root.as_deref()
    }

    /// Shared root.
    pub fn shared_root(&self) -> &SharedRoot {
        &self.shared_root
    }

    /// Absolute form of a local path.
    pub fn absolute(&self, local: &Path) -> PathBuf {
        resolve_path(local, &self.cwd)
    }

    /// Relative key of a local path under the local root.
    pub fn relative(&self, local: &Path) -> Result<PathBuf, ShareError> {
        let abs = self.absolute(local);
        match &self.local_root {
            Some(root) => abs
                .strip_prefix(root)
                .map(Path::to_path_buf)
                .map_err(|_| ShareError::NotUnderRoot {
                    path: local.to_path_buf(),
                    root: root.clone(),
                }),
            None => abs
                .file_name()
                .map(PathBuf::from)
                .ok_or_else(|| ShareError::Config {
                    message: format!("{} has no file name to share under", local.display()),
                }),
        }
    }

    /// Map a local path to its shared location.
    pub fn to_shared(&self, local: &Path) -> Result<Location, ShareError> {
        let relative = self.relative(local)?;
        Ok(self.shared_root.join(&relative))
    }

    /// Map a shared location back to its local path.
    ///
    /// Without a local root the residual relative path is placed under the
    /// mapper's working directory.
    pub fn to_local(&self, shared: &Location) -> Result<PathBuf, ShareError> {
        let relative = self
            .shared_root
            .relative(shared)
            .ok_or_else(|| ShareError::NotUnderRoot {
                path: PathBuf::from(shared.to_string()),
                root: PathBuf::from(self.shared_root.to_string()),
            })?;
        Ok(self.local_for(&relative))
    }

    /// Local path for a shared-relative path.
    pub fn local_for(&self, relative: &Path) -> PathBuf {
        match &self.local_root {
            Some(root) => root.join(relative),
            None => self.cwd.join(relative),
        }
    }

    /// Shared location for a shared-relative path.
    pub fn shared_for(&self, relative: &Path) -> Location {
        self.shared_root.join(relative)
    }
}
