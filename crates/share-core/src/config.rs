//! Sync configuration types.

use std::path::{Path, PathBuf};
use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::location::SharedRoot;
use crate::remote::RemoteTools;

/// Default timestamp tolerance: differences up to one second count as equal.
pub const DEFAULT_TOLERANCE: Duration = Duration::from_secs(1);

/// The pair of roots every managed path is mapped between.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootPair {
    /// Local subtree the tool manages. `None` selects name-only mapping.
    pub local_root: Option<PathBuf>,
    /// Mirror location.
    pub shared_root: SharedRoot,
}

impl RootPair {
    /// Create a root pair.
    pub fn new(local_root: Option<PathBuf>, shared_root: SharedRoot) -> Self {
        Self {
            local_root,
            shared_root,
        }
    }
}

/// Configuration for one invocation. Built once, then only borrowed.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct SyncConfig {
    /// Local root (absolute). Unset means name-only mapping.
    #[builder(default, setter(into, strip_option))]
    #[serde(default)]
    pub local_root: Option<PathBuf>,

    /// Shared root: a directory or a remote endpoint.
    pub shared_root: SharedRoot,

    /// Maximum mtime difference still treated as "same".
    #[builder(default = "DEFAULT_TOLERANCE")]
    #[serde(default = "default_tolerance")]
    pub tolerance: Duration,

    /// Remote shell program.
    #[builder(default = "\"ssh\".to_string()")]
    #[serde(default = "default_shell")]
    pub remote_shell: String,

    /// Remote copy program.
    #[builder(default = "\"scp\".to_string()")]
    #[serde(default = "default_copy")]
    pub remote_copy: String,
}

fn default_tolerance() -> Duration {
    DEFAULT_TOLERANCE
}

fn default_shell() -> String {
    "ssh".to_string()
}

fn default_copy() -> String {
    "scp".to_string()
}

impl SyncConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(Some(ref root)) = self.local_root {
            if !root.is_absolute() {
                return Err(format!("Local root must be absolute: {}", root.display()));
            }
        }
        match self.shared_root {
            Some(SharedRoot::Local(ref path)) if path.as_os_str().is_empty() => {
                return Err("Shared root cannot be empty".to_string());
            }
            None => return Err("Shared root is required".to_string()),
            _ => {}
        }
        for program in [&self.remote_shell, &self.remote_copy].into_iter().flatten() {
            if program.trim().is_empty() {
                return Err("Remote programs cannot be empty".to_string());
            }
        }
        Ok(())
    }
}

impl SyncConfig {
    /// Create a new config builder.
    pub fn builder() -> SyncConfigBuilder {
        SyncConfigBuilder::default()
    }

    /// Create a config with default tolerance and programs.
    pub fn new(local_root: Option<PathBuf>, shared_root: SharedRoot) -> Self {
        Self {
            local_root,
            shared_root,
            tolerance: DEFAULT_TOLERANCE,
            remote_shell: default_shell(),
            remote_copy: default_copy(),
        }
    }

    /// Create a config from a resolved root pair.
    pub fn from_roots(roots: RootPair) -> Self {
        Self::new(roots.local_root, roots.shared_root)
    }

    /// The root pair this config maps between.
    pub fn roots(&self) -> RootPair {
        RootPair::new(self.local_root.clone(), self.shared_root.clone())
    }

    /// Local root, if configured.
    pub fn local_root(&self) -> Option<&Path> {
        self.local_root.as_deref()
    }

    /// Programs used for remote shared roots.
    pub fn remote_tools(&self) -> RemoteTools {
        RemoteTools::new(&self.remote_shell, &self.remote_copy)
    }
}
