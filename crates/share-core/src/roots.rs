//! Root resolution from layered configuration sources.
//!
//! Sources, lowest precedence first:
//!
//! 1. built-in defaults (no local root, shared root `~/Shared/dump`)
//! 2. `<config dir>/share/config.toml`
//! 3. the `~/.sharepath` and `~/.shareroot` dotfiles
//! 4. the nearest `.shareoverride` at or above the start directory
//!
//! Resolution reads files but has no other effects, and runs once per
//! process before any sync operation.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::config::{RootPair, SyncConfig};
use crate::error::ShareError;
use crate::location::{RemoteEndpoint, SharedRoot};
use crate::paths::{expand_home, resolve_path};

/// Dotfile holding the local root.
pub const LOCAL_ROOT_FILE: &str = ".sharepath";
/// Dotfile holding the shared root.
pub const SHARED_ROOT_FILE: &str = ".shareroot";
/// Directory-scoped override file.
pub const OVERRIDE_FILE: &str = ".shareoverride";
/// Name of the config file under the user config directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Where configuration is looked up.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Home directory (dotfiles, `~` expansion, default shared root).
    pub home: Option<PathBuf>,
    /// Per-user config directory; `share/config.toml` is read from here.
    pub config_dir: Option<PathBuf>,
}

impl ConfigSources {
    /// Create sources from explicit directories.
    pub fn new(home: Option<PathBuf>, config_dir: Option<PathBuf>) -> Self {
        Self { home, config_dir }
    }
}

/// Keys accepted by `config.toml` and `.shareoverride`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
    /// Local root. An empty string clears a root set by a lower layer.
    pub local_root: Option<String>,
    pub shared_root: Option<String>,
    pub tolerance_secs: Option<f64>,
    pub remote_shell: Option<String>,
    pub remote_copy: Option<String>,
}

impl ConfigLayer {
    /// Parse a TOML layer.
    pub fn parse(contents: &str, origin: &Path) -> Result<Self, ShareError> {
        toml::from_str(contents).map_err(|e| ShareError::Config {
            message: format!("{}: {e}", origin.display()),
        })
    }

    fn read(path: &Path) -> Result<Option<Self>, ShareError> {
        match fs::read_to_string(path) {
            Ok(contents) => Self::parse(&contents, path).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ShareError::io(path, e)),
        }
    }
}

/// Resolve the full configuration for a process started in `start_dir`.
pub fn resolve_config(start_dir: &Path, sources: &ConfigSources) -> Result<SyncConfig, ShareError> {
    let home = sources.home.as_deref();
    let mut config = SyncConfig::new(None, default_shared_root(home));

    if let Some(dir) = &sources.config_dir {
        let path = dir.join("share").join(CONFIG_FILE);
        if let Some(layer) = ConfigLayer::read(&path)? {
            debug!(path = %path.display(), "applying config file");
            apply_layer(&mut config, &layer, start_dir, home)?;
        }
    }

    if let Some(home) = home {
        if let Some(value) = read_dotfile(&home.join(LOCAL_ROOT_FILE))? {
            config.local_root = Some(resolve_path(&expand_home(&value, Some(home)), start_dir));
        }
        if let Some(value) = read_dotfile(&home.join(SHARED_ROOT_FILE))? {
            config.shared_root = parse_shared_root(&value, start_dir, Some(home))?;
        }
    }

    if let Some(path) = find_override(start_dir) {
        if let Some(layer) = ConfigLayer::read(&path)? {
            debug!(path = %path.display(), "applying directory override");
            let base = path.parent().unwrap_or(start_dir);
            apply_layer(&mut config, &layer, base, home)?;
        }
    }

    Ok(config)
}

/// Resolve only the root pair.
pub fn resolve_roots(start_dir: &Path, sources: &ConfigSources) -> Result<RootPair, ShareError> {
    resolve_config(start_dir, sources).map(|config| config.roots())
}

/// Parse a shared-root value from configuration.
///
/// Remote strings are kept verbatim; local ones get `~` expanded and are made
/// absolute against `base`.
pub fn parse_shared_root(value: &str, base: &Path, home: Option<&Path>) -> Result<SharedRoot, ShareError> {
    if RemoteEndpoint::looks_remote(value) {
        SharedRoot::parse(value)
    } else {
        Ok(SharedRoot::Local(resolve_path(&expand_home(value, home), base)))
    }
}

/// Find the nearest override file at or above `start_dir`.
pub fn find_override(start_dir: &Path) -> Option<PathBuf> {
    start_dir
        .ancestors()
        .map(|dir| dir.join(OVERRIDE_FILE))
        .find(|candidate| candidate.is_file())
}

fn default_shared_root(home: Option<&Path>) -> SharedRoot {
    let home = home.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
    SharedRoot::Local(home.join("Shared").join("dump"))
}

fn read_dotfile(path: &Path) -> Result<Option<String>, ShareError> {
    match fs::read_to_string(path) {
        Ok(contents) => {
            let value = contents.trim();
            Ok((!value.is_empty()).then(|| value.to_string()))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ShareError::io(path, e)),
    }
}

fn apply_layer(
    config: &mut SyncConfig,
    layer: &ConfigLayer,
    base: &Path,
    home: Option<&Path>,
) -> Result<(), ShareError> {
    if let Some(value) = &layer.local_root {
        let value = value.trim();
        config.local_root = if value.is_empty() {
            None
        } else {
            Some(resolve_path(&expand_home(value, home), base))
        };
    }
    if let Some(value) = &layer.shared_root {
        config.shared_root = parse_shared_root(value.trim(), base, home)?;
    }
    if let Some(secs) = layer.tolerance_secs {
        config.tolerance = Duration::try_from_secs_f64(secs).map_err(|_| ShareError::Config {
            message: format!("tolerance_secs must be a non-negative number, got {secs}"),
        })?;
    }
    if let Some(shell) = &layer.remote_shell {
        config.remote_shell = shell.clone();
    }
    if let Some(copy) = &layer.remote_copy {
        config.remote_copy = copy.clone();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_sources() {
        let temp = TempDir::new().unwrap();
        let home = temp.path().to_path_buf();
        let config = resolve_config(temp.path(), &ConfigSources::new(Some(home.clone()), None)).unwrap();
        assert!(config.local_root.is_none());
        assert_eq!(config.shared_root, SharedRoot::Local(home.join("Shared/dump")));
    }

    #[test]
    fn test_layer_rejects_unknown_keys() {
        assert!(ConfigLayer::parse("shared_rot = \"/x\"", Path::new("x.toml")).is_err());
    }

    #[test]
    fn test_negative_tolerance_rejected() {
        let mut config = SyncConfig::new(None, SharedRoot::Local("/s".into()));
        let layer = ConfigLayer {
            tolerance_secs: Some(-1.0),
            ..Default::default()
        };
        assert!(apply_layer(&mut config, &layer, Path::new("/"), None).is_err());
    }

    #[test]
    fn test_remote_shared_root_kept_verbatim() {
        let root = parse_shared_root("me@nas:~/dump", Path::new("/cwd"), None).unwrap();
        assert_eq!(root.to_string(), "me@nas:~/dump");
    }
}
