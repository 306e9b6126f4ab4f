//! Shared-root and location types.
//!
//! A shared root is either a directory on this machine or a remote endpoint
//! reached over ssh. Everything that touches the shared side matches on
//! [`SharedRoot`] or [`Location`] instead of inspecting strings.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::error::ShareError;

/// Which half of a managed pair something refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum Side {
    Local,
    Shared,
}

/// A remote endpoint parsed from `user@host:path`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteEndpoint {
    pub user: String,
    pub host: String,
    pub path: String,
}

impl RemoteEndpoint {
    /// Create a new endpoint.
    pub fn new(user: impl Into<String>, host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            host: host.into(),
            path: path.into(),
        }
    }

    /// Whether a string should be treated as a remote endpoint.
    pub fn looks_remote(spec: &str) -> bool {
        spec.contains('@') && spec.contains(':')
    }

    /// The `user@host` argument handed to ssh.
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    /// Address a path on this endpoint.
    pub fn at(&self, path: impl Into<String>) -> RemotePath {
        RemotePath {
            endpoint: self.clone(),
            path: path.into(),
        }
    }
}

impl FromStr for RemoteEndpoint {
    type Err = ShareError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let invalid = || ShareError::InvalidRemote {
            spec: spec.to_string(),
        };
        let (user, rest) = spec.split_once('@').ok_or_else(invalid)?;
        let (host, path) = rest.split_once(':').ok_or_else(invalid)?;
        if user.is_empty() || host.is_empty() {
            return Err(invalid());
        }
        Ok(Self::new(user, host, path))
    }
}

impl fmt::Display for RemoteEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.user, self.host, self.path)
    }
}

/// A concrete path on a remote endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemotePath {
    pub endpoint: RemoteEndpoint,
    pub path: String,
}

impl RemotePath {
    /// Parent directory on the remote side, if any.
    pub fn parent(&self) -> Option<String> {
        let trimmed = self.path.trim_end_matches('/');
        match trimmed.rfind('/') {
            Some(0) => Some("/".to_string()),
            Some(idx) => Some(trimmed[..idx].to_string()),
            None => None,
        }
    }

    /// Final path component.
    pub fn file_name(&self) -> &str {
        let trimmed = self.path.trim_end_matches('/');
        trimmed.rsplit('/').next().unwrap_or(trimmed)
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.endpoint.destination(), self.path)
    }
}

/// Where the mirrored tree lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SharedRoot {
    Local(PathBuf),
    Remote(RemoteEndpoint),
}

impl SharedRoot {
    /// Parse a configured shared-root string.
    ///
    /// Strings containing both `@` and `:` are remote endpoints; anything else
    /// is a filesystem path taken as-is.
    pub fn parse(spec: &str) -> Result<Self, ShareError> {
        if RemoteEndpoint::looks_remote(spec) {
            Ok(Self::Remote(spec.parse()?))
        } else {
            Ok(Self::Local(PathBuf::from(spec)))
        }
    }

    /// Check if the shared side lives on another host.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }

    /// Location of the shared root itself.
    pub fn location(&self) -> Location {
        match self {
            Self::Local(path) => Location::Local(path.clone()),
            Self::Remote(endpoint) => Location::Remote(endpoint.at(endpoint.path.clone())),
        }
    }

    /// Re-root a relative path under the shared root.
    ///
    /// Remote roots are joined by string concatenation with `/`, never with
    /// the local platform's path rules.
    pub fn join(&self, relative: &Path) -> Location {
        match self {
            Self::Local(root) => {
                if relative.as_os_str().is_empty() {
                    Location::Local(root.clone())
                } else {
                    Location::Local(root.join(relative))
                }
            }
            Self::Remote(endpoint) => {
                Location::Remote(endpoint.at(join_remote(&endpoint.path, relative)))
            }
        }
    }

    /// Strip the shared-root prefix from a shared location.
    pub fn relative(&self, location: &Location) -> Option<PathBuf> {
        match (self, location) {
            (Self::Local(root), Location::Local(path)) => {
                path.strip_prefix(root).ok().map(Path::to_path_buf)
            }
            (Self::Remote(endpoint), Location::Remote(remote)) => {
                if remote.endpoint.user != endpoint.user || remote.endpoint.host != endpoint.host {
                    return None;
                }
                let base = endpoint.path.trim_end_matches('/');
                let rest = if base.is_empty() {
                    remote.path.as_str()
                } else {
                    remote.path.strip_prefix(base)?
                };
                if !rest.is_empty() && !rest.starts_with('/') && !base.is_empty() {
                    return None;
                }
                Some(PathBuf::from(rest.trim_start_matches('/')))
            }
            _ => None,
        }
    }
}

impl TryFrom<String> for SharedRoot {
    type Error = ShareError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SharedRoot> for String {
    fn from(root: SharedRoot) -> Self {
        root.to_string()
    }
}

impl fmt::Display for SharedRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Remote(endpoint) => write!(f, "{endpoint}"),
        }
    }
}

/// One endpoint of a transfer: a local file or a file on a remote host.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Location {
    Local(PathBuf),
    Remote(RemotePath),
}

impl Location {
    /// Check if this location is on another host.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }

    /// The local path, when there is one.
    pub fn as_local(&self) -> Option<&Path> {
        match self {
            Self::Local(path) => Some(path),
            Self::Remote(_) => None,
        }
    }

    /// Final path component, lossily converted.
    pub fn file_name(&self) -> String {
        match self {
            Self::Local(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            Self::Remote(remote) => remote.file_name().to_string(),
        }
    }
}

impl From<PathBuf> for Location {
    fn from(path: PathBuf) -> Self {
        Self::Local(path)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Remote(remote) => write!(f, "{remote}"),
        }
    }
}

/// Join a relative path onto a remote base using `/` separators.
pub fn join_remote(base: &str, relative: &Path) -> String {
    let tail = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/");

    if tail.is_empty() {
        base.to_string()
    } else if base.is_empty() {
        tail
    } else {
        format!("{}/{}", base.trim_end_matches('/'), tail)
    }
}
