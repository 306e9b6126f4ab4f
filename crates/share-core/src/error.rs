//! Error types for mapping, configuration and transfer operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::location::Side;

/// Errors that can occur while mapping, probing or transferring an entry.
///
/// Every variant is recoverable at the granularity of a single entry: a
/// whole-tree operation counts the failure and moves on.
#[derive(Debug, Error)]
pub enum ShareError {
    /// Local path escapes the configured local root.
    #[error("{} is not under the local root ({})", path.display(), root.display())]
    NotUnderRoot { path: PathBuf, root: PathBuf },

    /// The operation needs a side that does not exist.
    #[error("{side} file does not exist: {path}")]
    MissingSource { path: String, side: Side },

    /// Sync was asked for a path that exists on neither side.
    #[error("File exists in neither location: {path}")]
    MissingBoth { path: String },

    /// The underlying copy, removal or remote command failed.
    #[error("Transfer {source_path} → {destination} failed: {message}")]
    TransferFailure {
        source_path: String,
        destination: String,
        message: String,
    },

    /// A whole-tree operation was requested without a local root.
    #[error("local root is not set; cannot run {operation}")]
    ConfigUnset { operation: String },

    /// A string that looked like a remote endpoint could not be parsed.
    #[error("Invalid remote endpoint: {spec}")]
    InvalidRemote { spec: String },

    /// Generic I/O error.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    Config { message: String },
}

impl ShareError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a transfer failure from anything printable.
    pub fn transfer(
        source: impl ToString,
        destination: impl ToString,
        message: impl Into<String>,
    ) -> Self {
        Self::TransferFailure {
            source_path: source.to_string(),
            destination: destination.to_string(),
            message: message.into(),
        }
    }

    /// Create a missing-source error.
    pub fn missing(path: impl ToString, side: Side) -> Self {
        Self::MissingSource {
            path: path.to_string(),
            side,
        }
    }

    /// Create a config-unset error for a named operation.
    pub fn config_unset(operation: impl Into<String>) -> Self {
        Self::ConfigUnset {
            operation: operation.into(),
        }
    }

    /// Whether this error only reports that a side is absent.
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::MissingSource { .. } | Self::MissingBoth { .. })
    }
}
