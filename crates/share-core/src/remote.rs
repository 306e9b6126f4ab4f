//! External ssh/scp invocations for remote shared roots.
//!
//! Nothing here keeps a connection open: each call builds a fresh
//! [`Command`], runs it to completion and maps a non-zero exit status to an
//! error. No timeout is applied.

use std::process::{Command, Output};

use tracing::debug;

use crate::location::{RemoteEndpoint, RemotePath};

/// Programs used to reach remote shared roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTools {
    /// Remote shell program (`ssh`).
    pub shell: String,
    /// Remote copy program (`scp`).
    pub copy: String,
}

impl Default for RemoteTools {
    fn default() -> Self {
        Self {
            shell: "ssh".to_string(),
            copy: "scp".to_string(),
        }
    }
}

impl RemoteTools {
    /// Create tools with custom program names.
    pub fn new(shell: impl Into<String>, copy: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            copy: copy.into(),
        }
    }

    /// Run a shell command line on the endpoint.
    pub fn shell_command(&self, endpoint: &RemoteEndpoint, remote_cmd: &str) -> Command {
        let mut cmd = Command::new(&self.shell);
        cmd.arg(endpoint.destination()).arg(remote_cmd);
        cmd
    }

    /// `mkdir -p` on the remote side.
    pub fn mkdir_p(&self, endpoint: &RemoteEndpoint, dir: &str) -> Command {
        self.shell_command(endpoint, &format!("mkdir -p -- {}", quote_path(dir)))
    }

    /// `rm -f` on the remote side.
    pub fn remove(&self, target: &RemotePath) -> Command {
        self.shell_command(
            &target.endpoint,
            &format!("rm -f -- {}", quote_path(&target.path)),
        )
    }

    /// Print `<mtime> <size>` for a remote regular file; fails when absent.
    pub fn stat(&self, target: &RemotePath) -> Command {
        let quoted = quote_path(&target.path);
        self.shell_command(
            &target.endpoint,
            &format!("test -f {quoted} && stat -c '%Y %s' -- {quoted}"),
        )
    }

    /// List regular files under a remote directory as `<mtime>\t<relative>`.
    pub fn list_files(&self, endpoint: &RemoteEndpoint, root: &str) -> Command {
        let root = if root.is_empty() { "." } else { root };
        self.shell_command(
            endpoint,
            &format!("find {} -type f -printf '%T@\\t%P\\n'", quote_path(root)),
        )
    }

    /// Copy between `from` and `to`, preserving times and modes.
    ///
    /// Either argument may be a local path or a `user@host:path` string.
    pub fn copy(&self, from: &str, to: &str) -> Command {
        let mut cmd = Command::new(&self.copy);
        cmd.arg("-p").arg("-q").arg(from).arg(to);
        cmd
    }
}

/// Quote a string for a POSIX shell.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Quote a remote path, leaving a leading `~` or `~/` unquoted so the
/// remote shell still expands it to the home directory.
pub fn quote_path(path: &str) -> String {
    if path == "~" {
        return "~".to_string();
    }
    match path.strip_prefix("~/") {
        Some("") => "~/".to_string(),
        Some(rest) => format!("~/{}", shell_quote(rest)),
        None => shell_quote(path),
    }
}

/// Render a command line for logs and preview output.
pub fn describe(cmd: &Command) -> String {
    std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(|part| part.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Run a command to completion, treating a non-zero exit as failure.
///
/// The error string carries the exit status and trimmed stderr.
pub fn run(mut cmd: Command) -> Result<Output, String> {
    let line = describe(&cmd);
    debug!(command = %line, "running external command");

    let output = cmd
        .output()
        .map_err(|e| format!("failed to run `{line}`: {e}"))?;

    if output.status.success() {
        Ok(output)
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        if stderr.is_empty() {
            Err(format!("`{line}` exited with {}", output.status))
        } else {
            Err(format!("`{line}` exited with {}: {stderr}", output.status))
        }
    }
}
