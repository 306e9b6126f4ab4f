//! Ignore rules and the private-file heuristic.
//!
//! Rules come from `.shareignore` files, one shell glob per line. A rule set
//! only grows as traversal descends: a directory's file adds patterns for
//! itself and everything below it, and never removes inherited ones.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::warn;

use share_core::ShareError;

/// Name of the per-directory ignore file.
pub const IGNORE_FILE: &str = ".shareignore";

/// Prefix of platform shadow files (AppleDouble).
pub const SHADOW_PREFIX: &str = "._";

/// Name prefixes that mark a file as private.
pub const PRIVATE_PREFIXES: [&str; 5] = [SHADOW_PREFIX, "_", "~", ".", "#"];

/// Why an entry was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Matched an ignore pattern.
    Pattern(String),
    /// Name looks private.
    Private,
}

/// Immutable, ordered set of ignore patterns.
///
/// Cloning is cheap; extending returns a new set and leaves `self` intact,
/// so sibling subtrees never see each other's rules.
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    patterns: Arc<Vec<String>>,
    set: Arc<GlobSet>,
}

impl Default for IgnoreRules {
    fn default() -> Self {
        Self {
            patterns: Arc::new(Vec::new()),
            set: Arc::new(GlobSet::empty()),
        }
    }
}

impl IgnoreRules {
    /// Create an empty rule set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a rule set from patterns.
    pub fn from_patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new().extended(patterns)
    }

    /// A new set with `more` appended after the existing patterns.
    ///
    /// Patterns that fail to compile are logged and dropped.
    pub fn extended<I, S>(&self, more: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut patterns: Vec<String> = self.patterns.as_ref().clone();
        let before = patterns.len();
        for pattern in more {
            let pattern = pattern.into();
            match compile(&pattern) {
                Ok(_) => patterns.push(pattern),
                Err(e) => warn!(pattern = %pattern, error = %e, "ignoring invalid ignore pattern"),
            }
        }
        if patterns.len() == before {
            return self.clone();
        }

        let mut builder = GlobSetBuilder::new();
        for pattern in &patterns {
            if let Ok(glob) = compile(pattern) {
                builder.add(glob);
            }
        }
        let set = builder.build().unwrap_or_else(|e| {
            warn!(error = %e, "failed to build ignore set; ignoring all patterns");
            GlobSet::empty()
        });

        Self {
            patterns: Arc::new(patterns),
            set: Arc::new(set),
        }
    }

    /// Patterns in declaration order.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Number of patterns.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Check if there are no patterns.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// First pattern matching either the bare name or the full path.
    pub fn matching(&self, name: &str, path: &Path) -> Option<&str> {
        if self.set.is_empty() {
            return None;
        }
        let mut hits = self.set.matches(name);
        if hits.is_empty() {
            hits = self.set.matches(path);
        }
        hits.first().map(|&idx| self.patterns[idx].as_str())
    }

    /// Check if either the bare name or the full path matches.
    pub fn is_match(&self, name: &str, path: &Path) -> bool {
        self.matching(name, path).is_some()
    }
}

/// Compile one pattern with shell-glob semantics.
///
/// `*` crosses `/` and backslashes are literal, as in `fnmatch`. Matching is
/// case-sensitive.
fn compile(pattern: &str) -> Result<globset::Glob, globset::Error> {
    GlobBuilder::new(pattern)
        .literal_separator(false)
        .backslash_escape(false)
        .case_insensitive(false)
        .build()
}

/// Parse the contents of an ignore file.
///
/// `#` starts a comment anywhere on a line, blank lines are dropped and a
/// single leading `/` is stripped. A stripped pattern is still matched
/// unanchored.
pub fn parse_ignore_file(contents: &str) -> Vec<String> {
    contents
        .lines()
        .filter_map(|line| {
            let pattern = line.split('#').next().unwrap_or("").trim();
            let pattern = pattern.strip_prefix('/').unwrap_or(pattern);
            (!pattern.is_empty()).then(|| pattern.to_string())
        })
        .collect()
}

/// Read the ignore file in `dir`, if any.
pub fn read_ignore_file(dir: &Path) -> Result<Vec<String>, ShareError> {
    let path = dir.join(IGNORE_FILE);
    match fs::read_to_string(&path) {
        Ok(contents) => Ok(parse_ignore_file(&contents)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(ShareError::io(path, e)),
    }
}

/// Check if a name looks like a private file.
pub fn looks_private(name: &str) -> bool {
    PRIVATE_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
}

/// Check if a name is a platform shadow file.
pub fn is_shadow(name: &str) -> bool {
    name.starts_with(SHADOW_PREFIX)
}

/// Name of the shadow file that would sit next to `name`.
pub fn shadow_name(name: &str) -> String {
    format!("{SHADOW_PREFIX}{name}")
}

/// Decide whether a traversal entry is skipped.
///
/// The private heuristic only applies when `skip_private` is set; callers
/// doing removal or retrieval pass `false` so explicitly managed files are
/// never silently left behind.
pub fn should_skip(
    name: &str,
    path: &Path,
    rules: &IgnoreRules,
    skip_private: bool,
) -> Option<SkipReason> {
    if let Some(pattern) = rules.matching(name, path) {
        return Some(SkipReason::Pattern(pattern.to_string()));
    }
    if skip_private && looks_private(name) {
        return Some(SkipReason::Private);
    }
    None
}
