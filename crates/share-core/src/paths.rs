//! Path normalization helpers.

use std::path::{Component, Path, PathBuf};

/// Turn `path` into an absolute, normalized path.
///
/// Relative paths are taken against `base`. `.` and `..` are folded
/// lexically, then the longest existing prefix is canonicalized so symlinked
/// roots compare equal to the paths beneath them. The path itself need not
/// exist.
pub fn resolve_path(path: &Path, base: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };

    let normalized = normalize(&joined);

    let mut existing = normalized.as_path();
    let mut tail = Vec::new();
    loop {
        if let Ok(canonical) = existing.canonicalize() {
            let mut result = canonical;
            for part in tail.iter().rev() {
                result.push(part);
            }
            return result;
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                tail.push(name.to_os_string());
                existing = parent;
            }
            _ => return normalized,
        }
    }
}

/// Fold `.` and `..` components without touching the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Expand a leading `~` against `home`.
pub fn expand_home(value: &str, home: Option<&Path>) -> PathBuf {
    match (value.strip_prefix('~'), home) {
        (Some(""), Some(home)) => home.to_path_buf(),
        (Some(rest), Some(home)) if rest.starts_with('/') => home.join(&rest[1..]),
        _ => PathBuf::from(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("/a/b/..")), PathBuf::from("/a"));
    }

    #[test]
    fn test_resolve_relative_against_base() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().canonicalize().unwrap();
        let resolved = resolve_path(Path::new("missing/dir/../file.txt"), &base);
        assert_eq!(resolved, base.join("missing/file.txt"));
    }

    #[test]
    fn test_resolve_absolute_ignores_base() {
        let temp = TempDir::new().unwrap();
        let canonical = temp.path().canonicalize().unwrap();
        let resolved = resolve_path(&canonical.join("x"), Path::new("/nowhere"));
        assert_eq!(resolved, canonical.join("x"));
    }

    #[test]
    fn test_expand_home() {
        let home = Path::new("/home/me");
        assert_eq!(expand_home("~", Some(home)), PathBuf::from("/home/me"));
        assert_eq!(expand_home("~/work", Some(home)), PathBuf::from("/home/me/work"));
        assert_eq!(expand_home("/abs", Some(home)), PathBuf::from("/abs"));
        assert_eq!(expand_home("~/work", None), PathBuf::from("~/work"));
    }
}
