//! Pure lexical path helpers.
//!
//! These operate on path text only — no filesystem access, no symlink
//! awareness. Symlink-following resolution lives in the filesystem
//! implementations themselves.

use std::path::{Component, Path, PathBuf};

/// Normalize a path to an absolute form: resolve `.` and `..`, collapse
/// separators. Relative input is treated as relative to `/`.
///
/// `..` at the root stays at the root, as on POSIX.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::from("/");
    for component in path.components() {
        match component {
            Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(s) => out.push(s),
        }
    }
    out
}

/// Resolve `path` against `base`: absolute paths are normalized as-is,
/// relative paths are joined onto `base` first.
pub fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize(path)
    } else {
        normalize(&base.join(path))
    }
}

/// Number of named components in a path (`/` has depth 0, `/a/b` depth 2).
pub fn depth(path: &Path) -> usize {
    path.components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_absolute() {
        assert_eq!(normalize(Path::new("/a/b/c")), PathBuf::from("/a/b/c"));
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("/")), PathBuf::from("/"));
    }

    #[test]
    fn test_normalize_relative_is_rooted() {
        assert_eq!(normalize(Path::new("a/b")), PathBuf::from("/a/b"));
    }

    #[test]
    fn test_normalize_parent_at_root() {
        assert_eq!(normalize(Path::new("/../../x")), PathBuf::from("/x"));
    }

    #[test]
    fn test_resolve() {
        assert_eq!(
            resolve(Path::new("/home/user"), Path::new("docs/a.txt")),
            PathBuf::from("/home/user/docs/a.txt")
        );
        assert_eq!(
            resolve(Path::new("/home/user"), Path::new("/etc/hosts")),
            PathBuf::from("/etc/hosts")
        );
        assert_eq!(
            resolve(Path::new("/home/user"), Path::new("../other")),
            PathBuf::from("/home/other")
        );
    }

    #[test]
    fn test_depth() {
        assert_eq!(depth(Path::new("/")), 0);
        assert_eq!(depth(Path::new("/a")), 1);
        assert_eq!(depth(Path::new("/a/b/c")), 3);
    }
}
