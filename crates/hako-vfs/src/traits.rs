//! Core filesystem trait and types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::paths;

/// Kind of a filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
}

/// Metadata about a file, directory, or symlink.
#[derive(Debug, Clone)]
pub struct FsStat {
    /// Kind of entry.
    pub kind: EntryKind,
    /// Size in bytes (0 for directories, target length for symlinks).
    pub size: u64,
    /// Permission bits (e.g., 0o644). Stored, not enforced.
    pub mode: u32,
    /// Last modification time.
    pub modified: SystemTime,
}

impl FsStat {
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn is_symlink(&self) -> bool {
        self.kind == EntryKind::Symlink
    }
}

/// A directory entry returned by `list`.
#[derive(Debug, Clone)]
pub struct DirEntry {
    /// Name of the entry (not full path).
    pub name: String,
    /// Kind of entry.
    pub kind: EntryKind,
}

/// Abstract filesystem interface.
///
/// All operations take absolute paths. Implementations are free to accept
/// relative paths by resolving them against `/`.
///
/// `stat`, `read`, `write`, and friends follow symbolic links; `lstat` and
/// `read_link` operate on the link itself.
#[async_trait]
pub trait Filesystem: Send + Sync {
    /// Read the entire contents of a file.
    async fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Read a file as UTF-8 text.
    async fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let bytes = self.read(path).await?;
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Write data to a file, creating it (and missing parents) if needed.
    async fn write(&self, path: &Path, data: &[u8]) -> io::Result<()>;

    /// Append data to a file, creating it if it doesn't exist.
    async fn append(&self, path: &Path, data: &[u8]) -> io::Result<()>;

    /// Check if a path exists (follows symlinks).
    async fn exists(&self, path: &Path) -> bool {
        self.stat(path).await.is_ok()
    }

    /// Get metadata, following symlinks.
    async fn stat(&self, path: &Path) -> io::Result<FsStat>;

    /// Get metadata without following a final symlink.
    async fn lstat(&self, path: &Path) -> io::Result<FsStat>;

    /// Create a directory. With `recursive`, missing ancestors are created
    /// and an already-existing directory is not an error.
    async fn mkdir(&self, path: &Path, recursive: bool) -> io::Result<()>;

    /// List entries in a directory.
    async fn list(&self, path: &Path) -> io::Result<Vec<DirEntry>>;

    /// Remove a file, symlink, or directory. Removing a non-empty
    /// directory requires `recursive`.
    async fn remove(&self, path: &Path, recursive: bool) -> io::Result<()>;

    /// Copy a file (or, with `recursive`, a directory tree). Copying onto
    /// an existing directory places the source inside it.
    async fn copy(&self, src: &Path, dst: &Path, recursive: bool) -> io::Result<()>;

    /// Rename (move) a file, symlink, or directory tree.
    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Resolve `path` against `base` lexically (no symlink following).
    fn resolve_path(&self, base: &Path, path: &Path) -> PathBuf {
        paths::resolve(base, path)
    }

    /// Canonicalize a path, following symlinks. The result must exist.
    async fn real_path(&self, path: &Path) -> io::Result<PathBuf>;

    /// Enumerate every known absolute path, including `/`.
    async fn all_paths(&self) -> Vec<PathBuf>;

    /// Change permission bits (follows symlinks).
    async fn chmod(&self, path: &Path, mode: u32) -> io::Result<()>;

    /// Create a symbolic link at `link` pointing to `target`.
    async fn symlink(&self, target: &Path, link: &Path) -> io::Result<()>;

    /// Create a hard link at `link` aliasing the file at `original`.
    async fn hard_link(&self, original: &Path, link: &Path) -> io::Result<()>;

    /// Read the target of a symbolic link without following it.
    async fn read_link(&self, path: &Path) -> io::Result<PathBuf>;

    /// Set the modification time (follows symlinks).
    async fn set_times(&self, path: &Path, mtime: SystemTime) -> io::Result<()>;
}
