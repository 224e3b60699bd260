//! In-memory filesystem implementation.
//!
//! The volatile backing store every shell operation executes against.
//! Thread-safe via internal `RwLock`; all data is lost when dropped.
//! Durability is layered on top by `hako-persist`.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::ffi::OsString;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;

use crate::paths;
use crate::traits::{DirEntry, EntryKind, Filesystem, FsStat};

/// Maximum symlink hops before resolution gives up.
const MAX_LINK_DEPTH: usize = 32;

const DEFAULT_FILE_MODE: u32 = 0o644;
const DEFAULT_DIR_MODE: u32 = 0o755;
const DEFAULT_LINK_MODE: u32 = 0o777;

/// File body plus metadata. Shared between hard links.
#[derive(Debug)]
struct Inode {
    data: Vec<u8>,
    mode: u32,
    modified: SystemTime,
}

/// Entry in the memory filesystem.
#[derive(Debug, Clone)]
enum Node {
    File(Arc<RwLock<Inode>>),
    Directory { mode: u32, modified: SystemTime },
    Symlink { target: PathBuf, mode: u32, modified: SystemTime },
}

type Entries = HashMap<PathBuf, Node>;

/// In-memory filesystem.
///
/// Entries are keyed by normalized absolute path. The root `/` is implicit
/// and never stored. Writes create missing parent directories.
#[derive(Debug, Default)]
pub struct MemoryFs {
    entries: RwLock<Entries>,
}

impl MemoryFs {
    /// Create a new empty in-memory filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    fn read_entries(&self) -> io::Result<RwLockReadGuard<'_, Entries>> {
        self.entries
            .read()
            .map_err(|_| io::Error::other("lock poisoned"))
    }

    fn write_entries(&self) -> io::Result<RwLockWriteGuard<'_, Entries>> {
        self.entries
            .write()
            .map_err(|_| io::Error::other("lock poisoned"))
    }

    fn read_inode(inode: &RwLock<Inode>) -> io::Result<RwLockReadGuard<'_, Inode>> {
        inode.read().map_err(|_| io::Error::other("lock poisoned"))
    }

    fn write_inode(inode: &RwLock<Inode>) -> io::Result<RwLockWriteGuard<'_, Inode>> {
        inode.write().map_err(|_| io::Error::other("lock poisoned"))
    }

    fn not_found(path: &Path) -> io::Error {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("not found: {}", path.display()),
        )
    }

    fn is_a_directory(path: &Path) -> io::Error {
        io::Error::new(
            io::ErrorKind::IsADirectory,
            format!("is a directory: {}", path.display()),
        )
    }

    fn not_a_directory(path: &Path) -> io::Error {
        io::Error::new(
            io::ErrorKind::NotADirectory,
            format!("not a directory: {}", path.display()),
        )
    }

    /// Resolve a path to its final location, substituting symlinks.
    ///
    /// Intermediate symlinks are always followed; a symlink in the final
    /// component is followed only when `follow_last` is set. The returned
    /// path may not exist — resolution only needs the links that do.
    fn lookup(entries: &Entries, path: &Path, follow_last: bool) -> io::Result<PathBuf> {
        let normalized = paths::normalize(path);
        let mut parts: VecDeque<OsString> = normalized
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_os_string()),
                _ => None,
            })
            .collect();

        let mut resolved = PathBuf::from("/");
        let mut hops = 0usize;

        while let Some(part) = parts.pop_front() {
            resolved.push(&part);
            let last = parts.is_empty();

            if let Some(Node::Symlink { target, .. }) = entries.get(&resolved) {
                if last && !follow_last {
                    break;
                }
                hops += 1;
                if hops > MAX_LINK_DEPTH {
                    return Err(io::Error::other(format!(
                        "too many levels of symbolic links: {}",
                        path.display()
                    )));
                }
                let base = resolved
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from("/"));
                let retarget = paths::resolve(&base, target);
                let mut reseeded: VecDeque<OsString> = retarget
                    .components()
                    .filter_map(|c| match c {
                        Component::Normal(s) => Some(s.to_os_string()),
                        _ => None,
                    })
                    .collect();
                reseeded.extend(parts.drain(..));
                parts = reseeded;
                resolved = PathBuf::from("/");
            }
        }

        Ok(resolved)
    }

    /// Create missing ancestor directories of `path`.
    ///
    /// Fails with `NotADirectory` if an ancestor exists as a file or
    /// symlink (symlink ancestors have already been substituted by
    /// `lookup` at this point).
    fn ensure_parents(entries: &mut Entries, path: &Path) -> io::Result<()> {
        let mut current = PathBuf::from("/");
        for component in path.parent().into_iter().flat_map(|p| p.components()) {
            if let Component::Normal(s) = component {
                current.push(s);
                match entries.get(&current) {
                    Some(Node::Directory { .. }) => {}
                    Some(_) => return Err(Self::not_a_directory(&current)),
                    None => {
                        entries.insert(
                            current.clone(),
                            Node::Directory {
                                mode: DEFAULT_DIR_MODE,
                                modified: SystemTime::now(),
                            },
                        );
                    }
                }
            }
        }
        Ok(())
    }

    fn stat_of(entries: &Entries, resolved: &Path) -> io::Result<FsStat> {
        if resolved == Path::new("/") {
            return Ok(FsStat {
                kind: EntryKind::Directory,
                size: 0,
                mode: DEFAULT_DIR_MODE,
                modified: SystemTime::now(),
            });
        }
        match entries.get(resolved) {
            Some(Node::File(inode)) => {
                let inode = Self::read_inode(inode)?;
                Ok(FsStat {
                    kind: EntryKind::File,
                    size: inode.data.len() as u64,
                    mode: inode.mode,
                    modified: inode.modified,
                })
            }
            Some(Node::Directory { mode, modified }) => Ok(FsStat {
                kind: EntryKind::Directory,
                size: 0,
                mode: *mode,
                modified: *modified,
            }),
            Some(Node::Symlink { target, mode, modified }) => Ok(FsStat {
                kind: EntryKind::Symlink,
                size: target.as_os_str().len() as u64,
                mode: *mode,
                modified: *modified,
            }),
            None => Err(Self::not_found(resolved)),
        }
    }

    fn insert_file(
        entries: &mut Entries,
        resolved: PathBuf,
        data: Vec<u8>,
        mode: u32,
        modified: SystemTime,
    ) -> io::Result<()> {
        Self::ensure_parents(entries, &resolved)?;
        entries.insert(
            resolved,
            Node::File(Arc::new(RwLock::new(Inode { data, mode, modified }))),
        );
        Ok(())
    }

    /// Write a file with explicit mode and mtime.
    ///
    /// Used by the restore path of `hako-persist` to recreate entries with
    /// their persisted metadata instead of fresh defaults.
    pub async fn write_with(
        &self,
        path: &Path,
        data: &[u8],
        mode: u32,
        mtime: SystemTime,
    ) -> io::Result<()> {
        let mut entries = self.write_entries()?;
        let resolved = Self::lookup(&entries, path, true)?;
        if resolved == Path::new("/") {
            return Err(Self::is_a_directory(path));
        }
        match entries.get(&resolved) {
            Some(Node::Directory { .. }) => return Err(Self::is_a_directory(path)),
            Some(Node::File(inode)) => {
                let mut inode = Self::write_inode(inode)?;
                inode.data = data.to_vec();
                inode.mode = mode;
                inode.modified = mtime;
                return Ok(());
            }
            _ => {}
        }
        Self::insert_file(&mut entries, resolved, data.to_vec(), mode, mtime)
    }

    /// Recursively create a directory with explicit mode and mtime.
    ///
    /// An already-existing directory has its metadata updated.
    pub async fn mkdir_with(&self, path: &Path, mode: u32, mtime: SystemTime) -> io::Result<()> {
        let mut entries = self.write_entries()?;
        let resolved = Self::lookup(&entries, path, true)?;
        if resolved == Path::new("/") {
            return Ok(());
        }
        match entries.get_mut(&resolved) {
            Some(Node::Directory { mode: m, modified }) => {
                *m = mode;
                *modified = mtime;
                Ok(())
            }
            Some(_) => Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("file exists: {}", path.display()),
            )),
            None => {
                Self::ensure_parents(&mut entries, &resolved)?;
                entries.insert(resolved, Node::Directory { mode, modified: mtime });
                Ok(())
            }
        }
    }

    /// Create a symbolic link with explicit mode and mtime.
    pub async fn symlink_with(
        &self,
        target: &Path,
        link: &Path,
        mode: u32,
        mtime: SystemTime,
    ) -> io::Result<()> {
        let mut entries = self.write_entries()?;
        let resolved = Self::lookup(&entries, link, false)?;
        if resolved == Path::new("/") || entries.contains_key(&resolved) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("file exists: {}", link.display()),
            ));
        }
        Self::ensure_parents(&mut entries, &resolved)?;
        entries.insert(
            resolved,
            Node::Symlink {
                target: target.to_path_buf(),
                mode,
                modified: mtime,
            },
        );
        Ok(())
    }

    /// Deep-copy a node: files get a fresh inode, links keep their target.
    fn clone_node(node: &Node, modified: SystemTime) -> io::Result<Node> {
        Ok(match node {
            Node::File(inode) => {
                let inode = Self::read_inode(inode)?;
                Node::File(Arc::new(RwLock::new(Inode {
                    data: inode.data.clone(),
                    mode: inode.mode,
                    modified,
                })))
            }
            Node::Directory { mode, .. } => Node::Directory { mode: *mode, modified },
            Node::Symlink { target, mode, .. } => Node::Symlink {
                target: target.clone(),
                mode: *mode,
                modified,
            },
        })
    }
}

#[async_trait]
impl Filesystem for MemoryFs {
    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let entries = self.read_entries()?;
        let resolved = Self::lookup(&entries, path, true)?;
        if resolved == Path::new("/") {
            return Err(Self::is_a_directory(path));
        }
        match entries.get(&resolved) {
            Some(Node::File(inode)) => Ok(Self::read_inode(inode)?.data.clone()),
            Some(Node::Directory { .. }) => Err(Self::is_a_directory(path)),
            Some(Node::Symlink { .. }) => Err(Self::not_found(path)),
            None => Err(Self::not_found(path)),
        }
    }

    async fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        let mut entries = self.write_entries()?;
        let resolved = Self::lookup(&entries, path, true)?;
        if resolved == Path::new("/") {
            return Err(Self::is_a_directory(path));
        }
        match entries.get(&resolved) {
            Some(Node::Directory { .. }) => return Err(Self::is_a_directory(path)),
            Some(Node::File(inode)) => {
                let mut inode = Self::write_inode(inode)?;
                inode.data = data.to_vec();
                inode.modified = SystemTime::now();
                return Ok(());
            }
            _ => {}
        }
        Self::insert_file(
            &mut entries,
            resolved,
            data.to_vec(),
            DEFAULT_FILE_MODE,
            SystemTime::now(),
        )
    }

    async fn append(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        let mut entries = self.write_entries()?;
        let resolved = Self::lookup(&entries, path, true)?;
        if resolved == Path::new("/") {
            return Err(Self::is_a_directory(path));
        }
        match entries.get(&resolved) {
            Some(Node::Directory { .. }) => return Err(Self::is_a_directory(path)),
            Some(Node::File(inode)) => {
                let mut inode = Self::write_inode(inode)?;
                inode.data.extend_from_slice(data);
                inode.modified = SystemTime::now();
                return Ok(());
            }
            _ => {}
        }
        Self::insert_file(
            &mut entries,
            resolved,
            data.to_vec(),
            DEFAULT_FILE_MODE,
            SystemTime::now(),
        )
    }

    async fn stat(&self, path: &Path) -> io::Result<FsStat> {
        let entries = self.read_entries()?;
        let resolved = Self::lookup(&entries, path, true)?;
        Self::stat_of(&entries, &resolved)
    }

    async fn lstat(&self, path: &Path) -> io::Result<FsStat> {
        let entries = self.read_entries()?;
        let resolved = Self::lookup(&entries, path, false)?;
        Self::stat_of(&entries, &resolved)
    }

    async fn mkdir(&self, path: &Path, recursive: bool) -> io::Result<()> {
        let mut entries = self.write_entries()?;
        let resolved = Self::lookup(&entries, path, true)?;
        if resolved == Path::new("/") {
            return Ok(());
        }
        match entries.get(&resolved) {
            Some(Node::Directory { .. }) => return Ok(()),
            Some(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("file exists: {}", path.display()),
                ))
            }
            None => {}
        }
        if recursive {
            Self::ensure_parents(&mut entries, &resolved)?;
        } else {
            let parent = resolved
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("/"));
            if parent != Path::new("/") {
                match entries.get(&parent) {
                    Some(Node::Directory { .. }) => {}
                    Some(_) => return Err(Self::not_a_directory(&parent)),
                    None => return Err(Self::not_found(&parent)),
                }
            }
        }
        entries.insert(
            resolved,
            Node::Directory {
                mode: DEFAULT_DIR_MODE,
                modified: SystemTime::now(),
            },
        );
        Ok(())
    }

    async fn list(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let entries = self.read_entries()?;
        let resolved = Self::lookup(&entries, path, true)?;

        if resolved != Path::new("/") {
            match entries.get(&resolved) {
                Some(Node::Directory { .. }) => {}
                Some(_) => return Err(Self::not_a_directory(path)),
                None => return Err(Self::not_found(path)),
            }
        }

        let mut result = Vec::new();
        for (entry_path, node) in entries.iter() {
            if entry_path.parent() == Some(resolved.as_path()) {
                if let Some(name) = entry_path.file_name() {
                    let kind = match node {
                        Node::File(_) => EntryKind::File,
                        Node::Directory { .. } => EntryKind::Directory,
                        Node::Symlink { .. } => EntryKind::Symlink,
                    };
                    result.push(DirEntry {
                        name: name.to_string_lossy().into_owned(),
                        kind,
                    });
                }
            }
        }

        // Sort for consistent ordering
        result.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(result)
    }

    async fn remove(&self, path: &Path, recursive: bool) -> io::Result<()> {
        let mut entries = self.write_entries()?;
        let resolved = Self::lookup(&entries, path, false)?;
        if resolved == Path::new("/") {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "cannot remove root directory",
            ));
        }
        match entries.get(&resolved) {
            Some(Node::Directory { .. }) => {
                let has_children = entries
                    .keys()
                    .any(|k| k != &resolved && k.starts_with(&resolved));
                if has_children && !recursive {
                    return Err(io::Error::new(
                        io::ErrorKind::DirectoryNotEmpty,
                        format!("directory not empty: {}", path.display()),
                    ));
                }
                entries.retain(|k, _| !k.starts_with(&resolved));
                Ok(())
            }
            Some(_) => {
                entries.remove(&resolved);
                Ok(())
            }
            None => Err(Self::not_found(path)),
        }
    }

    async fn copy(&self, src: &Path, dst: &Path, recursive: bool) -> io::Result<()> {
        let mut entries = self.write_entries()?;
        let src_resolved = Self::lookup(&entries, src, true)?;
        let mut dst_resolved = Self::lookup(&entries, dst, true)?;

        // Copying onto an existing directory places the source inside it.
        if matches!(entries.get(&dst_resolved), Some(Node::Directory { .. })) {
            let name = src_resolved
                .file_name()
                .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid source"))?;
            dst_resolved.push(name);
        }

        let src_node = match entries.get(&src_resolved) {
            Some(node) => node.clone(),
            None => return Err(Self::not_found(src)),
        };

        match src_node {
            Node::Directory { .. } => {
                if !recursive {
                    return Err(Self::is_a_directory(src));
                }
                if dst_resolved.starts_with(&src_resolved) {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "cannot copy a directory into itself",
                    ));
                }
                Self::ensure_parents(&mut entries, &dst_resolved)?;
                let now = SystemTime::now();
                let subtree: Vec<(PathBuf, Node)> = entries
                    .iter()
                    .filter(|(k, _)| k.starts_with(&src_resolved))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                for (key, node) in subtree {
                    let suffix = key
                        .strip_prefix(&src_resolved)
                        .map_err(|_| io::Error::other("copy rekey failed"))?;
                    let new_key = dst_resolved.join(suffix);
                    entries.insert(new_key, Self::clone_node(&node, now)?);
                }
                Ok(())
            }
            node => {
                Self::ensure_parents(&mut entries, &dst_resolved)?;
                entries.insert(dst_resolved, Self::clone_node(&node, SystemTime::now())?);
                Ok(())
            }
        }
    }

    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let mut entries = self.write_entries()?;
        let from_resolved = Self::lookup(&entries, from, false)?;
        if from_resolved == Path::new("/") {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "cannot move root directory",
            ));
        }
        if !entries.contains_key(&from_resolved) {
            return Err(Self::not_found(from));
        }

        let mut to_resolved = Self::lookup(&entries, to, false)?;
        if matches!(entries.get(&to_resolved), Some(Node::Directory { .. })) {
            let name = from_resolved
                .file_name()
                .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid source"))?;
            to_resolved.push(name);
        }
        if to_resolved == from_resolved {
            return Ok(());
        }
        if to_resolved.starts_with(&from_resolved) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "cannot move a directory into itself",
            ));
        }
        if matches!(entries.get(&to_resolved), Some(Node::Directory { .. })) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("destination exists: {}", to.display()),
            ));
        }

        Self::ensure_parents(&mut entries, &to_resolved)?;
        entries.remove(&to_resolved);

        let moved: Vec<PathBuf> = entries
            .keys()
            .filter(|k| k.starts_with(&from_resolved))
            .cloned()
            .collect();
        for key in moved {
            if let Some(node) = entries.remove(&key) {
                let suffix = key
                    .strip_prefix(&from_resolved)
                    .map_err(|_| io::Error::other("rename rekey failed"))?;
                entries.insert(to_resolved.join(suffix), node);
            }
        }
        Ok(())
    }

    async fn real_path(&self, path: &Path) -> io::Result<PathBuf> {
        let entries = self.read_entries()?;
        let resolved = Self::lookup(&entries, path, true)?;
        if resolved == Path::new("/") || entries.contains_key(&resolved) {
            Ok(resolved)
        } else {
            Err(Self::not_found(path))
        }
    }

    async fn all_paths(&self) -> Vec<PathBuf> {
        let Ok(entries) = self.read_entries() else {
            return Vec::new();
        };
        let mut paths = vec![PathBuf::from("/")];
        paths.extend(entries.keys().cloned());
        paths.sort();
        paths
    }

    async fn chmod(&self, path: &Path, mode: u32) -> io::Result<()> {
        let mut entries = self.write_entries()?;
        let resolved = Self::lookup(&entries, path, true)?;
        match entries.get_mut(&resolved) {
            Some(Node::File(inode)) => {
                Self::write_inode(inode)?.mode = mode;
                Ok(())
            }
            Some(Node::Directory { mode: m, .. }) | Some(Node::Symlink { mode: m, .. }) => {
                *m = mode;
                Ok(())
            }
            None => Err(Self::not_found(path)),
        }
    }

    async fn symlink(&self, target: &Path, link: &Path) -> io::Result<()> {
        self.symlink_with(target, link, DEFAULT_LINK_MODE, SystemTime::now())
            .await
    }

    async fn hard_link(&self, original: &Path, link: &Path) -> io::Result<()> {
        let mut entries = self.write_entries()?;
        let original_resolved = Self::lookup(&entries, original, true)?;
        let inode = match entries.get(&original_resolved) {
            Some(Node::File(inode)) => Arc::clone(inode),
            Some(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    format!("hard link not allowed: {}", original.display()),
                ))
            }
            None => return Err(Self::not_found(original)),
        };
        let link_resolved = Self::lookup(&entries, link, false)?;
        if link_resolved == Path::new("/") || entries.contains_key(&link_resolved) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("file exists: {}", link.display()),
            ));
        }
        Self::ensure_parents(&mut entries, &link_resolved)?;
        entries.insert(link_resolved, Node::File(inode));
        Ok(())
    }

    async fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        let entries = self.read_entries()?;
        let resolved = Self::lookup(&entries, path, false)?;
        match entries.get(&resolved) {
            Some(Node::Symlink { target, .. }) => Ok(target.clone()),
            Some(_) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a symlink: {}", path.display()),
            )),
            None => Err(Self::not_found(path)),
        }
    }

    async fn set_times(&self, path: &Path, mtime: SystemTime) -> io::Result<()> {
        let mut entries = self.write_entries()?;
        let resolved = Self::lookup(&entries, path, true)?;
        match entries.get_mut(&resolved) {
            Some(Node::File(inode)) => {
                Self::write_inode(inode)?.modified = mtime;
                Ok(())
            }
            Some(Node::Directory { modified, .. }) | Some(Node::Symlink { modified, .. }) => {
                *modified = mtime;
                Ok(())
            }
            None => Err(Self::not_found(path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    #[tokio::test]
    async fn test_write_and_read() {
        let fs = MemoryFs::new();
        fs.write(Path::new("/test.txt"), b"hello world").await.unwrap();
        let data = fs.read(Path::new("/test.txt")).await.unwrap();
        assert_eq!(data, b"hello world");
    }

    #[tokio::test]
    async fn test_read_not_found() {
        let fs = MemoryFs::new();
        let result = fs.read(Path::new("/nonexistent.txt")).await;
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_nested_write_creates_parents() {
        let fs = MemoryFs::new();
        fs.write(Path::new("/a/b/c/file.txt"), b"nested").await.unwrap();

        assert!(fs.stat(Path::new("/a")).await.unwrap().is_dir());
        assert!(fs.stat(Path::new("/a/b")).await.unwrap().is_dir());
        assert!(fs.stat(Path::new("/a/b/c")).await.unwrap().is_dir());

        let data = fs.read(Path::new("/a/b/c/file.txt")).await.unwrap();
        assert_eq!(data, b"nested");
    }

    #[tokio::test]
    async fn test_write_through_file_ancestor_fails() {
        let fs = MemoryFs::new();
        fs.write(Path::new("/file"), b"x").await.unwrap();
        let result = fs.write(Path::new("/file/child.txt"), b"y").await;
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotADirectory);
    }

    #[tokio::test]
    async fn test_append() {
        let fs = MemoryFs::new();
        fs.append(Path::new("/log.txt"), b"one\n").await.unwrap();
        fs.append(Path::new("/log.txt"), b"two\n").await.unwrap();
        let data = fs.read(Path::new("/log.txt")).await.unwrap();
        assert_eq!(data, b"one\ntwo\n");
    }

    #[tokio::test]
    async fn test_list_directory() {
        let fs = MemoryFs::new();
        fs.write(Path::new("/a.txt"), b"a").await.unwrap();
        fs.write(Path::new("/b.txt"), b"b").await.unwrap();
        fs.mkdir(Path::new("/subdir"), false).await.unwrap();

        let entries = fs.list(Path::new("/")).await.unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].name, "a.txt");
        assert_eq!(entries[0].kind, EntryKind::File);
        assert_eq!(entries[2].name, "subdir");
        assert_eq!(entries[2].kind, EntryKind::Directory);
    }

    #[tokio::test]
    async fn test_mkdir_non_recursive_requires_parent() {
        let fs = MemoryFs::new();
        let result = fs.mkdir(Path::new("/a/b"), false).await;
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);

        fs.mkdir(Path::new("/a/b"), true).await.unwrap();
        assert!(fs.stat(Path::new("/a/b")).await.unwrap().is_dir());
    }

    #[tokio::test]
    async fn test_mkdir_existing_dir_is_ok() {
        let fs = MemoryFs::new();
        fs.mkdir(Path::new("/d"), false).await.unwrap();
        fs.mkdir(Path::new("/d"), false).await.unwrap();
        fs.mkdir(Path::new("/d"), true).await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_non_empty_directory_requires_recursive() {
        let fs = MemoryFs::new();
        fs.write(Path::new("/dir/file.txt"), b"data").await.unwrap();

        let result = fs.remove(Path::new("/dir"), false).await;
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::DirectoryNotEmpty);

        fs.remove(Path::new("/dir"), true).await.unwrap();
        assert!(!fs.exists(Path::new("/dir")).await);
        assert!(!fs.exists(Path::new("/dir/file.txt")).await);
    }

    #[tokio::test]
    async fn test_path_normalization() {
        let fs = MemoryFs::new();
        fs.write(Path::new("/a/b/c.txt"), b"data").await.unwrap();

        let data1 = fs.read(Path::new("/a/b/c.txt")).await.unwrap();
        let data2 = fs.read(Path::new("/a/./b/c.txt")).await.unwrap();
        let data3 = fs.read(Path::new("/a/b/../b/c.txt")).await.unwrap();
        assert_eq!(data1, data2);
        assert_eq!(data2, data3);
    }

    #[tokio::test]
    async fn test_symlink_read_through() {
        let fs = MemoryFs::new();
        fs.write(Path::new("/data/real.txt"), b"payload").await.unwrap();
        fs.symlink(Path::new("/data/real.txt"), Path::new("/alias"))
            .await
            .unwrap();

        let data = fs.read(Path::new("/alias")).await.unwrap();
        assert_eq!(data, b"payload");

        let stat = fs.stat(Path::new("/alias")).await.unwrap();
        assert!(stat.is_file());
        let lstat = fs.lstat(Path::new("/alias")).await.unwrap();
        assert!(lstat.is_symlink());

        let target = fs.read_link(Path::new("/alias")).await.unwrap();
        assert_eq!(target, PathBuf::from("/data/real.txt"));
    }

    #[tokio::test]
    async fn test_symlink_relative_target() {
        let fs = MemoryFs::new();
        fs.write(Path::new("/dir/real.txt"), b"rel").await.unwrap();
        fs.symlink(Path::new("real.txt"), Path::new("/dir/link"))
            .await
            .unwrap();

        let data = fs.read(Path::new("/dir/link")).await.unwrap();
        assert_eq!(data, b"rel");
    }

    #[tokio::test]
    async fn test_symlink_directory_component() {
        let fs = MemoryFs::new();
        fs.write(Path::new("/real/dir/file.txt"), b"deep").await.unwrap();
        fs.symlink(Path::new("/real/dir"), Path::new("/shortcut"))
            .await
            .unwrap();

        let data = fs.read(Path::new("/shortcut/file.txt")).await.unwrap();
        assert_eq!(data, b"deep");
    }

    #[tokio::test]
    async fn test_symlink_loop_detected() {
        let fs = MemoryFs::new();
        fs.symlink(Path::new("/b"), Path::new("/a")).await.unwrap();
        fs.symlink(Path::new("/a"), Path::new("/b")).await.unwrap();

        let err = fs.read(Path::new("/a")).await.unwrap_err();
        assert!(err
            .to_string()
            .contains("too many levels of symbolic links"));
    }

    #[tokio::test]
    async fn test_hard_link_shares_content() {
        let fs = MemoryFs::new();
        fs.write(Path::new("/orig.txt"), b"v1").await.unwrap();
        fs.hard_link(Path::new("/orig.txt"), Path::new("/linked.txt"))
            .await
            .unwrap();

        fs.write(Path::new("/orig.txt"), b"v2").await.unwrap();
        let data = fs.read(Path::new("/linked.txt")).await.unwrap();
        assert_eq!(data, b"v2");
    }

    #[tokio::test]
    async fn test_hard_link_to_directory_fails() {
        let fs = MemoryFs::new();
        fs.mkdir(Path::new("/d"), false).await.unwrap();
        let result = fs.hard_link(Path::new("/d"), Path::new("/link")).await;
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::PermissionDenied);
    }

    #[tokio::test]
    async fn test_chmod_and_set_times() {
        let fs = MemoryFs::new();
        fs.write(Path::new("/f"), b"x").await.unwrap();

        fs.chmod(Path::new("/f"), 0o600).await.unwrap();
        assert_eq!(fs.stat(Path::new("/f")).await.unwrap().mode, 0o600);

        let then = UNIX_EPOCH + Duration::from_millis(1_000_000);
        fs.set_times(Path::new("/f"), then).await.unwrap();
        assert_eq!(fs.stat(Path::new("/f")).await.unwrap().modified, then);
    }

    #[tokio::test]
    async fn test_copy_file() {
        let fs = MemoryFs::new();
        fs.write(Path::new("/src.txt"), b"copy me").await.unwrap();
        fs.chmod(Path::new("/src.txt"), 0o640).await.unwrap();

        fs.copy(Path::new("/src.txt"), Path::new("/dst.txt"), false)
            .await
            .unwrap();
        assert_eq!(fs.read(Path::new("/dst.txt")).await.unwrap(), b"copy me");
        assert_eq!(fs.stat(Path::new("/dst.txt")).await.unwrap().mode, 0o640);

        // Independent content after copy
        fs.write(Path::new("/src.txt"), b"changed").await.unwrap();
        assert_eq!(fs.read(Path::new("/dst.txt")).await.unwrap(), b"copy me");
    }

    #[tokio::test]
    async fn test_copy_directory_recursive() {
        let fs = MemoryFs::new();
        fs.write(Path::new("/tree/a.txt"), b"a").await.unwrap();
        fs.write(Path::new("/tree/sub/b.txt"), b"b").await.unwrap();

        let result = fs.copy(Path::new("/tree"), Path::new("/copy"), false).await;
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::IsADirectory);

        fs.copy(Path::new("/tree"), Path::new("/copy"), true).await.unwrap();
        assert_eq!(fs.read(Path::new("/copy/a.txt")).await.unwrap(), b"a");
        assert_eq!(fs.read(Path::new("/copy/sub/b.txt")).await.unwrap(), b"b");
    }

    #[tokio::test]
    async fn test_copy_into_existing_directory() {
        let fs = MemoryFs::new();
        fs.write(Path::new("/f.txt"), b"f").await.unwrap();
        fs.mkdir(Path::new("/dest"), false).await.unwrap();

        fs.copy(Path::new("/f.txt"), Path::new("/dest"), false).await.unwrap();
        assert_eq!(fs.read(Path::new("/dest/f.txt")).await.unwrap(), b"f");
    }

    #[tokio::test]
    async fn test_rename_file() {
        let fs = MemoryFs::new();
        fs.write(Path::new("/old.txt"), b"data").await.unwrap();
        fs.rename(Path::new("/old.txt"), Path::new("/new.txt")).await.unwrap();

        assert!(!fs.exists(Path::new("/old.txt")).await);
        assert_eq!(fs.read(Path::new("/new.txt")).await.unwrap(), b"data");
    }

    #[tokio::test]
    async fn test_rename_directory_tree() {
        let fs = MemoryFs::new();
        fs.write(Path::new("/proj/src/main.rs"), b"fn main() {}").await.unwrap();
        fs.rename(Path::new("/proj"), Path::new("/project")).await.unwrap();

        assert!(!fs.exists(Path::new("/proj")).await);
        assert_eq!(
            fs.read(Path::new("/project/src/main.rs")).await.unwrap(),
            b"fn main() {}"
        );
    }

    #[tokio::test]
    async fn test_rename_into_existing_directory() {
        let fs = MemoryFs::new();
        fs.write(Path::new("/f.txt"), b"f").await.unwrap();
        fs.mkdir(Path::new("/dest"), false).await.unwrap();

        fs.rename(Path::new("/f.txt"), Path::new("/dest")).await.unwrap();
        assert_eq!(fs.read(Path::new("/dest/f.txt")).await.unwrap(), b"f");
    }

    #[tokio::test]
    async fn test_real_path_follows_links() {
        let fs = MemoryFs::new();
        fs.write(Path::new("/target/file.txt"), b"x").await.unwrap();
        fs.symlink(Path::new("/target"), Path::new("/via")).await.unwrap();

        let real = fs.real_path(Path::new("/via/file.txt")).await.unwrap();
        assert_eq!(real, PathBuf::from("/target/file.txt"));

        let missing = fs.real_path(Path::new("/via/nope.txt")).await;
        assert_eq!(missing.unwrap_err().kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_all_paths_includes_root_and_is_sorted() {
        let fs = MemoryFs::new();
        fs.write(Path::new("/b/file.txt"), b"x").await.unwrap();
        fs.mkdir(Path::new("/a"), false).await.unwrap();

        let paths = fs.all_paths().await;
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/"),
                PathBuf::from("/a"),
                PathBuf::from("/b"),
                PathBuf::from("/b/file.txt"),
            ]
        );
    }

    #[tokio::test]
    async fn test_exists() {
        let fs = MemoryFs::new();
        assert!(!fs.exists(Path::new("/nope.txt")).await);
        fs.write(Path::new("/yes.txt"), b"here").await.unwrap();
        assert!(fs.exists(Path::new("/yes.txt")).await);
    }

    #[tokio::test]
    async fn test_write_with_metadata() {
        let fs = MemoryFs::new();
        let mtime = UNIX_EPOCH + Duration::from_millis(42_000);
        fs.write_with(Path::new("/meta.txt"), b"m", 0o600, mtime)
            .await
            .unwrap();

        let stat = fs.stat(Path::new("/meta.txt")).await.unwrap();
        assert_eq!(stat.mode, 0o600);
        assert_eq!(stat.modified, mtime);
    }

    #[tokio::test]
    async fn test_resolve_path_is_lexical() {
        let fs = MemoryFs::new();
        // No symlink following, no existence requirement
        assert_eq!(
            fs.resolve_path(Path::new("/home/user"), Path::new("../shared/x")),
            PathBuf::from("/home/shared/x")
        );
    }

    #[tokio::test]
    async fn test_remove_root_denied() {
        let fs = MemoryFs::new();
        let result = fs.remove(Path::new("/"), true).await;
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::PermissionDenied);
    }
}
