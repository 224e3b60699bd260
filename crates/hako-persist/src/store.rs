//! Durable store adapters.
//!
//! A store holds exactly one snapshot blob. `DirStore` keeps it in a
//! dedicated subdirectory of a caller-provided root (the private durable
//! storage area); `MemoryStore` keeps it in memory for tests and for
//! embedders running without durable storage.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Name of the dedicated state subdirectory.
pub const STATE_DIR: &str = "hako-fs";
/// Name of the single snapshot blob within it.
pub const STATE_FILE: &str = "state.json";

/// Storage for a single snapshot blob.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read the blob. `Ok(None)` means no state has ever been saved.
    async fn load(&self) -> io::Result<Option<String>>;

    /// Write the blob, durably committed before returning.
    async fn save(&self, blob: &str) -> io::Result<()>;

    /// Best-effort removal of the blob; absence is not an error.
    async fn clear(&self) -> io::Result<()>;
}

/// Store backed by a real directory: `<root>/hako-fs/state.json`.
#[derive(Debug, Clone)]
pub struct DirStore {
    blob_path: PathBuf,
}

impl DirStore {
    /// Open (creating if absent) the state subdirectory under `root`.
    pub async fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = root.into().join(STATE_DIR);
        fs::create_dir_all(&dir).await?;
        Ok(Self {
            blob_path: dir.join(STATE_FILE),
        })
    }

    /// Path of the snapshot blob.
    pub fn blob_path(&self) -> &Path {
        &self.blob_path
    }
}

#[async_trait]
impl StateStore for DirStore {
    async fn load(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(&self.blob_path).await {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn save(&self, blob: &str) -> io::Result<()> {
        // Write-then-rename: a crash mid-write leaves the previous
        // generation intact under the real name.
        let tmp_path = self.blob_path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp_path).await?;
        file.write_all(blob.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&tmp_path, &self.blob_path).await?;
        Ok(())
    }

    async fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.blob_path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }
}

/// In-memory store with a save counter.
///
/// The counter makes debounce behavior observable: N mutations inside one
/// quiet period must produce exactly one save.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blob: RwLock<Option<String>>,
    saves: AtomicU64,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with a blob, as if saved by an earlier
    /// session.
    pub fn with_blob(blob: impl Into<String>) -> Self {
        Self {
            blob: RwLock::new(Some(blob.into())),
            saves: AtomicU64::new(0),
        }
    }

    /// Number of completed saves.
    pub fn save_count(&self) -> u64 {
        self.saves.load(Ordering::SeqCst)
    }

    /// Current blob contents, if any.
    pub fn blob(&self) -> Option<String> {
        self.blob.read().ok().and_then(|g| g.clone())
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn load(&self) -> io::Result<Option<String>> {
        self.blob
            .read()
            .map(|g| g.clone())
            .map_err(|_| io::Error::other("lock poisoned"))
    }

    async fn save(&self, blob: &str) -> io::Result<()> {
        let mut guard = self
            .blob
            .write()
            .map_err(|_| io::Error::other("lock poisoned"))?;
        *guard = Some(blob.to_string());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn clear(&self) -> io::Result<()> {
        let mut guard = self
            .blob
            .write()
            .map_err(|_| io::Error::other("lock poisoned"))?;
        *guard = None;
        Ok(())
    }
}
