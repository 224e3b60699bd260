//! The durable filesystem facade.
//!
//! `DurableFs` implements the full `Filesystem` interface by forwarding
//! every call to a volatile `MemoryFs`; every *mutating* call additionally
//! schedules a debounced flush after the delegated call succeeds.
//! Read-only calls never schedule, and a failed mutation propagates
//! unchanged without scheduling.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::warn;

use hako_vfs::{DirEntry, Filesystem, FsStat, MemoryFs};

use crate::error::PersistResult;
use crate::flush::{FlushScheduler, DEFAULT_QUIET_PERIOD};
use crate::restore::restore;
use crate::snapshot::decode;
use crate::store::StateStore;

/// Configuration for opening a durable filesystem.
#[derive(Debug, Clone)]
pub struct DurableFsOptions {
    /// Debounce window after the last mutation before a flush runs.
    pub quiet_period: Duration,

    /// Directories guaranteed to exist after open, whether or not the
    /// snapshot contained them. The shell's working directory belongs
    /// here — a first run has no snapshot at all.
    pub ensure_dirs: Vec<PathBuf>,
}

impl Default for DurableFsOptions {
    fn default() -> Self {
        Self {
            quiet_period: DEFAULT_QUIET_PERIOD,
            ensure_dirs: vec![PathBuf::from("/home/user")],
        }
    }
}

/// Filesystem facade with durable snapshot persistence.
///
/// Construction loads and replays the previous session's snapshot; any
/// load-time problem (missing blob, corrupt text, version mismatch) means
/// a fresh empty tree, never an error. After that, persistence is
/// invisible to callers: mutations land in the backing store synchronously
/// and reach the durable store one quiet period after the burst ends.
pub struct DurableFs {
    inner: Arc<MemoryFs>,
    scheduler: FlushScheduler,
    store: Arc<dyn StateStore>,
}

impl DurableFs {
    /// Open a durable filesystem over `store` with default options.
    pub async fn open(store: Arc<dyn StateStore>) -> io::Result<Self> {
        Self::open_with(store, DurableFsOptions::default()).await
    }

    /// Open a durable filesystem over `store`.
    pub async fn open_with(store: Arc<dyn StateStore>, options: DurableFsOptions) -> io::Result<Self> {
        let inner = Arc::new(MemoryFs::new());

        match store.load().await {
            Ok(Some(text)) => {
                if let Some(snapshot) = decode(&text) {
                    restore(&inner, &snapshot).await;
                }
            }
            Ok(None) => {}
            Err(err) => {
                // Unreadable store: same as no prior state
                warn!(error = %err, "failed to load persisted state, starting fresh");
            }
        }

        for dir in &options.ensure_dirs {
            inner.mkdir(dir, true).await?;
        }

        let scheduler = FlushScheduler::new(
            Arc::clone(&inner),
            Arc::clone(&store),
            options.quiet_period,
        );

        Ok(Self {
            inner,
            scheduler,
            store,
        })
    }

    /// Flush immediately, fire-and-forget.
    ///
    /// Hook this to teardown or visibility-hidden signals. Cancels any
    /// pending debounce timer; failure is logged, never surfaced.
    pub fn flush_now(&self) {
        self.scheduler.flush_now();
    }

    /// Flush immediately and wait for the durable write to complete.
    pub async fn flush_and_wait(&self) -> PersistResult<()> {
        self.scheduler.flush_and_wait().await
    }

    /// Delete all persisted state. The in-memory tree is untouched; the
    /// next flush will re-create the blob.
    pub async fn clear_persisted(&self) -> io::Result<()> {
        self.store.clear().await
    }
}

#[async_trait]
impl Filesystem for DurableFs {
    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.inner.read(path).await
    }

    async fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        self.inner.write(path, data).await?;
        self.scheduler.schedule();
        Ok(())
    }

    async fn append(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        self.inner.append(path, data).await?;
        self.scheduler.schedule();
        Ok(())
    }

    async fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path).await
    }

    async fn stat(&self, path: &Path) -> io::Result<FsStat> {
        self.inner.stat(path).await
    }

    async fn lstat(&self, path: &Path) -> io::Result<FsStat> {
        self.inner.lstat(path).await
    }

    async fn mkdir(&self, path: &Path, recursive: bool) -> io::Result<()> {
        self.inner.mkdir(path, recursive).await?;
        self.scheduler.schedule();
        Ok(())
    }

    async fn list(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        self.inner.list(path).await
    }

    async fn remove(&self, path: &Path, recursive: bool) -> io::Result<()> {
        self.inner.remove(path, recursive).await?;
        self.scheduler.schedule();
        Ok(())
    }

    async fn copy(&self, src: &Path, dst: &Path, recursive: bool) -> io::Result<()> {
        self.inner.copy(src, dst, recursive).await?;
        self.scheduler.schedule();
        Ok(())
    }

    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        self.inner.rename(from, to).await?;
        self.scheduler.schedule();
        Ok(())
    }

    async fn real_path(&self, path: &Path) -> io::Result<PathBuf> {
        self.inner.real_path(path).await
    }

    async fn all_paths(&self) -> Vec<PathBuf> {
        self.inner.all_paths().await
    }

    async fn chmod(&self, path: &Path, mode: u32) -> io::Result<()> {
        self.inner.chmod(path, mode).await?;
        self.scheduler.schedule();
        Ok(())
    }

    async fn symlink(&self, target: &Path, link: &Path) -> io::Result<()> {
        self.inner.symlink(target, link).await?;
        self.scheduler.schedule();
        Ok(())
    }

    async fn hard_link(&self, original: &Path, link: &Path) -> io::Result<()> {
        self.inner.hard_link(original, link).await?;
        self.scheduler.schedule();
        Ok(())
    }

    async fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        self.inner.read_link(path).await
    }

    async fn set_times(&self, path: &Path, mtime: SystemTime) -> io::Result<()> {
        self.inner.set_times(path, mtime).await?;
        self.scheduler.schedule();
        Ok(())
    }
}
