//! Debounced flush scheduler.
//!
//! Coalesces bursts of mutations into a single durable write: each
//! `schedule()` cancels any pending timer and arms a fresh one, so the
//! flush runs one quiet period after the *last* mutation. A steady stream
//! of writes spaced closer than the quiet period never flushes until the
//! stream pauses.
//!
//! Flushes serialize through a single in-flight slot: a flush requested
//! while one is running marks "flush again after the current completes"
//! instead of starting a second overlapping durable write.

use std::pin::pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::warn;

use hako_vfs::{Filesystem, MemoryFs};

use crate::error::PersistResult;
use crate::snapshot;
use crate::store::StateStore;

/// Quiet period after the last mutation before a flush runs.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(200);

pub(crate) struct FlushScheduler {
    shared: Arc<Shared>,
    /// At most one pending timer.
    timer: Mutex<Option<JoinHandle<()>>>,
}

struct Shared {
    fs: Arc<MemoryFs>,
    store: Arc<dyn StateStore>,
    quiet_period: Duration,
    in_flight: AtomicBool,
    rerun: AtomicBool,
    /// Signalled each time the in-flight slot frees up.
    idle: Notify,
}

impl FlushScheduler {
    pub(crate) fn new(
        fs: Arc<MemoryFs>,
        store: Arc<dyn StateStore>,
        quiet_period: Duration,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                fs,
                store,
                quiet_period,
                in_flight: AtomicBool::new(false),
                rerun: AtomicBool::new(false),
                idle: Notify::new(),
            }),
            timer: Mutex::new(None),
        }
    }

    fn cancel_timer(&self) {
        let mut timer = match self.timer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(handle) = timer.take() {
            handle.abort();
        }
    }

    /// Reset the debounce window: cancel any pending timer and arm a new
    /// one for a full quiet period from now.
    pub(crate) fn schedule(&self) {
        let mut timer = match self.timer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(handle) = timer.take() {
            handle.abort();
        }
        let shared = Arc::clone(&self.shared);
        *timer = Some(tokio::spawn(async move {
            tokio::time::sleep(shared.quiet_period).await;
            shared.run().await;
        }));
    }

    /// Flush immediately, fire-and-forget. For teardown and
    /// visibility-hidden signals; failure is logged, never surfaced.
    pub(crate) fn flush_now(&self) {
        self.cancel_timer();
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            shared.run().await;
        });
    }

    /// Flush immediately and wait for the durable write.
    ///
    /// If a fire-and-forget flush holds the in-flight slot, waits for it
    /// to release and then runs its own flush, so the state durable on
    /// return is at least as new as every mutation made before the call.
    pub(crate) async fn flush_and_wait(&self) -> PersistResult<()> {
        self.cancel_timer();
        loop {
            // Register interest before probing the slot, or a release
            // landing in between would be missed.
            let mut idle = pin!(self.shared.idle.notified());
            idle.as_mut().enable();
            match self.shared.try_flush().await {
                Some(result) => return result,
                None => idle.await,
            }
        }
    }
}

impl Drop for FlushScheduler {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

impl Shared {
    async fn run(&self) {
        if let Some(Err(err)) = self.try_flush().await {
            warn!(error = %err, "snapshot flush failed");
        }
    }

    /// At most one durable write in flight; requests arriving mid-write
    /// coalesce into a single rerun that captures the final state.
    ///
    /// Returns `None` when the slot is already held: the holder will
    /// rerun, so the caller's state still reaches the store.
    async fn try_flush(&self) -> Option<PersistResult<()>> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.rerun.store(true, Ordering::SeqCst);
            return None;
        }
        let mut result;
        loop {
            result = self.flush_once().await;
            if !self.rerun.swap(false, Ordering::SeqCst) {
                break;
            }
        }
        self.in_flight.store(false, Ordering::SeqCst);
        self.idle.notify_waiters();
        Some(result)
    }

    async fn flush_once(&self) -> PersistResult<()> {
        let fs: &dyn Filesystem = self.fs.as_ref();
        let snapshot = snapshot::capture(fs).await;
        let blob = serde_json::to_string(&snapshot)?;
        self.store.save(&blob).await?;
        Ok(())
    }
}
