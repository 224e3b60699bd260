//! hako-persist: durable snapshot persistence for the hako sandbox filesystem.
//!
//! Wraps a volatile [`hako_vfs::MemoryFs`] in a facade that mirrors every
//! mutation into a versioned snapshot on a durable store and rebuilds the
//! in-memory tree from that snapshot at startup. The shell and tool layers
//! above only ever see the [`hako_vfs::Filesystem`] interface; persistence
//! never surfaces through it.
//!
//! # Architecture
//!
//! ```text
//! callers ──► DurableFs ──delegate──► MemoryFs (volatile tree)
//!                 │
//!                 └─on mutation─► flush scheduler (debounced)
//!                                      │ quiet period elapses
//!                                      ▼
//!                     capture ──► Snapshot ──► StateStore (one blob)
//!
//! startup: StateStore.load ──► decode ──► depth-ordered restore ──► MemoryFs
//! ```
//!
//! Durability is best-effort: a failed flush is logged and the next
//! mutation re-arms the scheduler; a crash between scheduling and flushing
//! loses at most the mutations since the last completed flush.

pub mod durable;
pub mod error;
pub mod exclude;
pub mod restore;
pub mod snapshot;
pub mod store;

mod flush;

pub use durable::{DurableFs, DurableFsOptions};
pub use error::{PersistError, PersistResult};
pub use flush::DEFAULT_QUIET_PERIOD;
pub use snapshot::{Snapshot, SnapshotEntry, SNAPSHOT_VERSION};
pub use store::{DirStore, MemoryStore, StateStore, STATE_DIR, STATE_FILE};
