//! hako-vfs (箱): the filesystem contract of the hako sandbox.
//!
//! This crate provides:
//!
//! - **Filesystem**: the capability interface every filesystem
//!   implementation satisfies — file/directory/symlink CRUD, stat/lstat,
//!   links, path resolution, and enumeration of all known paths
//! - **MemoryFs**: the volatile in-memory backing store that shell
//!   commands actually execute against
//! - **paths**: pure lexical path helpers (no filesystem access)
//!
//! Persistence lives in `hako-persist`, which wraps a `MemoryFs` behind
//! the same `Filesystem` interface. Consumers (the shell interpreter, the
//! tool-calling layer) only ever see this trait.

pub mod memory;
pub mod paths;
pub mod traits;

pub use memory::MemoryFs;
pub use traits::{DirEntry, EntryKind, Filesystem, FsStat};
