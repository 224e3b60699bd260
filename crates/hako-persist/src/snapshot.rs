//! Snapshot document and codec.
//!
//! The full persisted state is one versioned, path-keyed JSON document:
//!
//! ```json
//! { "version": 1,
//!   "entries": {
//!     "/home/user/a.txt": { "type": "file", "content": "aGk=",
//!                           "mode": 420, "mtime": 1735689600000 },
//!     "/home/user/d":     { "type": "directory", "mode": 493, "mtime": 0 },
//!     "/alias":           { "type": "symlink", "target": "/home/user/a.txt",
//!                           "mode": 511, "mtime": 0 } } }
//! ```
//!
//! A snapshot is built fresh on every flush by re-enumerating the backing
//! store — there is no incremental diffing — and discarded after the
//! durable write.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

use hako_vfs::{EntryKind, Filesystem};

use crate::exclude::should_persist;

/// Current snapshot format version. Any other value on load means the
/// whole snapshot is unusable.
pub const SNAPSHOT_VERSION: u32 = 1;

/// One persisted filesystem node.
///
/// Exactly one of `content` (files) and `target` (symlinks) is meaningful;
/// directories carry neither.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// base64-encoded file content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Symlink target path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Permission bits.
    pub mode: u32,
    /// Modification time, epoch milliseconds.
    pub mtime: u64,
}

/// The full persisted state.
///
/// Entries are keyed by absolute path. A `BTreeMap` keeps repeated encodes
/// of the same tree byte-identical; on disk the ordering carries no
/// meaning and restore never relies on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub entries: BTreeMap<String, SnapshotEntry>,
}

fn epoch_ms(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

/// Capture the current state of a filesystem as a snapshot.
///
/// Best-effort, not a transaction: a path whose lstat or read fails
/// (e.g., removed mid-enumeration) is skipped and the snapshot still
/// succeeds without it.
pub async fn capture(fs: &dyn Filesystem) -> Snapshot {
    let mut entries = BTreeMap::new();

    for path in fs.all_paths().await {
        if !should_persist(&path) {
            continue;
        }

        let stat = match fs.lstat(&path).await {
            Ok(stat) => stat,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "skipping entry during capture");
                continue;
            }
        };

        let mut entry = SnapshotEntry {
            kind: stat.kind,
            content: None,
            target: None,
            mode: stat.mode,
            mtime: epoch_ms(stat.modified),
        };

        match stat.kind {
            EntryKind::File => match fs.read(&path).await {
                Ok(bytes) => entry.content = Some(BASE64.encode(bytes)),
                Err(err) => {
                    debug!(path = %path.display(), error = %err, "skipping unreadable file");
                    continue;
                }
            },
            EntryKind::Symlink => match fs.read_link(&path).await {
                Ok(target) => entry.target = Some(target.to_string_lossy().into_owned()),
                Err(err) => {
                    debug!(path = %path.display(), error = %err, "skipping unreadable symlink");
                    continue;
                }
            },
            EntryKind::Directory => {}
        }

        entries.insert(path.to_string_lossy().into_owned(), entry);
    }

    Snapshot {
        version: SNAPSHOT_VERSION,
        entries,
    }
}

/// Decode a stored blob.
///
/// Empty text, unparsable JSON, or a version mismatch all yield `None` —
/// "no usable state", never an error. The caller proceeds as a first run.
pub fn decode(text: &str) -> Option<Snapshot> {
    if text.is_empty() {
        return None;
    }
    let snapshot: Snapshot = serde_json::from_str(text).ok()?;
    (snapshot.version == SNAPSHOT_VERSION).then_some(snapshot)
}
