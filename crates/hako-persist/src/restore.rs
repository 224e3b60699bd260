//! Restore sequencer.
//!
//! A snapshot's entry map imposes no ordering, so naive replay could write
//! a file into a directory that does not exist yet or create a symlink
//! before its target. Replay therefore runs in three phases: directories
//! first (shallowest first, recursive create so missing ancestors never
//! block a child), then files, then symlinks.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

use hako_vfs::{EntryKind, MemoryFs};

use crate::exclude::should_persist;
use crate::snapshot::{Snapshot, SnapshotEntry};

fn from_epoch_ms(ms: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_millis(ms)
}

/// Replay a decoded snapshot into an (assumed empty) backing store.
///
/// System paths are skipped symmetrically with capture: a stale or
/// foreign snapshot carrying `/bin` or `/proc` entries must not
/// repopulate paths the session owns.
///
/// Best-effort like capture: an entry that fails to apply is logged and
/// skipped, never fatal.
pub async fn restore(fs: &MemoryFs, snapshot: &Snapshot) {
    let mut dirs: Vec<(&String, &SnapshotEntry)> = snapshot
        .entries
        .iter()
        .filter(|(p, e)| should_persist(Path::new(p.as_str())) && e.kind == EntryKind::Directory)
        .collect();
    dirs.sort_by_key(|(path, _)| hako_vfs::paths::depth(Path::new(path.as_str())));

    for (path, entry) in dirs {
        let path = Path::new(path.as_str());
        if let Err(err) = fs
            .mkdir_with(path, entry.mode, from_epoch_ms(entry.mtime))
            .await
        {
            debug!(path = %path.display(), error = %err, "failed to restore directory");
        }
    }

    for (path, entry) in snapshot
        .entries
        .iter()
        .filter(|(p, e)| should_persist(Path::new(p.as_str())) && e.kind == EntryKind::File)
    {
        let path = Path::new(path.as_str());
        let data = match &entry.content {
            Some(encoded) => match BASE64.decode(encoded) {
                Ok(bytes) => bytes,
                Err(err) => {
                    debug!(path = %path.display(), error = %err, "undecodable file payload, restoring empty");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        if let Err(err) = fs
            .write_with(path, &data, entry.mode, from_epoch_ms(entry.mtime))
            .await
        {
            debug!(path = %path.display(), error = %err, "failed to restore file");
        }
    }

    for (path, entry) in snapshot
        .entries
        .iter()
        .filter(|(p, e)| should_persist(Path::new(p.as_str())) && e.kind == EntryKind::Symlink)
    {
        let path = Path::new(path.as_str());
        let Some(target) = &entry.target else {
            continue;
        };
        if let Err(err) = fs
            .symlink_with(
                Path::new(target.as_str()),
                path,
                entry.mode,
                from_epoch_ms(entry.mtime),
            )
            .await
        {
            debug!(path = %path.display(), error = %err, "failed to restore symlink");
        }
    }
}
