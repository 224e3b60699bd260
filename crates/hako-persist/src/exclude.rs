//! Persistence exclusion policy.
//!
//! The execution environment recreates device, process, and preinstalled
//! binary paths on every session start. Persisting them would bloat the
//! snapshot and fight freshly recreated entries with stale ones, so they
//! are excluded from both capture and restore.

use std::path::Path;

/// Path prefixes recreated by session bootstrap. Never persisted.
pub const SYSTEM_PREFIXES: &[&str] = &["/dev", "/proc", "/bin", "/usr/bin"];

/// Whether a path belongs in a snapshot.
///
/// The root is never persisted; neither is anything equal to or under a
/// system prefix. Matching is component-wise, so `/binary` is persisted
/// while `/bin` and `/bin/ls` are not.
pub fn should_persist(path: &Path) -> bool {
    if path == Path::new("/") {
        return false;
    }
    !SYSTEM_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}
