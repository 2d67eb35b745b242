//! Backup staging for the Executor's `backup_on_conflict` option (spec
//! §4.5): before a conflict-driven transfer or deletion overwrites a
//! victim, copy it to `{root}/.sync-backups/{relpath}.{yyyymmdd_hhmmss}` on
//! the same side. Backups are best-effort — a failure is logged and does
//! not block the action (spec §4.5, §7 `BackupFailed`).

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::transport::Transport;

/// Build the backup path for `rel_path` at `timestamp`, always under the
/// always-excluded `.sync-backups/` subtree (spec §4.2, §6).
pub fn backup_rel_path(rel_path: &str, timestamp: DateTime<Utc>) -> String {
    format!(".sync-backups/{rel_path}.{}", timestamp.format("%Y%m%d_%H%M%S"))
}

/// Back up a local file. Returns `Ok(None)` if the source does not exist
/// (nothing to back up — e.g. a DELETE_LOCAL for a path already gone
/// through some other race). Logs and returns `Ok(Some(..))` is success;
/// an `Err` is a genuine I/O failure the caller logs as `BackupFailed` and
/// otherwise ignores (spec §4.5: backups never block the action).
pub fn backup_local(root: &Path, rel_path: &str, timestamp: DateTime<Utc>) -> std::io::Result<Option<PathBuf>> {
    let src = root.join(rel_path);
    if !src.exists() {
        return Ok(None);
    }
    let backup_rel = backup_rel_path(rel_path, timestamp);
    let dst = root.join(&backup_rel);
    if let Some(parent) = dst.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::copy(&src, &dst)?;
    Ok(Some(dst))
}

/// Back up a remote file via the Transport's remote-copy operation. Logs
/// and swallows the error per the `BackupFailed` policy; the caller only
/// needs to know whether it happened.
pub fn backup_remote(transport: &dyn Transport, remote_root: &str, rel_path: &str, timestamp: DateTime<Utc>) -> bool {
    let backup_rel = backup_rel_path(rel_path, timestamp);
    match transport.copy_remote(remote_root, rel_path, &backup_rel) {
        Ok(()) => true,
        Err(e) => {
            eprintln!("[backup] could not back up remote '{rel_path}': {e}");
            false
        }
    }
}
