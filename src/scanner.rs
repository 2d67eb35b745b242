//! The Scanner: produces a canonical [`Manifest`] for a directory tree.
//!
//! `Scan` traverses the root recursively, emitting one entry per regular
//! file and symlink, applying the configured [`ExcludeSet`] so that pruning
//! a directory short-circuits its subtree (spec §4.2). Unreadable files are
//! logged and skipped rather than aborting the scan.

use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use crate::error::{SyncError, SyncResult};
use crate::exclude::ExcludeSet;
use crate::manifest::{EntryKind, Manifest, ManifestEntry};

/// Scan `root` and produce its canonical manifest.
///
/// A non-existent root is an error for the local side (the Coordinator
/// will create it before a first push) but the Scanner itself always
/// signals the condition rather than silently returning empty; callers
/// that want "missing root is fine" (the remote case before first sync)
/// check existence themselves before calling `scan`.
pub fn scan(root: &Path, excludes: &ExcludeSet) -> SyncResult<Manifest> {
    if !root.exists() {
        return Err(SyncError::ScanError {
            path: root.to_path_buf(),
            message: "root does not exist".into(),
        });
    }
    let mut manifest = Manifest::new();
    walk(root, Path::new(""), excludes, &mut manifest);
    Ok(manifest)
}

/// Scan `root`, returning an empty manifest rather than an error if it does
/// not exist. Used for the remote side, which the Coordinator may be
/// seeing for the first time.
pub fn scan_or_empty(root: &Path, excludes: &ExcludeSet) -> Manifest {
    if !root.exists() {
        return Manifest::new();
    }
    let mut manifest = Manifest::new();
    walk(root, Path::new(""), excludes, &mut manifest);
    manifest
}

fn walk(abs_dir: &Path, rel_dir: &Path, excludes: &ExcludeSet, manifest: &mut Manifest) {
    let entries = match fs::read_dir(abs_dir) {
        Ok(entries) => entries,
        Err(e) => {
            log_skip(abs_dir, &e);
            return;
        }
    };

    let mut names: Vec<_> = entries.flatten().collect();
    // Deterministic traversal order; final manifest order still comes from
    // the BTreeMap, but a stable walk makes logs reproducible.
    names.sort_by_key(|e| e.file_name());

    for dir_entry in names {
        let name = dir_entry.file_name();
        let rel_path = rel_dir.join(&name);

        let file_type = match dir_entry.file_type() {
            Ok(ft) => ft,
            Err(e) => {
                log_skip(&dir_entry.path(), &e);
                continue;
            }
        };

        if file_type.is_dir() {
            if excludes.is_excluded(&rel_path, true) {
                continue;
            }
            walk(&dir_entry.path(), &rel_path, excludes, manifest);
            continue;
        }

        if excludes.is_excluded(&rel_path, false) {
            continue;
        }

        if file_type.is_symlink() {
            let rel_str = match rel_path.to_str() {
                Some(s) => s.replace('\\', "/"),
                None => continue,
            };
            let mtime = match fs::symlink_metadata(dir_entry.path()) {
                Ok(meta) => meta.mtime().max(0) as u64,
                Err(e) => {
                    log_skip(&dir_entry.path(), &e);
                    continue;
                }
            };
            let _ = manifest.insert(
                rel_str,
                ManifestEntry {
                    mtime,
                    size: 0,
                    kind: EntryKind::Symlink,
                },
            );
            continue;
        }

        if !file_type.is_file() {
            continue;
        }

        let metadata = match fs::metadata(dir_entry.path()) {
            Ok(meta) => meta,
            Err(e) => {
                log_skip(&dir_entry.path(), &e);
                continue;
            }
        };

        let rel_str = match rel_path.to_str() {
            Some(s) => s.replace('\\', "/"),
            None => continue,
        };

        let _ = manifest.insert(
            rel_str,
            ManifestEntry {
                mtime: metadata.mtime().max(0) as u64,
                size: metadata.size(),
                kind: EntryKind::Regular,
            },
        );
    }
}

fn log_skip(path: &Path, err: &std::io::Error) {
    eprintln!("[scan] skipping {}: {}", path.display(), err);
}

/// Build the remote manifest by piping the output of a `find`+`stat`
/// traversal run through [`crate::transport::Transport::run_remote`] back
/// into the same wire format this module would have produced locally.
/// Kept separate from `scan`/`scan_or_empty` because the remote side has
/// no local filesystem to walk.
pub fn parse_remote_listing(listing: &str) -> Manifest {
    let mut manifest = Manifest::new();
    for line in listing.lines() {
        let mut fields = line.splitn(4, '\t');
        let (Some(kind_str), Some(mtime_str), Some(size_str), Some(path)) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            continue;
        };
        let Some(kind) = (match kind_str {
            "f" => Some(EntryKind::Regular),
            "l" => Some(EntryKind::Symlink),
            _ => None,
        }) else {
            continue;
        };
        let Ok(mtime) = mtime_str.parse::<u64>() else {
            continue;
        };
        let Ok(size) = size_str.parse::<u64>() else {
            continue;
        };
        let size = if matches!(kind, EntryKind::Symlink) { 0 } else { size };
        let _ = manifest.insert(path.to_string(), ManifestEntry { mtime, size, kind });
    }
    manifest
}
