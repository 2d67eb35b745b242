//! The Manifest Store: persists and loads the per-profile last-successful-
//! sync manifest (spec §4.7).
//!
//! `Save` writes atomically — a sibling temp file in the same directory,
//! then a rename — so a crash never leaves a truncated manifest on disk
//! (spec invariant 4, §5 "shared resources"). Grounded in the reference's
//! `atomic_write` (`sync::writer`), which uses the same tempfile-then-
//! rename idiom for lockfile and config persistence.

use std::path::Path;

use tempfile::NamedTempFile;

use crate::differ::{Action, ActionKind};
use crate::error::SyncResult;
use crate::manifest::Manifest;

/// Load the persisted manifest for a profile. A missing file is not an
/// error — it signals first-sync semantics (spec §4.3).
pub fn load(manifest_path: &Path) -> SyncResult<Manifest> {
    if !manifest_path.exists() {
        return Ok(Manifest::new());
    }
    let content = std::fs::read_to_string(manifest_path)?;
    Manifest::parse(&content)
}

/// Persist `manifest` to `manifest_path` atomically: write to a sibling
/// temp file, then rename over the destination.
pub fn save(manifest_path: &Path, manifest: &Manifest) -> SyncResult<()> {
    let dir = manifest_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    use std::io::Write;
    tmp.write_all(manifest.serialize().as_bytes())?;
    tmp.flush()?;
    tmp.persist(manifest_path)
        .map_err(|e| crate::error::SyncError::Io(e.error))?;
    Ok(())
}

/// Produce the combined post-sync snapshot used for persistence (spec
/// §4.7): union of `local` and `remote` entries, preferring `local`'s
/// entry on overlap, minus every path named by a DELETE_LOCAL or
/// DELETE_REMOTE action. The result is canonicalised (the `Manifest`'s
/// `BTreeMap` backing sorts it for free).
pub fn merge(local: &Manifest, remote: &Manifest, actions: &[Action]) -> Manifest {
    let mut merged = Manifest::new();
    for (path, entry) in local.iter() {
        let _ = merged.insert(path.to_string(), *entry);
    }
    for (path, entry) in remote.iter() {
        if merged.get(path).is_none() {
            let _ = merged.insert(path.to_string(), *entry);
        }
    }
    for action in actions {
        if matches!(action.kind, ActionKind::DeleteLocal | ActionKind::DeleteRemote) {
            merged.remove(&action.path);
        }
    }
    merged
}
