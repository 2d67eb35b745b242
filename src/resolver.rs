//! The Resolver: collapses a CONFLICT action into an executable action
//! (push, pull, or skip) per the configured [`ConflictStrategy`].
//!
//! The optional checksum-verify pre-step uses `sha2::Sha256` (already the
//! reference's hashing primitive, see its `LocalFs::hash`/`hash_file`) to
//! reclassify a conflict as unchanged when both sides' contents match.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::differ::{Action, ActionKind};
use crate::manifest::ManifestEntry;

/// Conflict resolution policy (`CONFLICT_STRATEGY`, spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConflictStrategy {
    #[default]
    Newest,
    Local,
    Remote,
    Skip,
    Backup,
}

/// What the resolver decided to do with a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Push the local side to remote.
    Push,
    /// Pull the remote side to local.
    Pull,
    /// Take no action; record the conflict in the summary.
    Skip,
}

impl Resolution {
    pub fn to_action_kind(self) -> Option<ActionKind> {
        match self {
            Resolution::Push => Some(ActionKind::Push),
            Resolution::Pull => Some(ActionKind::Pull),
            Resolution::Skip => None,
        }
    }
}

/// Apply `strategy` to a conflicting path given both sides' entries.
/// `backup` strategy is handled by the caller (Executor) staging a backup
/// before applying `newest`'s decision — the Resolver only reports which
/// side wins.
pub fn resolve(strategy: ConflictStrategy, local: &ManifestEntry, remote: &ManifestEntry) -> Resolution {
    match strategy {
        ConflictStrategy::Local => Resolution::Push,
        ConflictStrategy::Remote => Resolution::Pull,
        ConflictStrategy::Skip => Resolution::Skip,
        ConflictStrategy::Newest | ConflictStrategy::Backup => {
            // Ties resolve to local (spec §4.4).
            if remote.mtime > local.mtime {
                Resolution::Pull
            } else {
                Resolution::Push
            }
        }
    }
}

/// Compute a SHA-256 content digest. Used only by the checksum-verify
/// pre-step; never stored in the manifest.
pub fn content_digest(path: &Path) -> std::io::Result<[u8; 32]> {
    let content = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&content);
    Ok(hasher.finalize().into())
}

/// If `checksum_verify` is enabled and both sides' contents match, the
/// conflict is reclassified as UNCHANGED (no transfer, no conflict count).
/// Otherwise the original CONFLICT action is returned unchanged.
pub fn apply_checksum_verify(
    action: Action,
    local_path: &Path,
    remote_path: &Path,
    checksum_verify: bool,
) -> Action {
    if !checksum_verify || action.kind != ActionKind::Conflict {
        return action;
    }
    match (content_digest(local_path), content_digest(remote_path)) {
        (Ok(a), Ok(b)) if a == b => Action {
            path: action.path,
            kind: ActionKind::Unchanged,
        },
        _ => action,
    }
}
