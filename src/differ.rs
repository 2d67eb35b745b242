//! The Differ: three-way diff over (previous, local, remote) manifests.
//!
//! Classifies every path appearing in any of the three manifests into
//! exactly one [`Action`], following the presence/equality table of
//! spec §4.3. Entry equality is structural (mtime, size, kind); the Differ
//! never reads file contents.

use std::collections::BTreeSet;

use crate::manifest::Manifest;

/// A classified action for a single path. Every action carries the path it
/// applies to; `ActionKind::Unchanged` and friends are distinguished only
/// by variant, never by a side-channel.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Action {
    pub path: String,
    pub kind: ActionKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionKind {
    Push,
    Pull,
    DeleteLocal,
    DeleteRemote,
    Conflict,
    Unchanged,
}

/// The sorted set of actions produced by one diff. Sorted by path so that
/// logs and test fixtures are reproducible (spec §4.6 step 7).
pub type ActionList = Vec<Action>;

/// Diff `prev`, `local`, and `remote`, returning the path-sorted action
/// list. Any of the three manifests may be empty.
///
/// `propagate_deletes` controls whether a one-sided disappearance of a
/// previously-tracked path is treated as an intentional deletion
/// (propagated to the other side) or as unintentional drift (treated as if
/// the file should come back, i.e. a PUSH/PULL in the opposite direction).
pub fn diff(prev: &Manifest, local: &Manifest, remote: &Manifest, propagate_deletes: bool) -> ActionList {
    let mut paths: BTreeSet<&str> = BTreeSet::new();
    paths.extend(prev.keys());
    paths.extend(local.keys());
    paths.extend(remote.keys());

    let mut actions = Vec::with_capacity(paths.len());
    for path in paths {
        if let Some(kind) = classify(prev, local, remote, path, propagate_deletes) {
            actions.push(Action {
                path: path.to_string(),
                kind,
            });
        }
    }
    actions.sort();
    actions
}

fn classify(
    prev: &Manifest,
    local: &Manifest,
    remote: &Manifest,
    path: &str,
    propagate_deletes: bool,
) -> Option<ActionKind> {
    let p = prev.get(path);
    let l = local.get(path);
    let r = remote.get(path);

    match (p, l, r) {
        (Some(p), Some(l), Some(r)) => {
            let local_changed = l != p;
            let remote_changed = r != p;
            match (local_changed, remote_changed) {
                (false, false) => Some(ActionKind::Unchanged),
                (true, false) => Some(ActionKind::Push),
                (false, true) => Some(ActionKind::Pull),
                (true, true) => {
                    if l == r {
                        Some(ActionKind::Unchanged)
                    } else {
                        Some(ActionKind::Conflict)
                    }
                }
            }
        }
        (None, Some(l), Some(r)) => {
            if l == r {
                Some(ActionKind::Unchanged)
            } else {
                Some(ActionKind::Conflict)
            }
        }
        (None, Some(_), None) => Some(ActionKind::Push),
        (None, None, Some(_)) => Some(ActionKind::Pull),
        (Some(_), Some(_), None) => {
            if propagate_deletes {
                Some(ActionKind::DeleteLocal)
            } else {
                Some(ActionKind::Push)
            }
        }
        (Some(_), None, Some(_)) => {
            if propagate_deletes {
                Some(ActionKind::DeleteRemote)
            } else {
                Some(ActionKind::Pull)
            }
        }
        (Some(_), None, None) => None,
        (None, None, None) => None,
    }
}
