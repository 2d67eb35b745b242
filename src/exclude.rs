//! Exclusion patterns used by the Scanner to prune both files and whole
//! directory subtrees during traversal.
//!
//! Grounded in the reference's `IgnorePatterns` (gitignore-compatible
//! matching via the `ignore` crate), generalized from a single ignore file
//! to an explicit ordered pattern list (`EXCLUDE_PATTERNS`, spec §6) plus
//! the always-excluded internal paths of spec §4.2.

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::Path;

use crate::error::{SyncError, SyncResult};

/// Subtrees that are always excluded from scans and transfers, regardless
/// of user configuration (spec §4.2, §6).
pub const ALWAYS_EXCLUDED: &[&str] = &[".sync-backups/", ".sync-state/"];

/// Compiled exclusion matcher over the configured `EXCLUDE_PATTERNS` plus
/// the always-excluded internal paths.
#[derive(Debug)]
pub struct ExcludeSet {
    matcher: Gitignore,
}

impl ExcludeSet {
    /// Build a matcher from an ordered pattern list. Patterns are
    /// interpreted with gitignore semantics (globs, `**`, negation with
    /// `!`), matched relative to the sync root.
    pub fn build(patterns: &[String]) -> SyncResult<Self> {
        let mut builder = GitignoreBuilder::new("");
        for pattern in ALWAYS_EXCLUDED.iter().copied().chain(patterns.iter().map(|s| s.as_str())) {
            builder
                .add_line(None, pattern)
                .map_err(|e| SyncError::ConfigInvalid(format!("bad exclude pattern '{pattern}': {e}")))?;
        }
        let matcher = builder
            .build()
            .map_err(|e| SyncError::ConfigInvalid(format!("could not build exclude matcher: {e}")))?;
        Ok(Self { matcher })
    }

    pub fn empty() -> Self {
        Self::build(&[]).expect("empty exclude set always builds")
    }

    /// True if `rel_path` (relative to the sync root) should be pruned.
    /// `is_dir` must be true for directories so a directory-level pattern
    /// short-circuits the subtree instead of requiring a per-file match.
    pub fn is_excluded(&self, rel_path: &Path, is_dir: bool) -> bool {
        self.matcher.matched_path_or_any_parents(rel_path, is_dir).is_ignore()
    }
}
