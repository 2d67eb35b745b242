//! The manifest model: a canonical snapshot of a directory tree.
//!
//! A [`Manifest`] is the ground truth the [`crate::differ`] compares against.
//! It never mutates an entry in place; scans replace the whole map.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{SyncError, SyncResult};

/// Kind of a tracked filesystem entry. Directories are not first-class:
/// their existence is implied by the paths they contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntryKind {
    Regular,
    Symlink,
}

impl EntryKind {
    fn as_char(self) -> char {
        match self {
            EntryKind::Regular => 'f',
            EntryKind::Symlink => 'l',
        }
    }

    fn from_char(c: char) -> Option<Self> {
        match c {
            'f' => Some(EntryKind::Regular),
            'l' => Some(EntryKind::Symlink),
            _ => None,
        }
    }
}

/// A single tracked path: its modification time, size, and kind.
///
/// Equality for diffing purposes is structural over (mtime, size, kind);
/// `path` is the map key and is not part of entry equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManifestEntry {
    pub mtime: u64,
    pub size: u64,
    pub kind: EntryKind,
}

/// A mapping from relative path to [`ManifestEntry`].
///
/// `BTreeMap` keeps keys in lexicographic byte order for free, which is the
/// canonical serialised form required by the wire format (one line per
/// entry, sorted by path) and by the Differ's deterministic output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, path: &str) -> Option<&ManifestEntry> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ManifestEntry)> {
        self.entries.iter().map(|(p, e)| (p.as_str(), e))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }

    /// Insert an entry, rejecting paths that are unsafe per the manifest's
    /// contract (spec §3: forward slashes, no leading `./`, no escape).
    pub fn insert(&mut self, path: String, entry: ManifestEntry) -> SyncResult<()> {
        validate_path(&path)?;
        self.entries.insert(path, entry);
        Ok(())
    }

    pub fn remove(&mut self, path: &str) -> Option<ManifestEntry> {
        self.entries.remove(path)
    }

    /// Serialise to the canonical tab-separated, newline-terminated,
    /// path-sorted wire format (spec §6). `BTreeMap` iteration is already
    /// sorted, so this is a straight line-by-line render.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for (path, entry) in &self.entries {
            out.push_str(path);
            out.push('\t');
            out.push_str(&entry.mtime.to_string());
            out.push('\t');
            out.push_str(&entry.size.to_string());
            out.push('\t');
            out.push(entry.kind.as_char());
            out.push('\n');
        }
        out
    }

    /// Parse the canonical wire format. An empty string is a valid empty
    /// manifest.
    pub fn parse(text: &str) -> SyncResult<Self> {
        let mut manifest = Manifest::new();
        for (lineno, line) in text.lines().enumerate() {
            if line.is_empty() {
                continue;
            }
            let mut fields = line.split('\t');
            let path = fields.next().ok_or_else(|| malformed(lineno, line))?;
            let mtime: u64 = fields
                .next()
                .ok_or_else(|| malformed(lineno, line))?
                .parse()
                .map_err(|_| malformed(lineno, line))?;
            let size: u64 = fields
                .next()
                .ok_or_else(|| malformed(lineno, line))?
                .parse()
                .map_err(|_| malformed(lineno, line))?;
            let kind_str = fields.next().ok_or_else(|| malformed(lineno, line))?;
            if fields.next().is_some() {
                return Err(malformed(lineno, line));
            }
            let kind = EntryKind::from_char(
                kind_str.chars().next().ok_or_else(|| malformed(lineno, line))?,
            )
            .ok_or_else(|| malformed(lineno, line))?;

            manifest.insert(path.to_string(), ManifestEntry { mtime, size, kind })?;
        }
        Ok(manifest)
    }
}

fn malformed(lineno: usize, line: &str) -> SyncError {
    SyncError::ConfigInvalid(format!("malformed manifest line {}: {:?}", lineno + 1, line))
}

/// Validate that a path is relative, uses forward slashes, has no leading
/// `./`, no trailing slash, and cannot escape the sync root. Grounded in
/// the reference's `validate_path_safety`.
pub fn validate_path(path: &str) -> SyncResult<()> {
    if path.is_empty() {
        return Err(SyncError::ConfigInvalid("empty manifest path".into()));
    }
    if path.starts_with('/') || path.contains('\\') {
        return Err(SyncError::PathEscape {
            path: path.into(),
            root: ".".into(),
        });
    }
    if path.starts_with("./") || path == "." {
        return Err(SyncError::ConfigInvalid(format!(
            "path '{path}' must not have a leading './'"
        )));
    }
    if path.ends_with('/') {
        return Err(SyncError::ConfigInvalid(format!(
            "path '{path}' must not have a trailing slash"
        )));
    }
    if path.split('/').any(|segment| segment == "..") {
        return Err(SyncError::PathEscape {
            path: path.into(),
            root: ".".into(),
        });
    }
    Ok(())
}

impl fmt::Display for Manifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.serialize())
    }
}
