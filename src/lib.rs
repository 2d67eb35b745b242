//! rsync-sync - bidirectional directory synchronization over SSH
//!
//! Keeps a local directory tree and a remote directory tree (reachable
//! over SSH) in agreement by computing a three-way diff against a
//! persisted snapshot of the last successful sync, then pushing, pulling,
//! or deleting exactly the paths that changed on one side since that
//! snapshot — including safe propagation of deletions.

pub mod backup;
pub mod config;
pub mod coordinator;
pub mod differ;
pub mod error;
pub mod exclude;
pub mod executor;
pub mod lock;
pub mod manifest;
pub mod profile;
pub mod resolver;
pub mod scanner;
pub mod store;
pub mod summary;
pub mod transport;

pub use config::Config;
pub use coordinator::{Coordinator, RunReport};
pub use differ::{diff, Action, ActionKind, ActionList};
pub use error::{SyncError, SyncResult};
pub use manifest::{EntryKind, Manifest, ManifestEntry};
pub use resolver::ConflictStrategy;
pub use summary::SyncSummary;
