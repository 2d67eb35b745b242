//! The Transport abstraction: the minimum set of operations the core
//! needs against the remote endpoint (spec §4.1). Opaque over the
//! underlying tool — the reference shows two concrete strategies
//! (`rsync`, falling back to `scp`) behind one interface; this crate keeps
//! that shape as the `Transport` trait with a single `ssh` implementation.

mod ssh;

pub use ssh::SshTransport;

use std::path::Path;

use crate::error::SyncResult;

/// Whether a Transport failure is worth retrying. Network-class failures
/// (connection refused, DNS, timeout) are retriable; permission/path
/// failures are not (spec §4.1, §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    Retriable,
    Permanent,
}

#[derive(Debug, Clone)]
pub struct TransportError {
    pub class: FailureClass,
    pub message: String,
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for TransportError {}

pub type TransportResult<T> = Result<T, TransportError>;

/// The narrow interface the core needs against a remote endpoint.
pub trait Transport {
    /// Execute a shell command on the remote under the configured identity.
    fn run_remote(&self, cmd: &str) -> TransportResult<(String, String, i32)>;

    /// Verify the remote accepts a connection and the transfer binary is
    /// present.
    fn reachable(&self) -> SyncResult<()>;

    /// List the remote sync root in the wire format consumed by
    /// [`crate::scanner::parse_remote_listing`]. Returns an empty listing
    /// if the remote root does not exist yet.
    fn scan_remote(&self, remote_root: &str, excludes: &[String]) -> TransportResult<String>;

    /// Copy one file to `remote_root/rel_path`, creating parent
    /// directories, preserving mtime. Resumable on partial transfer.
    fn push_file(&self, local_path: &Path, remote_root: &str, rel_path: &str) -> TransportResult<()>;

    /// Symmetric counterpart of [`Transport::push_file`].
    fn pull_file(&self, remote_root: &str, rel_path: &str, local_path: &Path) -> TransportResult<()>;

    /// Remove the path if present; absence is not an error.
    fn delete_remote(&self, remote_root: &str, rel_path: &str) -> TransportResult<()>;

    /// Copy within the remote side (used for remote-side backup staging).
    fn copy_remote(&self, remote_root: &str, src_rel: &str, dst_rel: &str) -> TransportResult<()>;
}
