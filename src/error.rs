//! Error types for rsync-sync
//!
//! Uses `thiserror` for the library's typed error, the same way the
//! reference derives its own error enum; `main.rs` is the single boundary
//! that turns a `SyncError` into a printed message and an exit code.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for rsync-sync operations
pub type SyncResult<T> = Result<T, SyncError>;

/// Main error type for rsync-sync operations
#[derive(Error, Debug)]
pub enum SyncError {
    /// A required configuration key is missing or has an invalid value
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// Another Coordinator already holds the profile lock
    #[error("profile '{profile}' is locked by pid {pid}")]
    Locked { profile: String, pid: u32 },

    /// Pre-flight check against the remote endpoint failed
    #[error("remote unreachable: {0}")]
    TransportUnreachable(String),

    /// A root could not be enumerated
    #[error("could not scan '{path}': {message}")]
    ScanError { path: PathBuf, message: String },

    /// A path escapes its sync root or is otherwise unsafe
    #[error("path '{path}' escapes sync root '{root}'")]
    PathEscape { path: PathBuf, root: PathBuf },

    /// A per-file action failed after exhausting retries
    #[error("action failed for '{path}': {message}")]
    ActionError { path: String, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The run was interrupted by a user signal (Ctrl-C)
    #[error("interrupted")]
    Interrupted,

    /// The run was terminated by a signal
    #[error("terminated")]
    Terminated,
}

impl SyncError {
    /// Exit code as specified by the CLI contract: 0 success, 1 generic
    /// error, 130 interrupt, 143 termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            SyncError::Interrupted => 130,
            SyncError::Terminated => 143,
            _ => 1,
        }
    }
}
