//! Resolves the on-disk layout for one named profile's persistent state
//! (spec §5.1): the manifest file, the lock file, and the state directory
//! itself. Modeled on the reference's `dirs_config_dir` helper for
//! XDG-aware path resolution.

use std::path::PathBuf;

/// Paths for one profile's persisted state under `state_dir`.
#[derive(Debug, Clone)]
pub struct ProfilePaths {
    pub manifest: PathBuf,
    pub lock: PathBuf,
    pub remote_version: PathBuf,
}

impl ProfilePaths {
    pub fn new(state_dir: &std::path::Path, profile: &str) -> Self {
        Self {
            manifest: state_dir.join(format!("{profile}.manifest")),
            lock: state_dir.join(format!("{profile}.lock")),
            remote_version: state_dir.join(format!("{profile}.remote-version")),
        }
    }
}

/// Default state directory: `$XDG_STATE_HOME/rsync-sync` or
/// `~/.local/state/rsync-sync`, falling back to `~/.rsync-sync/state`.
pub fn default_state_dir() -> PathBuf {
    if let Ok(path) = std::env::var("RSYNC_SYNC_STATE_DIR") {
        return PathBuf::from(path);
    }
    if let Some(state_home) = std::env::var_os("XDG_STATE_HOME") {
        return PathBuf::from(state_home).join("rsync-sync");
    }
    dirs::home_dir()
        .map(|h| h.join(".local/state/rsync-sync"))
        .unwrap_or_else(|| PathBuf::from(".rsync-sync/state"))
}

/// Default config file path: `$XDG_CONFIG_HOME/rsync-sync/config.toml` or
/// `~/.config/rsync-sync/config.toml`.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var("RSYNC_SYNC_CONFIG") {
        return PathBuf::from(path);
    }
    if let Some(config_home) = std::env::var_os("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join("rsync-sync/config.toml");
    }
    dirs::home_dir()
        .map(|h| h.join(".config/rsync-sync/config.toml"))
        .unwrap_or_else(|| PathBuf::from(".rsync-sync/config.toml"))
}
