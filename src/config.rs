//! Configuration for rsync-sync.
//!
//! Layered per the reference's documented hierarchy (CLI flags >
//! environment variables > config file > built-in defaults), minus the
//! reference's project-vs-user config split — this engine has no project
//! directory concept, only named profiles (spec §6).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};
use crate::resolver::ConflictStrategy;

/// One `[profile.NAME]` table from the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub remote_user: Option<String>,
    pub remote_host: Option<String>,
    #[serde(default = "default_port")]
    pub remote_port: u16,
    pub ssh_identity: Option<String>,

    pub local_dir: Option<PathBuf>,
    pub remote_dir: Option<String>,

    #[serde(default)]
    pub exclude_patterns: Vec<String>,

    #[serde(default)]
    pub conflict_strategy: ConflictStrategy,

    #[serde(default = "default_true")]
    pub propagate_deletes: bool,

    #[serde(default)]
    pub backup_on_conflict: bool,

    #[serde(default)]
    pub checksum_verify: bool,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,

    #[serde(default = "default_ssh_timeout")]
    pub ssh_timeout_secs: u64,
    #[serde(default = "default_rsync_timeout")]
    pub rsync_timeout_secs: u64,

    pub bandwidth_limit_kbps: Option<u32>,
    pub max_file_size: Option<u64>,

    pub on_complete: Option<String>,
    pub on_failure: Option<String>,

    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub verbose: bool,

    #[serde(default)]
    pub state_dir: Option<PathBuf>,
}

fn default_port() -> u16 {
    22
}
fn default_true() -> bool {
    true
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_delay() -> u64 {
    2
}
fn default_ssh_timeout() -> u64 {
    10
}
fn default_rsync_timeout() -> u64 {
    120
}

impl Default for Config {
    fn default() -> Self {
        Config {
            remote_user: None,
            remote_host: None,
            remote_port: default_port(),
            ssh_identity: None,
            local_dir: None,
            remote_dir: None,
            exclude_patterns: Vec::new(),
            conflict_strategy: ConflictStrategy::default(),
            propagate_deletes: default_true(),
            backup_on_conflict: false,
            checksum_verify: false,
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay(),
            ssh_timeout_secs: default_ssh_timeout(),
            rsync_timeout_secs: default_rsync_timeout(),
            bandwidth_limit_kbps: None,
            max_file_size: None,
            on_complete: None,
            on_failure: None,
            dry_run: false,
            verbose: false,
            state_dir: None,
        }
    }
}

/// Root config file: a table of named profiles plus a `[default]` table
/// applied before the named profile's own values.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    default: Config,
    #[serde(default)]
    profile: std::collections::BTreeMap<String, Config>,
}

impl Config {
    /// Load the config file at `path` and resolve `profile`'s settings,
    /// falling back to the `[default]` table for any field the profile
    /// table does not override. A missing file yields built-in defaults.
    pub fn load(path: &Path, profile: &str) -> SyncResult<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path)?;
        let file: ConfigFile = toml::from_str(&content)?;
        let mut config = file.default;
        if let Some(overrides) = file.profile.get(profile) {
            config.merge(overrides);
        }
        Ok(config)
    }

    /// Overlay non-default fields from `other` onto `self`. Used to layer
    /// a named profile's table over `[default]`.
    fn merge(&mut self, other: &Config) {
        macro_rules! take_some {
            ($field:ident) => {
                if other.$field.is_some() {
                    self.$field = other.$field.clone();
                }
            };
        }
        take_some!(remote_user);
        take_some!(remote_host);
        take_some!(ssh_identity);
        take_some!(local_dir);
        take_some!(remote_dir);
        take_some!(bandwidth_limit_kbps);
        take_some!(max_file_size);
        take_some!(on_complete);
        take_some!(on_failure);
        take_some!(state_dir);

        if other.remote_port != default_port() {
            self.remote_port = other.remote_port;
        }
        if !other.exclude_patterns.is_empty() {
            self.exclude_patterns = other.exclude_patterns.clone();
        }
        self.conflict_strategy = other.conflict_strategy;
        self.propagate_deletes = other.propagate_deletes;
        self.backup_on_conflict = other.backup_on_conflict;
        self.checksum_verify = other.checksum_verify;
        self.max_retries = other.max_retries;
        self.retry_delay_secs = other.retry_delay_secs;
        self.ssh_timeout_secs = other.ssh_timeout_secs;
        self.rsync_timeout_secs = other.rsync_timeout_secs;
        self.dry_run = self.dry_run || other.dry_run;
        self.verbose = self.verbose || other.verbose;
    }

    /// Apply `RSYNC_SYNC_*`-prefixed environment variable overrides.
    pub fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("RSYNC_SYNC_REMOTE_USER") {
            self.remote_user = Some(v);
        }
        if let Ok(v) = std::env::var("RSYNC_SYNC_REMOTE_HOST") {
            self.remote_host = Some(v);
        }
        if let Ok(v) = std::env::var("RSYNC_SYNC_REMOTE_PORT") {
            if let Ok(port) = v.parse() {
                self.remote_port = port;
            }
        }
        if let Ok(v) = std::env::var("RSYNC_SYNC_DRY_RUN") {
            self.dry_run = parse_bool_env(&v);
        }
    }

    /// Validate that the recognised options required to run a sync are
    /// present and well-formed (`ConfigInvalid`, spec §7).
    pub fn validate(&self) -> SyncResult<()> {
        if self.remote_host.as_deref().unwrap_or("").is_empty() {
            return Err(SyncError::ConfigInvalid("REMOTE_HOST is required".into()));
        }
        if self.remote_user.as_deref().unwrap_or("").is_empty() {
            return Err(SyncError::ConfigInvalid("REMOTE_USER is required".into()));
        }
        if self.remote_port == 0 {
            return Err(SyncError::ConfigInvalid("REMOTE_PORT must be nonzero".into()));
        }
        let local_dir = self
            .local_dir
            .as_ref()
            .ok_or_else(|| SyncError::ConfigInvalid("LOCAL_DIR is required".into()))?;
        if !local_dir.is_absolute() {
            return Err(SyncError::ConfigInvalid("LOCAL_DIR must be absolute".into()));
        }
        let remote_dir = self
            .remote_dir
            .as_deref()
            .ok_or_else(|| SyncError::ConfigInvalid("REMOTE_DIR is required".into()))?;
        if !remote_dir.starts_with('/') && !remote_dir.starts_with('~') {
            return Err(SyncError::ConfigInvalid("REMOTE_DIR must be absolute".into()));
        }
        Ok(())
    }
}

fn parse_bool_env(v: &str) -> bool {
    matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
