//! Command-line surface (external collaborator, spec §1/§6): argument
//! parsing only. All semantics live in [`crate::coordinator::Coordinator`].

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "rsync-sync")]
#[command(author, version, about = "Bidirectional directory synchronization over SSH", long_about = None)]
#[command(after_help = "Run 'rsync-sync' with no subcommand to perform a sync using the default profile.")]
pub struct Cli {
    /// Named profile to operate on (spec §3 ProfileState).
    #[arg(short, long, default_value = "default", global = true)]
    pub profile: String,

    /// Explicit config file path (default: $XDG_CONFIG_HOME/rsync-sync/config.toml).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Show what would happen without transferring or deleting anything.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Verbose logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Never prompt; fail instead of asking (non-interactive CI usage).
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Perform a bidirectional sync (the default when no subcommand is given).
    Sync,
    /// Show the classified actions a sync would perform, without executing them.
    Status,
    /// Delete the persisted manifest for this profile, forcing the next run to be a first sync.
    ResetState,
}
