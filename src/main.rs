//! rsync-sync - bidirectional directory synchronization over SSH
//!
//! Usage: rsync-sync [sync|status|reset-state]

use clap::Parser;

mod cli;

use cli::{Cli, Commands};
use rsync_sync::config::Config;
use rsync_sync::coordinator::Coordinator;
use rsync_sync::error::SyncError;
use rsync_sync::profile::{default_config_path, default_state_dir, ProfilePaths};
use rsync_sync::transport::SshTransport;

fn main() {
    let cli = Cli::parse();
    let exit_code = run(&cli).unwrap_or_else(|err| {
        eprintln!("error: {err}");
        err.exit_code()
    });
    std::process::exit(exit_code);
}

fn run(cli: &Cli) -> Result<i32, SyncError> {
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = Config::load(&config_path, &cli.profile)?;
    config.apply_env();
    if cli.dry_run {
        config.dry_run = true;
    }
    if cli.verbose {
        config.verbose = true;
    }

    let command = cli.command.as_ref().unwrap_or(&Commands::Sync);

    if matches!(command, Commands::ResetState) {
        let state_dir = config.state_dir.clone().unwrap_or_else(default_state_dir);
        let paths = ProfilePaths::new(&state_dir, &cli.profile);
        match std::fs::remove_file(&paths.manifest) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(SyncError::Io(e)),
        }
        println!("profile '{}': state reset", cli.profile);
        return Ok(0);
    }

    config.validate()?;

    let transport = SshTransport {
        user: config.remote_user.clone().unwrap_or_default(),
        host: config.remote_host.clone().unwrap_or_default(),
        port: config.remote_port,
        identity: config.ssh_identity.clone(),
        ssh_timeout: std::time::Duration::from_secs(config.ssh_timeout_secs),
        rsync_timeout: std::time::Duration::from_secs(config.rsync_timeout_secs),
        bandwidth_limit_kbps: config.bandwidth_limit_kbps,
        max_file_size: config.max_file_size,
    };

    let state_dir = config.state_dir.clone().unwrap_or_else(default_state_dir);
    let coordinator = Coordinator::new(cli.profile.clone(), config, &transport, &state_dir);

    match command {
        Commands::Status => {
            let actions = coordinator.status()?;
            print_actions(&actions);
            Ok(0)
        }
        Commands::Sync => {
            let report = coordinator.sync(cli.dry_run)?;
            print_actions(&report.actions);
            println!("{}", report.summary.to_human());
            if report.interrupted {
                return Ok(130);
            }
            Ok(if report.summary.had_failures() { 1 } else { 0 })
        }
        Commands::ResetState => unreachable!("handled above"),
    }
}

fn print_actions(actions: &[rsync_sync::differ::Action]) {
    for action in actions {
        if action.kind == rsync_sync::differ::ActionKind::Unchanged {
            continue;
        }
        println!("{:?} {}", action.kind, action.path);
    }
}
