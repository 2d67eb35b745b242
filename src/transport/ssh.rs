//! SSH-backed [`Transport`] implementation.
//!
//! Control operations (`run_remote`, `delete_remote`, `copy_remote`) go over
//! a plain `ssh` invocation; file transfers (`push_file`, `pull_file`) go
//! through `rsync -az --partial`, mirroring the reference's
//! `infrastructure::sync::remote::RsyncTransfer`. `reachable` additionally
//! confirms the remote has a transfer tool on `PATH` before a sync begins.

use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::time::Duration;

use super::{FailureClass, Transport, TransportError, TransportResult};
use crate::error::{SyncError, SyncResult};

/// Identity and timeouts for one remote endpoint.
#[derive(Debug, Clone)]
pub struct SshTransport {
    pub user: String,
    pub host: String,
    pub port: u16,
    pub identity: Option<String>,
    pub ssh_timeout: Duration,
    pub rsync_timeout: Duration,
    pub bandwidth_limit_kbps: Option<u32>,
    pub max_file_size: Option<u64>,
}

impl SshTransport {
    pub fn new(user: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            user: user.into(),
            host: host.into(),
            port,
            identity: None,
            ssh_timeout: Duration::from_secs(10),
            rsync_timeout: Duration::from_secs(120),
            bandwidth_limit_kbps: None,
            max_file_size: None,
        }
    }

    fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    fn ssh_command(&self) -> Command {
        let mut cmd = Command::new("ssh");
        cmd.arg("-p").arg(self.port.to_string());
        cmd.arg("-o").arg(format!("ConnectTimeout={}", self.ssh_timeout.as_secs().max(1)));
        cmd.arg("-o").arg("BatchMode=yes");
        if let Some(identity) = &self.identity {
            cmd.arg("-i").arg(identity);
        }
        cmd.arg(self.destination());
        cmd
    }

    fn rsync_remote_shell_args(&self) -> String {
        let mut ssh = format!("ssh -p {}", self.port);
        if let Some(identity) = &self.identity {
            ssh.push_str(&format!(" -i {}", shell_quote(identity)));
        }
        ssh
    }

    /// Apply the transfer caps common to `push_file`/`pull_file`:
    /// `RSYNC_TIMEOUT` and the optional `MAX_FILE_SIZE`/`BANDWIDTH_LIMIT_KBPS`
    /// transport caps of spec §6.
    fn apply_transfer_args(&self, cmd: &mut Command) {
        cmd.arg(format!("--timeout={}", self.rsync_timeout.as_secs()));
        if let Some(limit) = self.bandwidth_limit_kbps {
            cmd.arg(format!("--bwlimit={limit}"));
        }
        if let Some(max_size) = self.max_file_size {
            cmd.arg(format!("--max-size={max_size}"));
        }
    }

    fn classify_exit(output: &Output) -> FailureClass {
        // ssh: 255 signals a connection-layer failure; rsync follows the
        // same convention for its own transport errors. Everything else
        // (permission denied, no such file) is a remote-side/path failure.
        match output.status.code() {
            Some(255) => FailureClass::Retriable,
            _ => FailureClass::Permanent,
        }
    }

    fn run(&self, mut cmd: Command) -> TransportResult<Output> {
        cmd.stdin(Stdio::null());
        cmd.output().map_err(|e| TransportError {
            class: FailureClass::Retriable,
            message: format!("failed to spawn command: {e}"),
        })
    }
}

impl Transport for SshTransport {
    fn run_remote(&self, cmd: &str) -> TransportResult<(String, String, i32)> {
        let mut command = self.ssh_command();
        command.arg(cmd);
        let output = self.run(command)?;
        Ok((
            String::from_utf8_lossy(&output.stdout).into_owned(),
            String::from_utf8_lossy(&output.stderr).into_owned(),
            output.status.code().unwrap_or(-1),
        ))
    }

    fn reachable(&self) -> SyncResult<()> {
        let mut cmd = self.ssh_command();
        cmd.arg("command -v rsync >/dev/null 2>&1 || command -v scp >/dev/null 2>&1");
        let output = self.run(cmd).map_err(|e| {
            SyncError::TransportUnreachable(format!("{}@{}:{}: {}", self.user, self.host, self.port, e))
        })?;
        if !output.status.success() {
            return Err(SyncError::TransportUnreachable(format!(
                "{}@{}:{}: no transfer tool (rsync/scp) found on remote PATH",
                self.user, self.host, self.port
            )));
        }
        Ok(())
    }

    fn scan_remote(&self, remote_root: &str, excludes: &[String]) -> TransportResult<String> {
        // find+stat pipeline producing the same tab-separated wire format
        // `parse_remote_listing` expects: kind\tmtime\tsize\tpath
        let prune = build_prune_expr(excludes);
        let script = format!(
            "cd {root} 2>/dev/null || exit 0; \
             find . {prune} \\( -type f -o -type l \\) -printf '%y\\t%T@\\t%s\\t%P\\n' \
             | awk -F'\\t' '{{ kind = ($1==\"l\") ? \"l\" : \"f\"; size = ($1==\"l\") ? 0 : $3; \
                 split($2, t, \".\"); printf \"%s\\t%s\\t%s\\t%s\\n\", kind, t[1], size, $4 }}'",
            root = shell_quote(remote_root),
            prune = prune,
        );
        let (stdout, stderr, code) = self.run_remote(&script)?;
        if code != 0 {
            return Err(TransportError {
                class: FailureClass::Permanent,
                message: format!("remote scan failed: {stderr}"),
            });
        }
        Ok(stdout)
    }

    fn push_file(&self, local_path: &Path, remote_root: &str, rel_path: &str) -> TransportResult<()> {
        let remote_file = format!("{}/{}", remote_root.trim_end_matches('/'), rel_path);
        let remote_dir = Path::new(&remote_file).parent().map(|p| p.to_string_lossy().into_owned());
        if let Some(dir) = remote_dir {
            let (_, stderr, code) = self.run_remote(&format!("mkdir -p {}", shell_quote(&dir)))?;
            if code != 0 {
                return Err(TransportError {
                    class: FailureClass::Permanent,
                    message: format!("could not create remote directory: {stderr}"),
                });
            }
        }

        let mut cmd = Command::new("rsync");
        cmd.arg("-az").arg("--partial");
        self.apply_transfer_args(&mut cmd);
        cmd.arg("-e").arg(self.rsync_remote_shell_args());
        cmd.arg(local_path);
        cmd.arg(format!("{}:{}", self.destination(), remote_file));

        let output = self.run(cmd)?;
        if !output.status.success() {
            return Err(TransportError {
                class: Self::classify_exit(&output),
                message: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(())
    }

    fn pull_file(&self, remote_root: &str, rel_path: &str, local_path: &Path) -> TransportResult<()> {
        if let Some(parent) = local_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| TransportError {
                class: FailureClass::Permanent,
                message: format!("could not create local directory: {e}"),
            })?;
        }

        let remote_file = format!("{}/{}", remote_root.trim_end_matches('/'), rel_path);
        let mut cmd = Command::new("rsync");
        cmd.arg("-az").arg("--partial");
        self.apply_transfer_args(&mut cmd);
        cmd.arg("-e").arg(self.rsync_remote_shell_args());
        cmd.arg(format!("{}:{}", self.destination(), remote_file));
        cmd.arg(local_path);

        let output = self.run(cmd)?;
        if !output.status.success() {
            return Err(TransportError {
                class: Self::classify_exit(&output),
                message: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(())
    }

    fn delete_remote(&self, remote_root: &str, rel_path: &str) -> TransportResult<()> {
        let remote_file = format!("{}/{}", remote_root.trim_end_matches('/'), rel_path);
        let (_, stderr, code) = self.run_remote(&format!("rm -f {}", shell_quote(&remote_file)))?;
        if code != 0 {
            return Err(TransportError {
                class: FailureClass::Permanent,
                message: format!("remote delete failed: {stderr}"),
            });
        }
        Ok(())
    }

    fn copy_remote(&self, remote_root: &str, src_rel: &str, dst_rel: &str) -> TransportResult<()> {
        let src = format!("{}/{}", remote_root.trim_end_matches('/'), src_rel);
        let dst = format!("{}/{}", remote_root.trim_end_matches('/'), dst_rel);
        let dst_dir = Path::new(&dst).parent().map(|p| p.to_string_lossy().into_owned());
        let mkdir = dst_dir
            .map(|dir| format!("mkdir -p {} && ", shell_quote(&dir)))
            .unwrap_or_default();
        let cmd = format!("{mkdir}cp -p {} {}", shell_quote(&src), shell_quote(&dst));
        let (_, stderr, code) = self.run_remote(&cmd)?;
        if code != 0 {
            return Err(TransportError {
                class: FailureClass::Permanent,
                message: format!("remote copy failed: {stderr}"),
            });
        }
        Ok(())
    }
}

/// Quote a single path for embedding in a remote shell command.
fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

fn build_prune_expr(excludes: &[String]) -> String {
    let mut always: Vec<String> = vec![".sync-backups".into(), ".sync-state".into()];
    always.extend(excludes.iter().cloned());
    if always.is_empty() {
        return String::new();
    }
    let names: Vec<String> = always.iter().map(|p| format!("-path './{}*'", p.trim_end_matches('/'))).collect();
    format!("\\( {} \\) -prune -o", names.join(" -o "))
}
