//! The Executor: carries out each classified [`Action`] against the
//! filesystem and [`Transport`], with retries, backups, and a returned
//! accounting (spec §4.5).
//!
//! Per the reference's re-architecture note (§9, "process-wide mutable
//! counters → a returned summary structure"), counters are accumulated in
//! a [`SyncSummary`] value threaded through the run rather than kept as
//! globals, so a future parallel executor composes cleanly.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use chrono::Utc;

use crate::backup;
use crate::config::Config;
use crate::differ::{Action, ActionKind};
use crate::manifest::Manifest;
use crate::resolver::{self, ConflictStrategy, Resolution};
use crate::summary::SyncSummary;
use crate::transport::{FailureClass, Transport, TransportResult};

/// Everything the Executor needs to carry out one run's actions.
pub struct ExecutorContext<'a> {
    pub transport: &'a dyn Transport,
    pub local_root: &'a Path,
    pub remote_root: &'a str,
    pub local_manifest: &'a Manifest,
    pub remote_manifest: &'a Manifest,
    pub config: &'a Config,
}

/// Execute every action in `actions` (already sorted by path, spec §4.6
/// step 7), honouring dry-run, backups, and retries. `cancel` is polled
/// between actions; once it flips to `false` no new action is started
/// (spec §5 "cancellation") — any action already dispatched still runs to
/// completion since Transport operations are not preemptible mid-call.
pub fn execute(actions: &[Action], ctx: &ExecutorContext, cancel: &AtomicBool) -> SyncSummary {
    let mut summary = SyncSummary::new();
    for action in actions {
        if !cancel.load(Ordering::SeqCst) {
            break;
        }
        run_one(action, ctx, &mut summary);
    }
    summary
}

fn run_one(action: &Action, ctx: &ExecutorContext, summary: &mut SyncSummary) {
    match action.kind {
        ActionKind::Unchanged => {}
        ActionKind::Push => {
            let from_conflict = false;
            do_push(&action.path, ctx, from_conflict, summary);
            summary.record(ActionKind::Push);
        }
        ActionKind::Pull => {
            let from_conflict = false;
            do_pull(&action.path, ctx, from_conflict, summary);
            summary.record(ActionKind::Pull);
        }
        ActionKind::DeleteLocal => {
            do_delete_local(&action.path, ctx, summary);
            summary.record(ActionKind::DeleteLocal);
        }
        ActionKind::DeleteRemote => {
            do_delete_remote(&action.path, ctx, summary);
            summary.record(ActionKind::DeleteRemote);
        }
        ActionKind::Conflict => run_conflict(action, ctx, summary),
    }
}

fn run_conflict(action: &Action, ctx: &ExecutorContext, summary: &mut SyncSummary) {
    let path = &action.path;
    let local_entry = ctx.local_manifest.get(path);
    let remote_entry = ctx.remote_manifest.get(path);

    let resolved = match (local_entry, remote_entry) {
        (Some(local), Some(remote)) => {
            if ctx.config.checksum_verify && checksum_reclassify(ctx, path).is_some() {
                summary.record(ActionKind::Unchanged);
                return;
            }
            if ctx.config.conflict_strategy == ConflictStrategy::Backup {
                // spec §4.4: `backup` backs up both sides unconditionally,
                // independent of the separate `backup_on_conflict` option.
                maybe_backup_local(ctx, path);
                maybe_backup_remote(ctx, path);
            }
            resolver::resolve(ctx.config.conflict_strategy, local, remote)
        }
        // One side has no entry (can only happen transiently); default to
        // the side that does have it.
        (Some(_), None) => Resolution::Push,
        (None, Some(_)) => Resolution::Pull,
        (None, None) => Resolution::Skip,
    };

    summary.record(ActionKind::Conflict);
    match resolved {
        Resolution::Push => do_push(path, ctx, true, summary),
        Resolution::Pull => do_pull(path, ctx, true, summary),
        Resolution::Skip => summary.record_skip(),
    }
}

/// Returns `Some(())` if the checksum-verify pre-step reclassified the
/// conflict as unchanged (contents identical on both sides). The remote
/// side is pulled to a scratch path only long enough to hash it; on any
/// transport failure the pre-step is skipped and the normal strategy
/// applies.
fn checksum_reclassify(ctx: &ExecutorContext, path: &str) -> Option<()> {
    if !ctx.config.checksum_verify {
        return None;
    }
    let local_path = ctx.local_root.join(path);
    let scratch = tempfile::NamedTempFile::new().ok()?;
    ctx.transport.pull_file(ctx.remote_root, path, scratch.path()).ok()?;

    let local_digest = resolver::content_digest(&local_path).ok()?;
    let remote_digest = resolver::content_digest(scratch.path()).ok()?;
    if local_digest == remote_digest {
        Some(())
    } else {
        None
    }
}

fn do_push(path: &str, ctx: &ExecutorContext, from_conflict: bool, summary: &mut SyncSummary) {
    if ctx.config.backup_on_conflict && from_conflict {
        maybe_backup_remote(ctx, path);
    }
    if ctx.config.dry_run {
        log_dry_run("push", path);
        return;
    }
    let local_path = ctx.local_root.join(path);
    let result = with_retry(ctx.config, || ctx.transport.push_file(&local_path, ctx.remote_root, path));
    if let Err(e) = result {
        eprintln!("[executor] push '{path}' failed: {e}");
        summary.record_error();
    }
}

fn do_pull(path: &str, ctx: &ExecutorContext, from_conflict: bool, summary: &mut SyncSummary) {
    if ctx.config.backup_on_conflict && from_conflict {
        maybe_backup_local(ctx, path);
    }
    if ctx.config.dry_run {
        log_dry_run("pull", path);
        return;
    }
    let local_path = ctx.local_root.join(path);
    let result = with_retry(ctx.config, || ctx.transport.pull_file(ctx.remote_root, path, &local_path));
    if let Err(e) = result {
        eprintln!("[executor] pull '{path}' failed: {e}");
        summary.record_error();
    }
}

fn do_delete_local(path: &str, ctx: &ExecutorContext, summary: &mut SyncSummary) {
    if ctx.config.backup_on_conflict {
        maybe_backup_local(ctx, path);
    }
    if ctx.config.dry_run {
        log_dry_run("delete_local", path);
        return;
    }
    let local_path = ctx.local_root.join(path);
    match std::fs::remove_file(&local_path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            eprintln!("[executor] delete_local '{path}' failed: {e}");
            summary.record_error();
        }
    }
}

fn do_delete_remote(path: &str, ctx: &ExecutorContext, summary: &mut SyncSummary) {
    if ctx.config.backup_on_conflict {
        maybe_backup_remote(ctx, path);
    }
    if ctx.config.dry_run {
        log_dry_run("delete_remote", path);
        return;
    }
    let result = with_retry(ctx.config, || ctx.transport.delete_remote(ctx.remote_root, path));
    if let Err(e) = result {
        eprintln!("[executor] delete_remote '{path}' failed: {e}");
        summary.record_error();
    }
}

fn maybe_backup_local(ctx: &ExecutorContext, path: &str) {
    if let Err(e) = backup::backup_local(ctx.local_root, path, Utc::now()) {
        eprintln!("[backup] could not back up local '{path}': {e}");
    }
}

fn maybe_backup_remote(ctx: &ExecutorContext, path: &str) {
    backup::backup_remote(ctx.transport, ctx.remote_root, path, Utc::now());
}

fn log_dry_run(verb: &str, path: &str) {
    println!("[dry-run] would {verb} '{path}'");
}

/// Retry a Transport operation up to `MAX_RETRIES` times (spec §4.5),
/// sleeping `RETRY_DELAY` before the 2nd and subsequent attempts only.
/// Non-retriable (permanent) failures return immediately.
fn with_retry<F>(config: &Config, mut op: F) -> TransportResult<()>
where
    F: FnMut() -> TransportResult<()>,
{
    let mut attempt = 0;
    loop {
        match op() {
            Ok(()) => return Ok(()),
            Err(e) if e.class == FailureClass::Retriable && attempt < config.max_retries => {
                attempt += 1;
                thread::sleep(Duration::from_secs(config.retry_delay_secs));
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{EntryKind, ManifestEntry};
    use crate::transport::{FailureClass, Transport, TransportError, TransportResult};
    use std::cell::RefCell;
    use std::sync::Mutex;
    use tempfile::tempdir;

    #[derive(Default)]
    struct FakeTransport {
        pushed: Mutex<Vec<String>>,
        pulled: Mutex<Vec<String>>,
        deleted: Mutex<Vec<String>>,
        copied: Mutex<Vec<(String, String)>>,
        push_failures: RefCell<u32>,
    }

    impl Transport for FakeTransport {
        fn run_remote(&self, _cmd: &str) -> TransportResult<(String, String, i32)> {
            Ok((String::new(), String::new(), 0))
        }
        fn reachable(&self) -> crate::error::SyncResult<()> {
            Ok(())
        }
        fn scan_remote(&self, _root: &str, _excludes: &[String]) -> TransportResult<String> {
            Ok(String::new())
        }
        fn push_file(&self, local_path: &Path, _remote_root: &str, rel_path: &str) -> TransportResult<()> {
            if *self.push_failures.borrow() > 0 {
                *self.push_failures.borrow_mut() -= 1;
                return Err(TransportError { class: FailureClass::Retriable, message: "transient".into() });
            }
            let _ = std::fs::read(local_path);
            self.pushed.lock().unwrap().push(rel_path.to_string());
            Ok(())
        }
        fn pull_file(&self, _remote_root: &str, rel_path: &str, local_path: &Path) -> TransportResult<()> {
            std::fs::write(local_path, "pulled").ok();
            self.pulled.lock().unwrap().push(rel_path.to_string());
            Ok(())
        }
        fn delete_remote(&self, _remote_root: &str, rel_path: &str) -> TransportResult<()> {
            self.deleted.lock().unwrap().push(rel_path.to_string());
            Ok(())
        }
        fn copy_remote(&self, _remote_root: &str, src_rel: &str, dst_rel: &str) -> TransportResult<()> {
            self.copied.lock().unwrap().push((src_rel.to_string(), dst_rel.to_string()));
            Ok(())
        }
    }

    fn entry() -> ManifestEntry {
        ManifestEntry { mtime: 1, size: 1, kind: EntryKind::Regular }
    }

    #[test]
    fn push_invokes_transport_and_records_counter() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "x").unwrap();
        let transport = FakeTransport::default();
        let mut local = Manifest::new();
        local.insert("a.txt".into(), entry()).unwrap();
        let config = Config::default();

        let ctx = ExecutorContext {
            transport: &transport,
            local_root: dir.path(),
            remote_root: "/remote",
            local_manifest: &local,
            remote_manifest: &Manifest::new(),
            config: &config,
        };
        let cancel = AtomicBool::new(true);
        let actions = vec![Action { path: "a.txt".into(), kind: ActionKind::Push }];
        let summary = execute(&actions, &ctx, &cancel);

        assert_eq!(summary.pushed, 1);
        assert_eq!(transport.pushed.lock().unwrap().as_slice(), ["a.txt"]);
    }

    #[test]
    fn dry_run_does_not_invoke_transport() {
        let dir = tempdir().unwrap();
        let transport = FakeTransport::default();
        let mut config = Config::default();
        config.dry_run = true;

        let ctx = ExecutorContext {
            transport: &transport,
            local_root: dir.path(),
            remote_root: "/remote",
            local_manifest: &Manifest::new(),
            remote_manifest: &Manifest::new(),
            config: &config,
        };
        let cancel = AtomicBool::new(true);
        let actions = vec![Action { path: "a.txt".into(), kind: ActionKind::Pull }];
        let summary = execute(&actions, &ctx, &cancel);

        assert_eq!(summary.pulled, 1);
        assert!(transport.pulled.lock().unwrap().is_empty());
    }

    #[test]
    fn retries_transient_failure_then_succeeds() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "x").unwrap();
        let transport = FakeTransport { push_failures: RefCell::new(1), ..Default::default() };
        let mut local = Manifest::new();
        local.insert("a.txt".into(), entry()).unwrap();
        let mut config = Config::default();
        config.retry_delay_secs = 0;

        let ctx = ExecutorContext {
            transport: &transport,
            local_root: dir.path(),
            remote_root: "/remote",
            local_manifest: &local,
            remote_manifest: &Manifest::new(),
            config: &config,
        };
        let cancel = AtomicBool::new(true);
        let actions = vec![Action { path: "a.txt".into(), kind: ActionKind::Push }];
        let summary = execute(&actions, &ctx, &cancel);

        assert_eq!(summary.pushed, 1);
        assert_eq!(summary.errors, 0);
    }

    #[test]
    fn delete_local_removes_file() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("gone.txt"), "x").unwrap();
        let transport = FakeTransport::default();
        let config = Config::default();

        let ctx = ExecutorContext {
            transport: &transport,
            local_root: dir.path(),
            remote_root: "/remote",
            local_manifest: &Manifest::new(),
            remote_manifest: &Manifest::new(),
            config: &config,
        };
        let cancel = AtomicBool::new(true);
        let actions = vec![Action { path: "gone.txt".into(), kind: ActionKind::DeleteLocal }];
        let summary = execute(&actions, &ctx, &cancel);

        assert_eq!(summary.deleted_local, 1);
        assert!(!dir.path().join("gone.txt").exists());
    }

    #[test]
    fn cancellation_stops_before_next_action() {
        let dir = tempdir().unwrap();
        let transport = FakeTransport::default();
        let config = Config::default();

        let ctx = ExecutorContext {
            transport: &transport,
            local_root: dir.path(),
            remote_root: "/remote",
            local_manifest: &Manifest::new(),
            remote_manifest: &Manifest::new(),
            config: &config,
        };
        let cancel = AtomicBool::new(false);
        let actions = vec![
            Action { path: "a.txt".into(), kind: ActionKind::Pull },
            Action { path: "b.txt".into(), kind: ActionKind::Pull },
        ];
        let summary = execute(&actions, &ctx, &cancel);
        assert_eq!(summary.pulled, 0);
    }

    #[test]
    fn conflict_skip_strategy_records_skip_not_error() {
        let dir = tempdir().unwrap();
        let transport = FakeTransport::default();
        let mut local = Manifest::new();
        local.insert("m".into(), entry()).unwrap();
        let mut remote = Manifest::new();
        remote.insert("m".into(), ManifestEntry { mtime: 2, size: 1, kind: EntryKind::Regular }).unwrap();
        let mut config = Config::default();
        config.conflict_strategy = ConflictStrategy::Skip;

        let ctx = ExecutorContext {
            transport: &transport,
            local_root: dir.path(),
            remote_root: "/remote",
            local_manifest: &local,
            remote_manifest: &remote,
            config: &config,
        };
        let cancel = AtomicBool::new(true);
        let actions = vec![Action { path: "m".into(), kind: ActionKind::Conflict }];
        let summary = execute(&actions, &ctx, &cancel);

        assert_eq!(summary.conflicts, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.errors, 0);
    }

    #[test]
    fn backup_strategy_backs_up_both_sides_unconditionally() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("m"), "local contents").unwrap();
        let transport = FakeTransport::default();
        let mut local = Manifest::new();
        local.insert("m".into(), entry()).unwrap();
        let mut remote = Manifest::new();
        remote.insert("m".into(), ManifestEntry { mtime: 2, size: 1, kind: EntryKind::Regular }).unwrap();
        let mut config = Config::default();
        config.conflict_strategy = ConflictStrategy::Backup;
        // backup_on_conflict left false: the Backup strategy's backup must
        // not depend on this separate option.
        assert!(!config.backup_on_conflict);

        let ctx = ExecutorContext {
            transport: &transport,
            local_root: dir.path(),
            remote_root: "/remote",
            local_manifest: &local,
            remote_manifest: &remote,
            config: &config,
        };
        let cancel = AtomicBool::new(true);
        let actions = vec![Action { path: "m".into(), kind: ActionKind::Conflict }];
        let summary = execute(&actions, &ctx, &cancel);

        assert_eq!(summary.conflicts, 1);
        // remote has the later mtime, so newest pulls remote to local.
        assert_eq!(summary.pulled, 1);

        let backups: Vec<_> = std::fs::read_dir(dir.path().join(".sync-backups"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(backups.iter().any(|f| f.starts_with("m.")), "expected a local backup of 'm', got {backups:?}");

        let copied = transport.copied.lock().unwrap();
        assert_eq!(copied.len(), 1);
        assert_eq!(copied[0].0, "m");
        assert!(copied[0].1.starts_with(".sync-backups/m."));
    }
}
