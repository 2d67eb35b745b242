//! The Coordinator: lifecycle of a single sync invocation (spec §4.6).
//!
//! Lock → pre-flight → scan (local + remote) → load previous manifest →
//! diff → execute → rescan → persist → release lock → report. Installs a
//! signal handler so Ctrl-C/SIGTERM leaves no persisted manifest and no
//! held lock (spec §5 "cancellation"), following the reference's
//! `Arc<AtomicBool>` pattern from `commands::watch::cmd_watch`.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::config::Config;
use crate::differ::{self, ActionList};
use crate::error::{SyncError, SyncResult};
use crate::exclude::ExcludeSet;
use crate::executor::{self, ExecutorContext};
use crate::lock::ProfileLock;
use crate::manifest::Manifest;
use crate::profile::ProfilePaths;
use crate::scanner;
use crate::store;
use crate::summary::SyncSummary;
use crate::transport::Transport;

const REMOTE_VERSION_CACHE_TTL: Duration = Duration::from_secs(24 * 3600);

pub struct Coordinator<'a> {
    pub profile: String,
    pub config: Config,
    pub transport: &'a dyn Transport,
    pub paths: ProfilePaths,
}

/// The outcome of one `status` or `sync` invocation.
pub struct RunReport {
    pub actions: ActionList,
    pub summary: SyncSummary,
    pub dry_run: bool,
    /// True if a signal cut the run short. Persistence and hooks are
    /// skipped whenever this is set (spec §5).
    pub interrupted: bool,
}

impl<'a> Coordinator<'a> {
    pub fn new(profile: impl Into<String>, config: Config, transport: &'a dyn Transport, state_dir: &Path) -> Self {
        let profile = profile.into();
        let paths = ProfilePaths::new(state_dir, &profile);
        Self { profile, config, transport, paths }
    }

    fn excludes(&self) -> SyncResult<ExcludeSet> {
        ExcludeSet::build(&self.config.exclude_patterns)
    }

    fn local_root(&self) -> SyncResult<&Path> {
        self.config
            .local_dir
            .as_deref()
            .ok_or_else(|| SyncError::ConfigInvalid("LOCAL_DIR is required".into()))
    }

    fn remote_root(&self) -> SyncResult<&str> {
        self.config
            .remote_dir
            .as_deref()
            .ok_or_else(|| SyncError::ConfigInvalid("REMOTE_DIR is required".into()))
    }

    fn scan_both(&self) -> SyncResult<(Manifest, Manifest)> {
        let excludes = self.excludes()?;
        let local_root = self.local_root()?;
        let remote_root = self.remote_root()?;

        let local = scanner::scan(local_root, &excludes)?;
        let remote = self.scan_remote(remote_root)?;
        Ok((local, remote))
    }

    fn scan_remote(&self, remote_root: &str) -> SyncResult<Manifest> {
        let listing = self
            .transport
            .scan_remote(remote_root, &self.config.exclude_patterns)
            .map_err(|e| SyncError::ScanError { path: PathBuf::from(remote_root), message: e.to_string() })?;
        Ok(scanner::parse_remote_listing(&listing))
    }

    /// Pre-flight (spec §4.6 step 3): verify the remote is reachable and
    /// has a transfer tool, caching the check per profile for up to 24h so
    /// a hot loop of runs does not re-probe every time.
    fn preflight(&self) -> SyncResult<()> {
        if self.cache_is_fresh() {
            return Ok(());
        }
        self.transport.reachable()?;
        self.write_cache_stamp();
        Ok(())
    }

    fn cache_is_fresh(&self) -> bool {
        let Ok(meta) = std::fs::metadata(&self.paths.remote_version) else { return false };
        let Ok(modified) = meta.modified() else { return false };
        SystemTime::now().duration_since(modified).map(|age| age < REMOTE_VERSION_CACHE_TTL).unwrap_or(false)
    }

    fn write_cache_stamp(&self) {
        if let Some(parent) = self.paths.remote_version.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let _ = std::fs::write(&self.paths.remote_version, "checked");
    }

    /// The `status` command (spec §4.6): resolve, scan, load, diff — no
    /// lock, no pre-flight, no execution.
    pub fn status(&self) -> SyncResult<ActionList> {
        let (local, remote) = self.scan_both()?;
        let prev = store::load(&self.paths.manifest)?;
        Ok(differ::diff(&prev, &local, &remote, self.config.propagate_deletes))
    }

    /// `reset-state` (spec §4.6): delete the persisted manifest so the
    /// next run is a first sync. A missing file is not an error.
    pub fn reset_state(&self) -> SyncResult<()> {
        match std::fs::remove_file(&self.paths.manifest) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SyncError::Io(e)),
        }
    }

    /// Run a full sync (spec §4.6 steps 2-9).
    pub fn sync(&self, dry_run_override: bool) -> SyncResult<RunReport> {
        let _lock = ProfileLock::acquire(&self.paths.lock, &self.profile)?;

        let cancel = Arc::new(AtomicBool::new(true));
        let handler_flag = Arc::clone(&cancel);
        // Best-effort: a process only gets one global handler; a second
        // Coordinator run in the same process (as in tests) simply keeps
        // the first one installed, which is harmless here.
        let _ = ctrlc::set_handler(move || {
            handler_flag.store(false, Ordering::SeqCst);
        });

        self.preflight()?;

        let (local, remote) = self.scan_both()?;
        let prev = store::load(&self.paths.manifest)?;
        let actions = differ::diff(&prev, &local, &remote, self.config.propagate_deletes);

        let mut run_config = self.config.clone();
        run_config.dry_run = self.config.dry_run || dry_run_override;

        let local_root = self.local_root()?.to_path_buf();
        let remote_root = self.remote_root()?.to_string();

        let ctx = ExecutorContext {
            transport: self.transport,
            local_root: &local_root,
            remote_root: &remote_root,
            local_manifest: &local,
            remote_manifest: &remote,
            config: &run_config,
        };
        let summary = executor::execute(&actions, &ctx, &cancel);
        let interrupted = !cancel.load(Ordering::SeqCst);

        if interrupted {
            return Ok(RunReport { actions, summary, dry_run: run_config.dry_run, interrupted: true });
        }

        if !run_config.dry_run && summary.errors == 0 {
            let excludes = self.excludes()?;
            let post_local = scanner::scan(&local_root, &excludes)?;
            let post_remote = self.scan_remote(&remote_root)?;
            let merged = store::merge(&post_local, &post_remote, &actions);
            store::save(&self.paths.manifest, &merged)?;
        }

        drop(_lock);

        if summary.errors == 0 {
            run_hook(self.config.on_complete.as_deref());
        } else {
            run_hook(self.config.on_failure.as_deref());
        }

        Ok(RunReport { actions, summary, dry_run: run_config.dry_run, interrupted: false })
    }
}

/// Invoke an `ON_COMPLETE`/`ON_FAILURE` shell hook. Best-effort: a failing
/// hook is logged, not propagated (the sync itself already finished).
fn run_hook(hook: Option<&str>) {
    let Some(hook) = hook else { return };
    match Command::new("sh").arg("-c").arg(hook).status() {
        Ok(status) if !status.success() => {
            eprintln!("[hook] '{hook}' exited with {status}");
        }
        Err(e) => eprintln!("[hook] could not run '{hook}': {e}"),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::differ::ActionKind;
    use crate::transport::{FailureClass, TransportError, TransportResult};
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// A transport backed by a second in-memory "remote" directory, so
    /// push/pull/delete/scan all behave like a real filesystem endpoint
    /// without actually invoking `ssh`/`rsync`.
    struct DirTransport {
        root: PathBuf,
        fail_next_push: Mutex<bool>,
    }

    impl DirTransport {
        fn new(root: PathBuf) -> Self {
            Self { root, fail_next_push: Mutex::new(false) }
        }
    }

    impl Transport for DirTransport {
        fn run_remote(&self, _cmd: &str) -> TransportResult<(String, String, i32)> {
            Ok((String::new(), String::new(), 0))
        }
        fn reachable(&self) -> SyncResult<()> {
            Ok(())
        }
        fn scan_remote(&self, remote_root: &str, _excludes: &[String]) -> TransportResult<String> {
            let excludes = ExcludeSet::empty();
            let manifest = scanner::scan_or_empty(Path::new(remote_root), &excludes);
            Ok(manifest.serialize().lines().map(|l| {
                let mut f = l.splitn(4, '\t');
                let path = f.next().unwrap_or("");
                let mtime = f.next().unwrap_or("0");
                let size = f.next().unwrap_or("0");
                let kind = f.next().unwrap_or("f");
                format!("{kind}\t{mtime}\t{size}\t{path}\n")
            }).collect())
        }
        fn push_file(&self, local_path: &Path, remote_root: &str, rel_path: &str) -> TransportResult<()> {
            if std::mem::take(&mut *self.fail_next_push.lock().unwrap()) {
                return Err(TransportError { class: FailureClass::Retriable, message: "injected".into() });
            }
            let dst = Path::new(remote_root).join(rel_path);
            if let Some(parent) = dst.parent() {
                std::fs::create_dir_all(parent).ok();
            }
            std::fs::copy(local_path, dst).map_err(|e| TransportError { class: FailureClass::Permanent, message: e.to_string() })?;
            Ok(())
        }
        fn pull_file(&self, remote_root: &str, rel_path: &str, local_path: &Path) -> TransportResult<()> {
            let src = Path::new(remote_root).join(rel_path);
            if let Some(parent) = local_path.parent() {
                std::fs::create_dir_all(parent).ok();
            }
            std::fs::copy(src, local_path).map_err(|e| TransportError { class: FailureClass::Permanent, message: e.to_string() })?;
            Ok(())
        }
        fn delete_remote(&self, remote_root: &str, rel_path: &str) -> TransportResult<()> {
            let path = Path::new(remote_root).join(rel_path);
            match std::fs::remove_file(path) {
                Ok(()) | Err(_) => Ok(()),
            }
        }
        fn copy_remote(&self, remote_root: &str, src_rel: &str, dst_rel: &str) -> TransportResult<()> {
            let src = Path::new(remote_root).join(src_rel);
            let dst = Path::new(remote_root).join(dst_rel);
            if let Some(parent) = dst.parent() {
                std::fs::create_dir_all(parent).ok();
            }
            std::fs::copy(src, dst).ok();
            Ok(())
        }
    }

    fn base_config(local: &Path, remote: &Path) -> Config {
        Config {
            remote_user: Some("u".into()),
            remote_host: Some("h".into()),
            local_dir: Some(local.to_path_buf()),
            remote_dir: Some(remote.to_string_lossy().into_owned()),
            ..Config::default()
        }
    }

    #[test]
    fn first_sync_pushes_local_and_pulls_remote_then_persists() {
        let state = tempdir().unwrap();
        let local = tempdir().unwrap();
        let remote = tempdir().unwrap();
        std::fs::write(local.path().join("a.txt"), "from local").unwrap();
        std::fs::write(remote.path().join("b.txt"), "from remote").unwrap();

        let transport = DirTransport::new(remote.path().to_path_buf());
        let config = base_config(local.path(), remote.path());
        let coordinator = Coordinator::new("default", config, &transport, state.path());

        let report = coordinator.sync(false).unwrap();
        assert_eq!(report.summary.pushed, 1);
        assert_eq!(report.summary.pulled, 1);
        assert_eq!(report.summary.errors, 0);
        assert!(!report.interrupted);

        assert!(remote.path().join("a.txt").exists());
        assert!(local.path().join("b.txt").exists());

        let manifest_path = state.path().join("default.manifest");
        assert!(manifest_path.exists());
        let persisted = store::load(&manifest_path).unwrap();
        assert_eq!(persisted.len(), 2);
    }

    #[test]
    fn dry_run_does_not_persist_a_manifest() {
        let state = tempdir().unwrap();
        let local = tempdir().unwrap();
        let remote = tempdir().unwrap();
        std::fs::write(local.path().join("a.txt"), "x").unwrap();

        let transport = DirTransport::new(remote.path().to_path_buf());
        let mut config = base_config(local.path(), remote.path());
        config.dry_run = true;
        let coordinator = Coordinator::new("default", config, &transport, state.path());

        let report = coordinator.sync(false).unwrap();
        assert_eq!(report.summary.pushed, 1);
        assert!(!remote.path().join("a.txt").exists());
        assert!(!state.path().join("default.manifest").exists());
    }

    #[test]
    fn second_run_with_no_changes_is_all_unchanged() {
        let state = tempdir().unwrap();
        let local = tempdir().unwrap();
        let remote = tempdir().unwrap();
        std::fs::write(local.path().join("a.txt"), "x").unwrap();

        let transport = DirTransport::new(remote.path().to_path_buf());
        let config = base_config(local.path(), remote.path());
        let coordinator = Coordinator::new("default", config, &transport, state.path());
        coordinator.sync(false).unwrap();

        let actions = coordinator.status().unwrap();
        assert!(actions.iter().all(|a| a.kind == ActionKind::Unchanged));
    }

    #[test]
    fn reset_state_clears_manifest_and_forces_first_sync_again() {
        let state = tempdir().unwrap();
        let local = tempdir().unwrap();
        let remote = tempdir().unwrap();
        std::fs::write(local.path().join("a.txt"), "x").unwrap();

        let transport = DirTransport::new(remote.path().to_path_buf());
        let config = base_config(local.path(), remote.path());
        let coordinator = Coordinator::new("default", config, &transport, state.path());
        coordinator.sync(false).unwrap();
        assert!(state.path().join("default.manifest").exists());

        coordinator.reset_state().unwrap();
        assert!(!state.path().join("default.manifest").exists());
    }

    #[test]
    fn errors_suppress_persistence() {
        let state = tempdir().unwrap();
        let local = tempdir().unwrap();
        let remote = tempdir().unwrap();
        std::fs::write(local.path().join("a.txt"), "x").unwrap();

        let transport = DirTransport::new(remote.path().to_path_buf());
        *transport.fail_next_push.lock().unwrap() = true;
        let mut config = base_config(local.path(), remote.path());
        config.max_retries = 0;
        let coordinator = Coordinator::new("default", config, &transport, state.path());

        let report = coordinator.sync(false).unwrap();
        assert_eq!(report.summary.errors, 1);
        assert!(!state.path().join("default.manifest").exists());
    }

    #[test]
    fn second_coordinator_same_profile_is_locked() {
        let state = tempdir().unwrap();
        let local = tempdir().unwrap();
        let remote = tempdir().unwrap();
        let transport = DirTransport::new(remote.path().to_path_buf());
        let config = base_config(local.path(), remote.path());

        let lock_path = ProfilePaths::new(state.path(), "default").lock;
        let _held = ProfileLock::acquire(&lock_path, "default").unwrap();

        let coordinator = Coordinator::new("default", config, &transport, state.path());
        let result = coordinator.sync(false);
        assert!(matches!(result, Err(SyncError::Locked { .. })));
    }
}
