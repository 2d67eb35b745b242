//! `reset-state` is the only subcommand spec §6 says must work without a
//! reachable remote or even a config file — it only touches the profile's
//! persisted manifest under the state directory.

use std::fs;
use std::process::Command;
use tempfile::tempdir;

fn rsync_sync(state_dir: &std::path::Path, profile: &str, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_rsync-sync"))
        .env("RSYNC_SYNC_STATE_DIR", state_dir)
        .args(["--profile", profile])
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn reset_state_removes_the_profile_manifest() {
    let temp = tempdir().unwrap();
    let state_dir = temp.path().join("state");
    fs::create_dir_all(&state_dir).unwrap();
    let manifest_path = state_dir.join("work.manifest");
    fs::write(&manifest_path, "src/main.rs\t0\t0\tf\n").unwrap();

    let output = rsync_sync(&state_dir, "work", &["reset-state"]);

    assert!(output.status.success());
    assert!(!manifest_path.exists(), "manifest should have been deleted");
}

#[test]
fn reset_state_on_an_already_clean_profile_is_not_an_error() {
    let temp = tempdir().unwrap();
    let state_dir = temp.path().join("state");

    let output = rsync_sync(&state_dir, "fresh", &["reset-state"]);

    assert!(output.status.success());
}

#[test]
fn reset_state_only_touches_its_own_profile() {
    let temp = tempdir().unwrap();
    let state_dir = temp.path().join("state");
    fs::create_dir_all(&state_dir).unwrap();
    let work_manifest = state_dir.join("work.manifest");
    let personal_manifest = state_dir.join("personal.manifest");
    fs::write(&work_manifest, "a\t0\t0\tf\n").unwrap();
    fs::write(&personal_manifest, "b\t0\t0\tf\n").unwrap();

    let output = rsync_sync(&state_dir, "work", &["reset-state"]);

    assert!(output.status.success());
    assert!(!work_manifest.exists());
    assert!(personal_manifest.exists(), "reset-state must not clear other profiles' state");
}
