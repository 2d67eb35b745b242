//! Per-profile exclusive lock (spec §5.2, S8). Mirrors the reference's
//! `TomlRegistryRepository` locking pattern (`fs2::FileExt` over a sibling
//! `.lock` file) but uses `try_lock_exclusive` rather than a blocking
//! acquire — a second concurrent run on the same profile must be rejected,
//! not queued.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::{SyncError, SyncResult};

/// Holds the lock file open for the duration of a run; releases on drop.
pub struct ProfileLock {
    file: File,
    path: PathBuf,
    profile: String,
}

impl ProfileLock {
    /// Attempt to acquire the lock for `profile` at `lock_path`. If the
    /// lock is already held by a live process, returns
    /// `SyncError::Locked`. If it is held by a PID that no longer exists
    /// (a stale lock left behind by a crash), the lock is reclaimed.
    pub fn acquire(lock_path: &Path, profile: &str) -> SyncResult<Self> {
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = File::options().read(true).write(true).create(true).open(lock_path)?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                write_pid(&file)?;
                Ok(Self {
                    file,
                    path: lock_path.to_path_buf(),
                    profile: profile.to_string(),
                })
            }
            Err(_) => {
                let holder_pid = read_pid(lock_path).unwrap_or(0);
                if holder_pid != 0 && !process_alive(holder_pid) {
                    // Stale lock: the holder no longer exists. Reclaim.
                    file.unlock().ok();
                    file.lock_exclusive()?;
                    write_pid(&file)?;
                    return Ok(Self {
                        file,
                        path: lock_path.to_path_buf(),
                        profile: profile.to_string(),
                    });
                }
                Err(SyncError::Locked {
                    profile: profile.to_string(),
                    pid: holder_pid,
                })
            }
        }
    }
}

impl Drop for ProfileLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
        let _ = fs::remove_file(&self.path);
    }
}

fn write_pid(file: &File) -> SyncResult<()> {
    let mut file = file.try_clone()?;
    file.set_len(0)?;
    use std::io::Seek;
    file.seek(std::io::SeekFrom::Start(0))?;
    file.write_all(std::process::id().to_string().as_bytes())?;
    file.flush()?;
    Ok(())
}

fn read_pid(path: &Path) -> Option<u32> {
    let mut content = String::new();
    File::open(path).ok()?.read_to_string(&mut content).ok()?;
    content.trim().parse().ok()
}

#[cfg(unix)]
fn process_alive(pid: u32) -> bool {
    // `kill -0` probes existence/permission without sending a real signal.
    std::process::Command::new("kill")
        .arg("-0")
        .arg(pid.to_string())
        .output()
        .map(|o| o.status.success())
        .unwrap_or(true)
}

#[cfg(not(unix))]
fn process_alive(_pid: u32) -> bool {
    true
}
