//! Process lock preventing overlapping scheduled runs
//!
//! Cron fires on wall-clock time with no knowledge of whether the previous
//! cycle finished. The lock file at the project root holds the owning pid;
//! a second instance finding a live lock exits quietly (exit code 0) so cron
//! does not report an error, and the next tick tries again.

use crate::logger::{self, LogTag};
use crate::paths;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

pub struct ProcessLock {
    path: PathBuf,
}

impl ProcessLock {
    /// Try to acquire the exclusive process lock
    ///
    /// Returns `Ok(None)` when another live instance holds the lock. A lock
    /// file whose pid no longer exists is treated as stale (left over from a
    /// crash or power loss) and replaced.
    pub fn try_acquire() -> Result<Option<Self>, String> {
        let path = paths::get_lock_path();

        if path.exists() {
            let holder = fs::read_to_string(&path).unwrap_or_default();
            let holder_pid = holder.trim().parse::<u32>().ok();

            match holder_pid {
                Some(pid) if is_process_alive(pid) => {
                    logger::warning(
                        LogTag::System,
                        &format!("Another instance is running (pid {}), exiting", pid),
                    );
                    return Ok(None);
                }
                _ => {
                    logger::warning(
                        LogTag::System,
                        &format!("Removing stale lock file {}", path.display()),
                    );
                    fs::remove_file(&path)
                        .map_err(|e| format!("Failed to remove stale lock: {}", e))?;
                }
            }
        }

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| format!("Failed to create lock file {}: {}", path.display(), e))?;

        write!(file, "{}", std::process::id())
            .map_err(|e| format!("Failed to write pid to lock file: {}", e))?;

        Ok(Some(Self { path }))
    }
}

impl Drop for ProcessLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            logger::warning(
                LogTag::System,
                &format!("Failed to remove lock file {}: {}", self.path.display(), e),
            );
        }
    }
}

/// Check whether a pid refers to a live process
#[cfg(target_os = "linux")]
fn is_process_alive(pid: u32) -> bool {
    std::path::Path::new(&format!("/proc/{}", pid)).exists()
}

#[cfg(not(target_os = "linux"))]
fn is_process_alive(_pid: u32) -> bool {
    // Conservative without procfs: assume the holder is alive and skip the run
    true
}

#[cfg(test)]
mod tests {
    #[test]
    #[cfg(target_os = "linux")]
    fn test_own_pid_is_alive() {
        assert!(super::is_process_alive(std::process::id()));
        assert!(!super::is_process_alive(u32::MAX));
    }
}
