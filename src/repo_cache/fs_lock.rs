//! Filesystem-based locking for cross-process coordination
//!
//! Several server processes may share one cache root. The in-memory per-key
//! mutex only covers this process; this exclusive flock() on a per-key lock
//! file keeps two processes from cloning into the same directory at once.

use crate::error::CloneError;
use fs2::FileExt;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Guard that holds an exclusive filesystem lock
///
/// The lock is released when this guard is dropped. If the process crashes,
/// the OS releases the flock.
pub struct FsLockGuard {
    file: File,
    path: PathBuf,
}

impl FsLockGuard {
    /// Try to acquire an exclusive filesystem lock, non-blocking
    ///
    /// Returns:
    /// - `Ok(Some(guard))` if the lock was acquired
    /// - `Ok(None)` if another holder has it
    /// - `Err(...)` on IO errors
    pub fn try_acquire(lock_path: &Path) -> io::Result<Option<Self>> {
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = File::create(lock_path)?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                tracing::debug!("Acquired filesystem lock {:?}", lock_path);
                Ok(Some(Self {
                    file,
                    path: lock_path.to_path_buf(),
                }))
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                tracing::debug!("Filesystem lock {:?} is held elsewhere", lock_path);
                Ok(None)
            }
            Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Acquire the lock, polling until it is free or `timeout` elapses
    pub async fn acquire(lock_path: &Path, timeout: Duration) -> Result<Self, CloneError> {
        let start = Instant::now();
        let mut announced = false;

        loop {
            match Self::try_acquire(lock_path) {
                Ok(Some(guard)) => {
                    if announced {
                        tracing::info!("Acquired filesystem lock after {:?}", start.elapsed());
                    }
                    return Ok(guard);
                }
                Ok(None) => {
                    if start.elapsed() >= timeout {
                        tracing::warn!(
                            "Timeout waiting for filesystem lock {:?} after {:?}",
                            lock_path,
                            timeout
                        );
                        return Err(CloneError::LockTimeout(lock_path.display().to_string()));
                    }
                    if !announced {
                        tracing::info!(
                            "Another process is cloning into this cache, waiting on {:?}",
                            lock_path
                        );
                        announced = true;
                    }
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
                Err(e) => {
                    return Err(CloneError::CacheDir {
                        path: lock_path.display().to_string(),
                        reason: format!("failed to lock: {}", e),
                    });
                }
            }
        }
    }
}

impl Drop for FsLockGuard {
    fn drop(&mut self) {
        // Closing the file releases the lock too; unlocking explicitly keeps
        // the release ordered before any later reopen in this process.
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::debug!("Failed to unlock {:?}: {}", self.path, e);
        }
        // The lock file itself is left in place for reuse
    }
}
