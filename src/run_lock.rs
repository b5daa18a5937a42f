//! Host-wide single training run coordination through an OS file lock.
//!
//! The lock file's contents are never read or written; only the exclusive
//! lock held on it matters. The OS drops the lock when the owning process
//! exits, so a crashed run never leaves a stale lock behind.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

/// Lock file used when the configuration does not name one.
pub const DEFAULT_LOCK_FILE: &str = "miso.lock";
/// Wait between acquisition attempts while another run holds the lock.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(10);

/// Errors that may occur while acquiring the run lock.
#[derive(Debug, Error)]
pub enum RunLockError {
    /// Another process currently holds the lock.
    #[error("Another training run holds {path}")]
    Held { path: PathBuf },
    /// The lock file could not be opened or created.
    #[error("Failed to open lock file {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The OS refused the lock for a reason other than contention.
    #[error("Failed to lock {path}: {source}")]
    Lock {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl RunLockError {
    /// True when the failure is contention and a retry may succeed.
    pub fn is_held(&self) -> bool {
        matches!(self, Self::Held { .. })
    }
}

/// Guard for an acquired run lock; dropping it releases the lock.
#[derive(Debug)]
pub struct RunLock {
    file: File,
    path: PathBuf,
}

impl RunLock {
    /// Take the lock without waiting.
    pub fn try_acquire(path: impl AsRef<Path>) -> Result<Self, RunLockError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| RunLockError::Open {
                path: path.clone(),
                source,
            })?;
        match sys::try_lock_exclusive(&file) {
            Ok(true) => {
                debug!("Acquired run lock {}", path.display());
                Ok(Self { file, path })
            }
            Ok(false) => Err(RunLockError::Held { path }),
            Err(source) => Err(RunLockError::Lock { path, source }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(err) = sys::unlock(&self.file) {
            warn!("Failed to release run lock {}: {err}", self.path.display());
        } else {
            debug!("Released run lock {}", self.path.display());
        }
    }
}

/// Take the lock, waiting `backoff` between attempts for as long as it takes.
pub fn acquire_with_retry(path: &Path, backoff: Duration) -> Result<RunLock, RunLockError> {
    acquire_with_retry_observed(path, backoff, |_| {})
}

/// Like [`acquire_with_retry`], reporting the elapsed wait before each sleep.
///
/// Only contention is retried; any other failure is returned immediately.
pub fn acquire_with_retry_observed(
    path: &Path,
    backoff: Duration,
    mut on_wait: impl FnMut(Duration),
) -> Result<RunLock, RunLockError> {
    let start = Instant::now();
    loop {
        match RunLock::try_acquire(path) {
            Ok(lock) => return Ok(lock),
            Err(err) if err.is_held() => {
                let waited = start.elapsed();
                info!(
                    "Another training run is already active, trying again in {} seconds. ({}s waiting)",
                    backoff.as_secs_f64().round(),
                    waited.as_secs_f64().round()
                );
                on_wait(waited);
                std::thread::sleep(backoff);
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(unix)]
mod sys {
    use std::fs::File;
    use std::io;
    use std::os::unix::io::AsRawFd;

    pub(super) fn try_lock_exclusive(file: &File) -> io::Result<bool> {
        let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        if rc == 0 {
            return Ok(true);
        }
        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EWOULDBLOCK) {
            Ok(false)
        } else {
            Err(err)
        }
    }

    pub(super) fn unlock(file: &File) -> io::Result<()> {
        let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_UN) };
        if rc == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }
}

#[cfg(windows)]
mod sys {
    use std::fs::File;
    use std::io;
    use std::os::windows::io::AsRawHandle;

    use windows::Win32::Foundation::{ERROR_LOCK_VIOLATION, HANDLE};
    use windows::Win32::Storage::FileSystem::{
        LOCKFILE_EXCLUSIVE_LOCK, LOCKFILE_FAIL_IMMEDIATELY, LockFileEx, UnlockFile,
    };
    use windows::Win32::System::IO::OVERLAPPED;

    pub(super) fn try_lock_exclusive(file: &File) -> io::Result<bool> {
        let handle = HANDLE(file.as_raw_handle());
        let mut overlapped = OVERLAPPED::default();
        let result = unsafe {
            LockFileEx(
                handle,
                LOCKFILE_EXCLUSIVE_LOCK | LOCKFILE_FAIL_IMMEDIATELY,
                None,
                u32::MAX,
                u32::MAX,
                &mut overlapped,
            )
        };
        match result {
            Ok(()) => Ok(true),
            Err(err) if err.code() == ERROR_LOCK_VIOLATION.to_hresult() => Ok(false),
            Err(err) => Err(io::Error::other(err)),
        }
    }

    pub(super) fn unlock(file: &File) -> io::Result<()> {
        let handle = HANDLE(file.as_raw_handle());
        unsafe { UnlockFile(handle, 0, 0, u32::MAX, u32::MAX) }.map_err(io::Error::other)
    }
}

#[cfg(not(any(unix, windows)))]
mod sys {
    use std::fs::File;
    use std::io;

    pub(super) fn try_lock_exclusive(_file: &File) -> io::Result<bool> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "run locking is unavailable on this platform",
        ))
    }

    pub(super) fn unlock(_file: &File) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;
    use tempfile::tempdir;

    #[test]
    fn second_holder_sees_held_until_release() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DEFAULT_LOCK_FILE);
        let first = RunLock::try_acquire(&path).unwrap();
        let err = RunLock::try_acquire(&path).unwrap_err();
        assert!(err.is_held());
        drop(first);
        let again = RunLock::try_acquire(&path).unwrap();
        assert_eq!(again.path(), path.as_path());
    }

    #[test]
    fn lock_file_contents_are_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.lock");
        std::fs::write(&path, b"keep me").unwrap();
        let lock = RunLock::try_acquire(&path).unwrap();
        drop(lock);
        assert_eq!(std::fs::read(&path).unwrap(), b"keep me");
    }

    #[test]
    fn retry_succeeds_once_holder_releases() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DEFAULT_LOCK_FILE);
        let (held_tx, held_rx) = mpsc::channel();
        let holder_path = path.clone();
        let holder = thread::spawn(move || {
            let lock = RunLock::try_acquire(&holder_path).unwrap();
            held_tx.send(()).unwrap();
            thread::sleep(Duration::from_millis(150));
            drop(lock);
        });
        held_rx.recv().unwrap();

        let mut waits = Vec::new();
        let lock =
            acquire_with_retry_observed(&path, Duration::from_millis(20), |w| waits.push(w))
                .unwrap();
        assert!(!waits.is_empty());
        assert!(waits.windows(2).all(|pair| pair[0] <= pair[1]));
        drop(lock);
        holder.join().unwrap();
    }

    #[test]
    fn open_failure_is_not_retried() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join(DEFAULT_LOCK_FILE);
        let err = acquire_with_retry(&path, Duration::from_millis(1)).unwrap_err();
        assert!(matches!(err, RunLockError::Open { .. }));
        assert!(!err.is_held());
    }
}
