use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

pub const LOCK_FILE: &str = ".lock";
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Exclusive advisory lock on a data directory, held while writing.
///
/// Backed by `flock` on Unix so concurrent `nx` processes take turns.
/// Released when dropped; the lock file itself stays in place.
#[derive(Debug)]
pub struct DirLock {
    _file: File,
    path: PathBuf,
}

/// Error type for lock operations
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("could not open lock file {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("timed out waiting for {path}: another nx process is writing")]
    Timeout { path: PathBuf },
}

impl DirLock {
    /// Block up to `timeout` waiting for the lock on `data_dir`.
    pub fn acquire(data_dir: &Path, timeout: Duration) -> Result<Self, LockError> {
        let path = data_dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| LockError::Open {
                path: path.clone(),
                source,
            })?;

        let start = Instant::now();
        loop {
            match try_lock(&file) {
                Ok(()) => return Ok(DirLock { _file: file, path }),
                Err(_) if start.elapsed() < timeout => {
                    std::thread::sleep(Duration::from_millis(10));
                }
                Err(_) => return Err(LockError::Timeout { path }),
            }
        }
    }

    pub fn acquire_default(data_dir: &Path) -> Result<Self, LockError> {
        Self::acquire(data_dir, DEFAULT_LOCK_TIMEOUT)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(unix)]
fn try_lock(file: &File) -> Result<(), std::io::Error> {
    use std::os::unix::io::AsRawFd;
    // SAFETY: the descriptor is owned by `file` and stays open for the call.
    let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if result == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn try_lock(_file: &File) -> Result<(), std::io::Error> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn reacquire_after_drop() {
        let tmp = TempDir::new().unwrap();
        let lock = DirLock::acquire_default(tmp.path()).unwrap();
        assert!(lock.path().ends_with(LOCK_FILE));
        drop(lock);
        assert!(DirLock::acquire_default(tmp.path()).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn second_holder_times_out() {
        let tmp = TempDir::new().unwrap();
        let _held = DirLock::acquire_default(tmp.path()).unwrap();
        let err = DirLock::acquire(tmp.path(), Duration::from_millis(50)).unwrap_err();
        assert!(matches!(err, LockError::Timeout { .. }));
    }

    #[test]
    fn missing_dir_is_open_error() {
        let tmp = TempDir::new().unwrap();
        let err = DirLock::acquire_default(&tmp.path().join("nope")).unwrap_err();
        assert!(matches!(err, LockError::Open { .. }));
    }
}
