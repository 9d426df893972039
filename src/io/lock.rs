use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Advisory lock serializing mutations of one book.
///
/// Every mutating command holds it for its whole run, so a second import
/// (or any other write) started while one is in flight waits and then
/// fails instead of interleaving with it.
///
/// The `.lock` file is never unlinked. Closing the descriptor releases the
/// flock, and every process must lock the same inode.
pub struct BookLock {
    _file: File,
}

/// Error type for lock operations
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("could not create lock file at {path}: {source}")]
    CreateError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("book is busy ({holder}); try again when it finishes")]
    Busy { holder: String },
}

impl BookLock {
    /// Acquire the lock for `operation`, waiting up to `timeout`.
    pub fn acquire(book_dir: &Path, operation: &str, timeout: Duration) -> Result<Self, LockError> {
        let lock_path = book_dir.join(".lock");
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| LockError::CreateError {
                path: lock_path.clone(),
                source: e,
            })?;

        let start = Instant::now();
        while try_lock(&file).is_err() {
            if start.elapsed() >= timeout {
                let holder = fs::read_to_string(&lock_path)
                    .ok()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| "another pb process".to_string());
                return Err(LockError::Busy { holder });
            }
            std::thread::sleep(Duration::from_millis(10));
        }

        // Best effort: lets a waiting process say who holds the lock
        let _ = file.set_len(0);
        let _ = write!(file, "{} (pid {})", operation, std::process::id());
        log::debug!("acquired {} for {}", lock_path.display(), operation);

        Ok(BookLock { _file: file })
    }

    /// Acquire with the default five-second wait
    pub fn acquire_default(book_dir: &Path, operation: &str) -> Result<Self, LockError> {
        Self::acquire(book_dir, operation, Duration::from_secs(5))
    }
}

#[cfg(unix)]
fn try_lock(file: &File) -> Result<(), std::io::Error> {
    use std::os::unix::io::AsRawFd;
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
    fn acquire_release_reacquire() {
        let tmp = TempDir::new().unwrap();
        let lock = BookLock::acquire_default(tmp.path(), "import").unwrap();
        drop(lock);
        assert!(tmp.path().join(".lock").exists());
        assert!(BookLock::acquire_default(tmp.path(), "import").is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn waiter_that_takes_over_excludes_newcomers() {
        use std::sync::mpsc;
        use std::thread;

        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().to_path_buf();
        let first = BookLock::acquire_default(&dir, "import").unwrap();

        let (acquired_tx, acquired_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let waiter_dir = dir.clone();
        let waiter = thread::spawn(move || {
            let lock = BookLock::acquire(&waiter_dir, "import", Duration::from_secs(5)).unwrap();
            acquired_tx.send(()).unwrap();
            release_rx.recv().unwrap();
            drop(lock);
        });

        // Let the waiter open the file and start polling before release
        thread::sleep(Duration::from_millis(50));
        drop(first);
        acquired_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        let third = BookLock::acquire(&dir, "import", Duration::from_millis(100));
        assert!(matches!(third, Err(LockError::Busy { .. })));

        release_tx.send(()).unwrap();
        waiter.join().unwrap();
        assert!(BookLock::acquire(&dir, "import", Duration::from_millis(100)).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn second_holder_is_told_who_is_busy() {
        let tmp = TempDir::new().unwrap();
        let _first = BookLock::acquire_default(tmp.path(), "import").unwrap();

        let err = BookLock::acquire(tmp.path(), "import", Duration::from_millis(50))
            .err()
            .unwrap();
        match err {
            LockError::Busy { holder } => assert!(holder.starts_with("import (pid")),
            other => panic!("expected Busy, got {:?}", other),
        }
    }
}
