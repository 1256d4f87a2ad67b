//! Exclusive advisory lock scoped to the state directory.
//!
//! The lock file's content is never read; it exists only as a lock target.
//! Holding a `StateLock` is the only way to mutate counters, ledger, or index,
//! and dropping it releases the lock on every exit path.
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Error)]
pub enum LockError {
    #[error("timed out after {waited_ms}ms waiting for state lock {}", .path.display())]
    Timeout { path: PathBuf, waited_ms: u128 },
    #[error("state lock {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// RAII guard for the state-directory lock.
#[derive(Debug)]
pub struct StateLock {
    file: File,
    path: PathBuf,
}

impl StateLock {
    /// Acquire the lock, polling until `timeout` elapses.
    pub fn acquire(path: &Path, timeout: Duration) -> Result<Self, LockError> {
        let io_err = |source| LockError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)
            .map_err(io_err)?;

        let started = Instant::now();
        loop {
            match FileExt::try_lock_exclusive(&file) {
                Ok(()) => {
                    tracing::debug!(path = %path.display(), "state lock acquired");
                    return Ok(Self {
                        file,
                        path: path.to_path_buf(),
                    });
                }
                Err(err) if is_contended(&err) => {
                    let waited = started.elapsed();
                    if waited >= timeout {
                        return Err(LockError::Timeout {
                            path: path.to_path_buf(),
                            waited_ms: waited.as_millis(),
                        });
                    }
                    std::thread::sleep(POLL_INTERVAL.min(timeout - waited));
                }
                Err(err) => return Err(io_err(err)),
            }
        }
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if let Err(err) = FileExt::unlock(&self.file) {
            tracing::warn!(path = %self.path.display(), error = %err, "failed to unlock state");
        }
    }
}

fn is_contended(err: &std::io::Error) -> bool {
    err.kind() == ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_times_out_until_first_guard_drops() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("state").join(".lock");

        let first = StateLock::acquire(&path, Duration::from_millis(100)).expect("first lock");
        let err = StateLock::acquire(&path, Duration::from_millis(60))
            .expect_err("second lock should time out");
        assert!(matches!(err, LockError::Timeout { .. }));

        drop(first);
        StateLock::acquire(&path, Duration::from_millis(100)).expect("lock after release");
    }
}
