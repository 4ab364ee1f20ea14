//! Advisory lock over the sync directory.
//!
//! Every mutating command holds this lock for its full duration; read-only
//! commands do not take it. Acquisition is bounded: failure to acquire
//! within the timeout is a reported error, never a silent no-op. The lock
//! releases on drop, including on error paths.

use crate::error::{MirrorError, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const LOCK_FILE_NAME: &str = "lock";

/// Default acquisition timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// Held advisory lock. Dropping releases it.
#[derive(Debug)]
pub struct Lock {
    path: PathBuf,
}

impl Lock {
    /// Acquire the lock in `sync_dir`, retrying until `timeout` elapses.
    pub fn acquire(sync_dir: &Path, timeout: Duration) -> Result<Self> {
        fs::create_dir_all(sync_dir)?;
        let path = sync_dir.join(LOCK_FILE_NAME);
        let deadline = Instant::now() + timeout;

        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    // Owner pid, for stale-lock diagnosis only.
                    let _ = writeln!(file, "{}", std::process::id());
                    return Ok(Self { path });
                }
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                    if Instant::now() >= deadline {
                        return Err(MirrorError::LockTimeout {
                            path,
                            seconds: timeout.as_secs(),
                        });
                    }
                    std::thread::sleep(RETRY_INTERVAL);
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

impl Drop for Lock {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %err, "failed to release lock");
        }
    }
}
