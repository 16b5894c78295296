//! Single-instance guard backed by a `pidlock` PID file.
//!
//! The lock is the only piece of cross-process shared state in the system.
//! It is acquired once at startup and held for the daemon's lifetime, which
//! makes overlapping recording sessions impossible system-wide: a second
//! launch fails here and exits before it can touch the microphone or the
//! hotkey.  Stale PID files left by a crashed instance are detected and
//! reclaimed by `pidlock`.

use std::path::Path;

use pidlock::Pidlock;
use thiserror::Error;

/// Errors from acquiring the single-instance lock.
#[derive(Debug, Error)]
pub enum InstanceError {
    /// Another live instance holds the lock.
    #[error("another instance is already running (lock file: {0})")]
    AlreadyRunning(String),
}

/// Holds the PID lock for the lifetime of the daemon.
///
/// Dropping the guard releases the lock and removes the PID file.
pub struct InstanceGuard {
    lock: Pidlock,
}

impl InstanceGuard {
    /// Try to become the single running instance.
    ///
    /// # Errors
    ///
    /// Returns [`InstanceError::AlreadyRunning`] when the lock is held by a
    /// live process (or cannot be created at all).  Callers treat this as a
    /// startup failure and exit without disturbing the running instance.
    pub fn acquire(path: &Path) -> Result<Self, InstanceError> {
        let path_str = path.to_string_lossy().to_string();
        let mut lock = Pidlock::new(&path_str);
        match lock.acquire() {
            Ok(()) => {
                log::debug!("instance lock acquired at {path_str}");
                Ok(Self { lock })
            }
            Err(_) => Err(InstanceError::AlreadyRunning(path_str)),
        }
    }
}

impl Drop for InstanceGuard {
    fn drop(&mut self) {
        let _ = self.lock.release();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
