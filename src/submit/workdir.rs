// src/submit/workdir.rs

//! Scoped change of the process working directory.

use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::errors::{DagSubmitError, Result};

/// Serialises working-directory changes across threads.
static CWD_LOCK: Mutex<()> = Mutex::new(());

thread_local! {
    /// Set while this thread holds a guard; catches re-entrant use, which
    /// would otherwise deadlock on `CWD_LOCK`.
    static HOLDING: Cell<bool> = const { Cell::new(false) };
}

/// Changes the working directory on creation and restores it on drop.
///
/// Restoration happens on every exit path, including `?` returns and panics.
/// Only one guard can exist per process at a time; other threads block in
/// [`WorkingDirGuard::enter`] until it is released, and the holding thread
/// gets an error if it tries to enter again.
#[derive(Debug)]
pub struct WorkingDirGuard {
    previous: PathBuf,
    _lock: MutexGuard<'static, ()>,
}

impl WorkingDirGuard {
    pub fn enter(dir: &Path) -> Result<Self> {
        if HOLDING.with(Cell::get) {
            return Err(DagSubmitError::Submission(
                "working directory is already held by a submission on this thread".to_string(),
            ));
        }

        let lock = CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let previous = std::env::current_dir()?;
        std::env::set_current_dir(dir).map_err(|e| {
            DagSubmitError::Submission(format!(
                "cannot enter artifact directory {:?}: {e}",
                dir
            ))
        })?;

        HOLDING.with(|h| h.set(true));
        debug!(dir = ?dir, previous = ?previous, "entered working directory");
        Ok(Self {
            previous,
            _lock: lock,
        })
    }

    /// The directory that will be restored on drop.
    pub fn previous(&self) -> &Path {
        &self.previous
    }
}

impl Drop for WorkingDirGuard {
    fn drop(&mut self) {
        if let Err(e) = std::env::set_current_dir(&self.previous) {
            warn!(previous = ?self.previous, error = %e, "failed to restore working directory");
        } else {
            debug!(dir = ?self.previous, "restored working directory");
        }
        HOLDING.with(|h| h.set(false));
    }
}
