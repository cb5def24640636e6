//! In-process single-flight guard.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Lets at most one holder run a job at a time within this process.
///
/// Clones share the flag. The flag is owned by the poller rather than being
/// global, so tests can hold or reset it directly.
#[derive(Debug, Default, Clone)]
pub struct SingleFlightGuard {
    running: Arc<AtomicBool>,
}

impl SingleFlightGuard {
    /// Creates an idle guard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the guard, or returns `None` while another holder runs.
    #[must_use]
    pub fn try_acquire(&self) -> Option<SingleFlightPermit> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SingleFlightPermit {
                running: Arc::clone(&self.running),
            })
    }

    /// Returns whether a holder is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Forces the guard idle, e.g. after a holder was leaked.
    pub fn reset(&self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Releases the guard on drop.
#[derive(Debug)]
pub struct SingleFlightPermit {
    running: Arc<AtomicBool>,
}

impl Drop for SingleFlightPermit {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}
