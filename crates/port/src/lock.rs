//! Output lock serializing every write to the sink

use parking_lot::{Mutex, MutexGuard};

/// Mutual exclusion around the physical sink.
///
/// Shared by synchronous callers and the dispatcher so that both paths live in
/// one exclusion domain. Not recursive: acquiring twice on the same thread
/// deadlocks.
#[derive(Debug, Default)]
pub struct OutputLock {
    mutex: Mutex<()>,
}

/// Ownership of the sink; released on drop.
#[must_use = "the output lock is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct OutputGuard<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl OutputLock {
    /// Create an unlocked output lock
    pub const fn new() -> Self {
        Self {
            mutex: Mutex::new(()),
        }
    }

    /// Block, without timeout, until the sink is owned exclusively.
    pub fn acquire(&self) -> OutputGuard<'_> {
        OutputGuard {
            _guard: self.mutex.lock(),
        }
    }

    /// Acquire without handing out a guard.
    ///
    /// For engines that pair explicit lock and unlock calls. Must be matched
    /// by exactly one [`OutputLock::release_raw`].
    pub fn acquire_raw(&self) {
        std::mem::forget(self.mutex.lock());
    }

    /// Release ownership taken with [`OutputLock::acquire_raw`].
    ///
    /// # Safety
    ///
    /// The lock must currently be held through a prior `acquire_raw` whose
    /// release has not happened yet. Releasing a lock that is not held, or
    /// that is held through a live [`OutputGuard`], is undefined behavior.
    pub unsafe fn release_raw(&self) {
        // SAFETY: upheld by the caller
        unsafe { self.mutex.force_unlock() };
    }

    /// Whether some thread currently owns the sink
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.mutex.is_locked()
    }
}
