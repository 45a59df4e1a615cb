//! Coalescing wake signal between producers and the dispatcher

use std::fmt;

use crossbeam::sync::{Parker, Unparker};

/// Create a connected signal/waiter pair.
#[must_use]
pub fn wake_signal() -> (WakeSignal, WakeWaiter) {
    let parker = Parker::new();
    let signal = WakeSignal {
        unparker: parker.unparker().clone(),
    };
    (signal, WakeWaiter { parker })
}

/// Producer side of a single-slot wake event.
///
/// Raising never blocks and takes no lock. Raises that arrive before the
/// waiter consumes the pending wake collapse into one.
#[derive(Clone)]
pub struct WakeSignal {
    unparker: Unparker,
}

impl WakeSignal {
    /// Mark a wake as pending and unblock the waiter if it is parked
    pub fn raise(&self) {
        self.unparker.unpark();
    }
}

impl fmt::Debug for WakeSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WakeSignal").finish_non_exhaustive()
    }
}

/// Consumer side of the wake event. Owned by exactly one thread.
pub struct WakeWaiter {
    parker: Parker,
}

impl WakeWaiter {
    /// Block, without timeout, until a wake is pending, then clear it.
    ///
    /// Returns immediately if a raise happened since the last wait.
    pub fn wait(&self) {
        self.parker.park();
    }
}

impl fmt::Debug for WakeWaiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WakeWaiter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_raise_before_wait_is_not_lost() {
        let (signal, waiter) = wake_signal();

        signal.raise();
        // returns without blocking
        waiter.wait();
    }

    #[test]
    fn test_raises_coalesce() {
        let (signal, waiter) = wake_signal();

        signal.raise();
        signal.raise();
        signal.raise();
        waiter.wait();

        // the three raises left a single pending wake behind, now consumed
        let woken = Arc::new(AtomicUsize::new(0));
        let handle = {
            let woken = woken.clone();
            thread::spawn(move || {
                waiter.wait();
                woken.fetch_add(1, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert_eq!(woken.load(Ordering::SeqCst), 0);

        signal.raise();
        handle.join().unwrap();
        assert_eq!(woken.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_raise_from_many_threads() {
        let (signal, waiter) = wake_signal();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let signal = signal.clone();
                thread::spawn(move || {
                    for _ in 0..100 {
                        signal.raise();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        waiter.wait();
    }
}
