//! In-memory engine backlog

use std::collections::VecDeque;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};

use elog_port::{PendingRecordSource, WakeSignal};
use parking_lot::{Condvar, Mutex};
use tracing::trace;

#[derive(Debug, Default)]
struct State {
    bytes: VecDeque<u8>,
    paused: bool,
    blocked: usize,
}

/// Byte queue standing in for the logging engine's buffered records.
///
/// Appends never block; with a capacity set, a record that does not fit is
/// dropped whole and counted. Pulls can be paused, which parks the puller
/// inside [`PendingRecordSource::pull`] until [`MemoryBacklog::resume`].
#[derive(Debug, Default)]
pub struct MemoryBacklog {
    state: Mutex<State>,
    resumed: Condvar,
    capacity: Option<usize>,
    signal: OnceLock<WakeSignal>,
    pulls: AtomicU64,
    dropped: AtomicU64,
}

impl MemoryBacklog {
    /// Create an unbounded backlog
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backlog holding at most `capacity` bytes
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    /// Connect the wake signal raised by [`MemoryBacklog::append_and_notify`].
    ///
    /// Returns `false` if a signal was already attached.
    pub fn attach(&self, signal: WakeSignal) -> bool {
        self.signal.set(signal).is_ok()
    }

    /// Queue a record without waking anyone. Returns `false` if it was dropped.
    pub fn append(&self, record: &[u8]) -> bool {
        let mut state = self.state.lock();

        if let Some(capacity) = self.capacity
            && state.bytes.len() + record.len() > capacity
        {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        state.bytes.extend(record);
        true
    }

    /// Queue a record and raise the attached wake signal
    pub fn append_and_notify(&self, record: &[u8]) -> bool {
        let queued = self.append(record);
        if let Some(signal) = self.signal.get() {
            signal.raise();
        }
        queued
    }

    /// Make pulls block until [`MemoryBacklog::resume`]
    pub fn pause(&self) {
        self.state.lock().paused = true;
    }

    /// Let blocked and future pulls proceed
    pub fn resume(&self) {
        self.state.lock().paused = false;
        self.resumed.notify_all();
    }

    /// Pullers currently parked by [`MemoryBacklog::pause`]
    #[must_use]
    pub fn blocked_pullers(&self) -> usize {
        self.state.lock().blocked
    }

    /// Bytes waiting to be pulled
    #[must_use]
    pub fn pending(&self) -> usize {
        self.state.lock().bytes.len()
    }

    /// Whether nothing is waiting
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending() == 0
    }

    /// Pull calls made so far, empty ones included
    #[must_use]
    pub fn pulls(&self) -> u64 {
        self.pulls.load(Ordering::Acquire)
    }

    /// Records dropped for lack of space
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn take(&self, buf: &mut [u8], line: bool) -> usize {
        let mut state = self.state.lock();
        while state.paused {
            state.blocked += 1;
            self.resumed.wait(&mut state);
            state.blocked -= 1;
        }
        self.pulls.fetch_add(1, Ordering::AcqRel);

        let available = state.bytes.len().min(buf.len());
        let len = if line {
            state
                .bytes
                .iter()
                .take(available)
                .position(|&b| b == b'\n')
                .map_or(available, |newline| newline + 1)
        } else {
            available
        };

        for (slot, byte) in buf.iter_mut().zip(state.bytes.drain(..len)) {
            *slot = byte;
        }

        trace!(len, remaining = state.bytes.len(), "backlog pulled");
        len
    }
}

impl PendingRecordSource for MemoryBacklog {
    fn pull(&self, buf: &mut [u8]) -> usize {
        self.take(buf, false)
    }

    fn pull_line(&self, buf: &mut [u8]) -> usize {
        self.take(buf, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_pull_chunks() {
        let backlog = MemoryBacklog::new();
        backlog.append(b"first\n");
        backlog.append(b"second\n");

        let mut buf = [0u8; 8];
        assert_eq!(backlog.pull(&mut buf), 8);
        assert_eq!(&buf, b"first\nse");
        assert_eq!(backlog.pull(&mut buf), 5);
        assert_eq!(&buf[..5], b"cond\n");
        assert_eq!(backlog.pull(&mut buf), 0);
        assert_eq!(backlog.pulls(), 3);
    }

    #[test]
    fn test_pull_lines() {
        let backlog = MemoryBacklog::new();
        backlog.append(b"a\nbb\n");
        backlog.append(b"tail");

        let mut buf = [0u8; 16];
        assert_eq!(backlog.pull_line(&mut buf), 2);
        assert_eq!(&buf[..2], b"a\n");
        assert_eq!(backlog.pull_line(&mut buf), 3);
        assert_eq!(&buf[..3], b"bb\n");
        // unterminated remainder comes out as-is
        assert_eq!(backlog.pull_line(&mut buf), 4);
        assert_eq!(&buf[..4], b"tail");
        assert_eq!(backlog.pull_line(&mut buf), 0);
    }

    #[test]
    fn test_line_longer_than_buffer_is_split() {
        let backlog = MemoryBacklog::new();
        backlog.append(b"abcdefgh\n");

        let mut buf = [0u8; 4];
        assert_eq!(backlog.pull_line(&mut buf), 4);
        assert_eq!(&buf, b"abcd");
        assert_eq!(backlog.pull_line(&mut buf), 4);
        assert_eq!(&buf, b"efgh");
        assert_eq!(backlog.pull_line(&mut buf), 1);
        assert_eq!(&buf[..1], b"\n");
    }

    #[test]
    fn test_capacity_drops_whole_records() {
        let backlog = MemoryBacklog::with_capacity(8);

        assert!(backlog.append(b"12345"));
        assert!(!backlog.append(b"6789"));
        assert!(backlog.append(b"678"));

        assert_eq!(backlog.dropped(), 1);
        assert_eq!(backlog.pending(), 8);
    }

    #[test]
    fn test_append_and_notify_raises_signal() {
        let (signal, waiter) = elog_port::wake_signal();
        let backlog = MemoryBacklog::new();

        assert!(backlog.attach(signal.clone()));
        assert!(!backlog.attach(signal));

        backlog.append_and_notify(b"x");
        // pending wake: returns at once
        waiter.wait();
        assert_eq!(backlog.pending(), 1);
    }

    #[test]
    fn test_pause_blocks_pulls() {
        let backlog = Arc::new(MemoryBacklog::new());
        backlog.append(b"held");
        backlog.pause();

        let puller = {
            let backlog = backlog.clone();
            thread::spawn(move || {
                let mut buf = [0u8; 8];
                backlog.pull(&mut buf)
            })
        };

        while backlog.blocked_pullers() == 0 {
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(backlog.pending(), 4);

        backlog.resume();
        assert_eq!(puller.join().unwrap(), 4);
        assert!(backlog.is_empty());
    }
}
