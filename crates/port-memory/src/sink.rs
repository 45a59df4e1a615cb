//! Sink that records every write

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use elog_port::Sink;
use parking_lot::Mutex;

/// One recorded write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSpan {
    /// When the write started, relative to the sink's creation
    pub start: Duration,
    /// When the write finished
    pub end: Duration,
    /// Name of the writing thread
    pub thread: Option<String>,
    /// The bytes written
    pub bytes: Vec<u8>,
}

/// Sink that keeps every write with its start and end time.
///
/// Detects writers that enter concurrently, both directly (a write starting
/// while another is in progress) and after the fact through
/// [`RecordingSink::find_overlap`].
#[derive(Debug)]
pub struct RecordingSink {
    epoch: Instant,
    write_delay: Duration,
    writing: AtomicBool,
    collisions: AtomicU64,
    spans: Mutex<Vec<WriteSpan>>,
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingSink {
    /// Create a sink whose writes complete immediately
    #[must_use]
    pub fn new() -> Self {
        Self::with_write_delay(Duration::ZERO)
    }

    /// Create a sink that holds each write open for `delay`, widening any race
    #[must_use]
    pub fn with_write_delay(delay: Duration) -> Self {
        Self {
            epoch: Instant::now(),
            write_delay: delay,
            writing: AtomicBool::new(false),
            collisions: AtomicU64::new(0),
            spans: Mutex::new(Vec::new()),
        }
    }

    /// Every byte written, in completion order
    #[must_use]
    pub fn contents(&self) -> Vec<u8> {
        self.spans
            .lock()
            .iter()
            .flat_map(|span| span.bytes.iter().copied())
            .collect()
    }

    /// Recorded writes in completion order
    #[must_use]
    pub fn spans(&self) -> Vec<WriteSpan> {
        self.spans.lock().clone()
    }

    /// Number of writes
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.spans.lock().len()
    }

    /// Writes that began while another write was still in progress
    #[must_use]
    pub fn collisions(&self) -> u64 {
        self.collisions.load(Ordering::SeqCst)
    }

    /// First pair of recorded writes whose spans overlap
    #[must_use]
    pub fn find_overlap(&self) -> Option<(WriteSpan, WriteSpan)> {
        let mut spans = self.spans();
        spans.sort_by_key(|span| span.start);

        spans
            .windows(2)
            .find(|pair| pair[1].start < pair[0].end)
            .map(|pair| (pair[0].clone(), pair[1].clone()))
    }
}

impl Sink for RecordingSink {
    fn write(&self, bytes: &[u8]) {
        if self.writing.swap(true, Ordering::SeqCst) {
            self.collisions.fetch_add(1, Ordering::SeqCst);
        }

        let start = self.epoch.elapsed();
        if !self.write_delay.is_zero() {
            thread::sleep(self.write_delay);
        }
        let end = self.epoch.elapsed();

        self.writing.store(false, Ordering::SeqCst);

        self.spans.lock().push(WriteSpan {
            start,
            end,
            thread: thread::current().name().map(ToString::to_string),
            bytes: bytes.to_vec(),
        });
    }
}
