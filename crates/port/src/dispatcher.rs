//! Asynchronous drain of the engine backlog
//!
//! One dedicated thread sleeps on a coalescing [`WakeSignal`]. Each wake runs a
//! drain pass: pull into the scratch buffer, write the chunk under the output
//! lock, repeat until a pull comes back empty, then sleep again.
//!
//! Because wakes coalesce, a pass always drains to empty; a wake raised during
//! a pass leaves one pending wake behind, which buys exactly one more pass.

use crate::config::{PortConfig, PullMode};
use crate::error::{Error, Result};
use crate::lock::OutputLock;
use crate::signal::{WakeSignal, WakeWaiter, wake_signal};
use crate::sink::Sink;
use crate::source::{PendingRecordSource, pull_with};

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::thread::{self, Thread};

use tracing::{debug, info, trace, warn};

/// Where the dispatcher is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DispatcherState {
    /// Blocked on the wake signal
    Idle = 0,
    /// Pulling and writing
    Draining = 1,
}

impl DispatcherState {
    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Draining,
            _ => Self::Idle,
        }
    }
}

/// Counters describing dispatcher activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatcherStats {
    /// Drain passes run to completion
    pub passes: u64,
    /// Chunks written to the sink
    pub chunks: u64,
    /// Bytes written to the sink
    pub bytes: u64,
    /// Pulls that reported more bytes than the scratch buffer holds
    pub oversized: u64,
}

#[derive(Debug)]
struct Shared {
    state: AtomicU8,
    passes: AtomicU64,
    chunks: AtomicU64,
    bytes: AtomicU64,
    oversized: AtomicU64,
}

impl Shared {
    const fn new() -> Self {
        Self {
            state: AtomicU8::new(DispatcherState::Idle as u8),
            passes: AtomicU64::new(0),
            chunks: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
            oversized: AtomicU64::new(0),
        }
    }

    fn set_state(&self, state: DispatcherState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// Handle to the running dispatcher thread.
///
/// The thread runs for the lifetime of the process; dropping the handle does
/// not stop it.
#[derive(Debug)]
pub struct Dispatcher {
    signal: WakeSignal,
    shared: Arc<Shared>,
    thread: Thread,
}

impl Dispatcher {
    /// Spawn the dispatcher thread.
    pub(crate) fn spawn(
        config: &PortConfig,
        lock: Arc<OutputLock>,
        sink: Arc<dyn Sink>,
        source: Arc<dyn PendingRecordSource>,
    ) -> Result<Self> {
        let (signal, waiter) = wake_signal();
        let shared = Arc::new(Shared::new());

        let worker = Worker {
            waiter,
            lock,
            sink,
            source,
            scratch: vec![0; config.scratch_capacity].into_boxed_slice(),
            mode: config.pull_mode,
            shared: shared.clone(),
        };

        let handle = thread::Builder::new()
            .name(config.dispatcher_name.clone())
            .stack_size(config.dispatcher_stack_size)
            .spawn(move || worker.run())
            .map_err(|source| Error::SpawnDispatcher {
                name: config.dispatcher_name.clone(),
                source,
            })?;

        info!(
            name = %config.dispatcher_name,
            mode = ?config.pull_mode,
            scratch = config.scratch_capacity,
            "dispatcher started"
        );

        Ok(Self {
            signal,
            shared,
            thread: handle.thread().clone(),
        })
    }

    /// Request a drain pass. Never blocks.
    pub fn notify(&self) {
        self.signal.raise();
    }

    /// A clonable handle for raising wakes from other threads
    #[must_use]
    pub fn signal(&self) -> &WakeSignal {
        &self.signal
    }

    /// Current state of the dispatcher
    #[must_use]
    pub fn state(&self) -> DispatcherState {
        DispatcherState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    /// Snapshot of the activity counters
    #[must_use]
    pub fn stats(&self) -> DispatcherStats {
        DispatcherStats {
            passes: self.shared.passes.load(Ordering::Acquire),
            chunks: self.shared.chunks.load(Ordering::Relaxed),
            bytes: self.shared.bytes.load(Ordering::Relaxed),
            oversized: self.shared.oversized.load(Ordering::Relaxed),
        }
    }

    /// The dispatcher's thread
    #[must_use]
    pub const fn thread(&self) -> &Thread {
        &self.thread
    }
}

/// State owned by the dispatcher thread. The scratch buffer is never shared.
struct Worker {
    waiter: WakeWaiter,
    lock: Arc<OutputLock>,
    sink: Arc<dyn Sink>,
    source: Arc<dyn PendingRecordSource>,
    scratch: Box<[u8]>,
    mode: PullMode,
    shared: Arc<Shared>,
}

impl Worker {
    fn run(mut self) {
        loop {
            self.waiter.wait();
            self.shared.set_state(DispatcherState::Draining);
            self.drain_pass();
            self.shared.set_state(DispatcherState::Idle);
        }
    }

    fn drain_pass(&mut self) {
        let mut chunks = 0u64;
        let mut bytes = 0u64;

        loop {
            let pulled = pull_with(self.source.as_ref(), self.mode, &mut self.scratch);
            if pulled == 0 {
                break;
            }

            let len = if pulled > self.scratch.len() {
                warn!(
                    pulled,
                    capacity = self.scratch.len(),
                    "source reported more bytes than requested"
                );
                self.shared.oversized.fetch_add(1, Ordering::Relaxed);
                self.scratch.len()
            } else {
                pulled
            };

            {
                let _guard = self.lock.acquire();
                self.sink.write(&self.scratch[..len]);
            }

            trace!(len, "chunk written");
            chunks += 1;
            bytes += len as u64;
            self.shared.chunks.fetch_add(1, Ordering::Relaxed);
            self.shared.bytes.fetch_add(len as u64, Ordering::Relaxed);
        }

        let pass = self.shared.passes.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(pass, chunks, bytes, "drain pass complete");
    }
}
