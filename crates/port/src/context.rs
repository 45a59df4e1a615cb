//! The output context: everything the port owns, bundled in one value

use crate::config::PortConfig;
use crate::dispatcher::{Dispatcher, DispatcherState, DispatcherStats};
use crate::env::{Clock, TaskName, TickClock, TimeString, process_name};
use crate::error::{Error, Result};
use crate::lock::{OutputGuard, OutputLock};
use crate::signal::WakeSignal;
use crate::sink::Sink;
use crate::source::PendingRecordSource;

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

/// Port state shared by the synchronous write path and the dispatcher.
///
/// Building one is port initialization: the output lock is created and, with
/// async output enabled, the dispatcher thread is spawned.
pub struct OutputContext {
    config: PortConfig,
    lock: Arc<OutputLock>,
    sink: Arc<dyn Sink>,
    clock: Arc<dyn Clock>,
    dispatcher: Option<Dispatcher>,
}

impl OutputContext {
    /// Start building a context that writes to `sink`
    pub fn builder(sink: Arc<dyn Sink>) -> OutputContextBuilder {
        OutputContextBuilder {
            config: PortConfig::default(),
            sink,
            source: None,
            clock: None,
        }
    }

    /// Tear down the port. There is nothing to release; the dispatcher keeps
    /// running for the lifetime of the process.
    pub fn deinit(&self) {
        debug!("output port deinit");
    }

    /// Write straight to the sink on the calling thread.
    ///
    /// Does not take the output lock. Callers that share the sink with the
    /// dispatcher or other threads hold [`OutputContext::acquire_output_lock`]
    /// around this call.
    pub fn output(&self, bytes: &[u8]) {
        self.sink.write(bytes);
    }

    /// Take the output lock, write, release
    pub fn output_locked(&self, bytes: &[u8]) {
        let _guard = self.lock.acquire();
        self.sink.write(bytes);
    }

    /// Block until the sink is owned exclusively; released when the guard drops
    pub fn acquire_output_lock(&self) -> OutputGuard<'_> {
        self.lock.acquire()
    }

    /// Guard-less lock for engines that pair explicit lock and unlock calls
    pub fn lock_output(&self) {
        self.lock.acquire_raw();
    }

    /// Release a lock taken with [`OutputContext::lock_output`].
    ///
    /// # Safety
    ///
    /// The calling code must hold the lock through `lock_output`. Releasing a
    /// lock that is not held is undefined behavior.
    pub unsafe fn unlock_output(&self) {
        // SAFETY: forwarded from the caller
        unsafe { self.lock.release_raw() };
    }

    /// The current tick count as text
    pub fn current_time_string(&self) -> TimeString {
        TimeString::from_ticks(self.clock.ticks())
    }

    /// Always empty
    #[must_use]
    pub const fn current_process_name(&self) -> &'static str {
        process_name()
    }

    /// The calling thread's name, truncated to fit
    #[must_use]
    pub fn current_task_name(&self) -> TaskName {
        TaskName::current()
    }

    /// Ask the dispatcher for a drain pass. Never blocks.
    ///
    /// # Panics
    ///
    /// Panics if the context was built with async output disabled.
    pub fn notify_async_output(&self) {
        match &self.dispatcher {
            Some(dispatcher) => dispatcher.notify(),
            None => panic!("notify_async_output called with async output disabled"),
        }
    }

    /// Wake handle for producers, if async output is enabled
    #[must_use]
    pub fn wake_signal(&self) -> Option<WakeSignal> {
        self.dispatcher.as_ref().map(|d| d.signal().clone())
    }

    /// The dispatcher, if async output is enabled
    #[must_use]
    pub const fn dispatcher(&self) -> Option<&Dispatcher> {
        self.dispatcher.as_ref()
    }

    /// Dispatcher state, if async output is enabled
    #[must_use]
    pub fn dispatcher_state(&self) -> Option<DispatcherState> {
        self.dispatcher.as_ref().map(Dispatcher::state)
    }

    /// Dispatcher counters, if async output is enabled
    #[must_use]
    pub fn dispatcher_stats(&self) -> Option<DispatcherStats> {
        self.dispatcher.as_ref().map(Dispatcher::stats)
    }

    /// The configuration the context was built with
    #[must_use]
    pub const fn config(&self) -> &PortConfig {
        &self.config
    }
}

impl fmt::Debug for OutputContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputContext")
            .field("config", &self.config)
            .field("lock", &self.lock)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

/// Builder for [`OutputContext`]
pub struct OutputContextBuilder {
    config: PortConfig,
    sink: Arc<dyn Sink>,
    source: Option<Arc<dyn PendingRecordSource>>,
    clock: Option<Arc<dyn Clock>>,
}

impl OutputContextBuilder {
    /// Use `config` instead of the defaults
    #[must_use]
    pub fn config(mut self, config: PortConfig) -> Self {
        self.config = config;
        self
    }

    /// The engine backlog the dispatcher drains
    #[must_use]
    pub fn source(mut self, source: Arc<dyn PendingRecordSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Tick source for time strings; defaults to a [`TickClock`]
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Initialize the port.
    ///
    /// # Errors
    ///
    /// Fails on invalid configuration, on a missing source while async output
    /// is enabled, or when the dispatcher thread cannot be spawned. None of
    /// these leave anything running; callers treat them as fatal.
    pub fn build(self) -> Result<OutputContext> {
        self.config.validate()?;

        let lock = Arc::new(OutputLock::new());

        let dispatcher = if self.config.async_output {
            let source = self.source.ok_or(Error::MissingSource)?;
            Some(Dispatcher::spawn(
                &self.config,
                lock.clone(),
                self.sink.clone(),
                source,
            )?)
        } else {
            if self.source.is_some() {
                warn!("record source ignored: async output is disabled");
            }
            None
        };

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(TickClock::new(self.config.tick_rate_hz)));

        debug!(async_output = self.config.async_output, "output port initialized");

        Ok(OutputContext {
            config: self.config,
            lock,
            sink: self.sink,
            clock,
            dispatcher,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_matches::assert_matches;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Collect(Mutex<Vec<u8>>);

    impl Sink for Collect {
        fn write(&self, bytes: &[u8]) {
            self.0.lock().extend_from_slice(bytes);
        }
    }

    struct Empty;

    impl PendingRecordSource for Empty {
        fn pull(&self, _buf: &mut [u8]) -> usize {
            0
        }
    }

    struct Fixed(u32);

    impl Clock for Fixed {
        fn ticks(&self) -> u32 {
            self.0
        }
    }

    fn sync_config() -> PortConfig {
        PortConfig::builder().async_output(false).build()
    }

    #[test]
    fn test_async_requires_source() {
        let result = OutputContext::builder(Arc::new(Collect::default())).build();
        assert_matches!(result, Err(Error::MissingSource));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = OutputContext::builder(Arc::new(Collect::default()))
            .config(PortConfig::builder().scratch_capacity(0).build())
            .source(Arc::new(Empty))
            .build();
        assert_matches!(result, Err(Error::Configuration(_)));
    }

    #[test]
    fn test_unspawnable_dispatcher_config_is_an_error() {
        let nul_name = OutputContext::builder(Arc::new(Collect::default()))
            .config(PortConfig::builder().dispatcher_name("elog\0async").build())
            .source(Arc::new(Empty))
            .build();
        assert_matches!(nul_name, Err(Error::Configuration(_)));

        let huge_scratch = OutputContext::builder(Arc::new(Collect::default()))
            .config(PortConfig::builder().scratch_capacity(usize::MAX).build())
            .source(Arc::new(Empty))
            .build();
        assert_matches!(huge_scratch, Err(Error::Configuration(_)));
    }

    #[test]
    fn test_sync_only_has_no_dispatcher() {
        let ctx = OutputContext::builder(Arc::new(Collect::default()))
            .config(sync_config())
            .build()
            .unwrap();

        assert!(ctx.dispatcher().is_none());
        assert!(ctx.wake_signal().is_none());
        assert_eq!(ctx.dispatcher_state(), None);
    }

    #[test]
    #[should_panic(expected = "async output disabled")]
    fn test_notify_without_async_is_fatal() {
        let ctx = OutputContext::builder(Arc::new(Collect::default()))
            .config(sync_config())
            .build()
            .unwrap();

        ctx.notify_async_output();
    }

    #[test]
    fn test_output_paths() {
        let sink = Arc::new(Collect::default());
        let ctx = OutputContext::builder(sink.clone())
            .config(sync_config())
            .build()
            .unwrap();

        ctx.output(b"direct ");
        ctx.output_locked(b"locked ");
        {
            let _guard = ctx.acquire_output_lock();
            ctx.output(b"guarded ");
        }
        ctx.lock_output();
        ctx.output(b"raw");
        // SAFETY: locked on the line above
        unsafe { ctx.unlock_output() };

        assert_eq!(sink.0.lock().as_slice(), b"direct locked guarded raw");
    }

    #[test]
    fn test_queries() {
        let ctx = OutputContext::builder(Arc::new(Collect::default()))
            .config(sync_config())
            .clock(Arc::new(Fixed(1234)))
            .build()
            .unwrap();

        assert_eq!(ctx.current_time_string().as_str(), "tick:0000001234");
        assert_eq!(ctx.current_process_name(), "");

        let name = std::thread::Builder::new()
            .name("worker".to_string())
            .spawn(move || ctx.current_task_name())
            .unwrap()
            .join()
            .unwrap();
        assert_eq!(name.as_str(), "worker");
    }

    #[test]
    fn test_deinit_is_harmless() {
        let ctx = OutputContext::builder(Arc::new(Collect::default()))
            .config(sync_config())
            .build()
            .unwrap();

        ctx.deinit();
        ctx.output_locked(b"still works");
    }
}
