//! Process-wide registration of the output context
//!
//! Engines written against free functions (`port_output`,
//! `notify_async_output`, ...) reach the context through here. At most one
//! context is ever registered. Before registration output is dropped, the
//! lock is a standalone fallback and time comes from a fallback clock.
//!
//! A failed [`port_init`] leaves nothing registered, so every later write is
//! dropped. The first dropped write logs a warning and
//! [`dropped_output_count`] keeps the total.

use crate::config::DEFAULT_TICK_RATE_HZ;
use crate::context::{OutputContext, OutputContextBuilder};
use crate::env::{Clock, TaskName, TickClock, TimeString, process_name};
use crate::error::{Error, Result};
use crate::lock::{OutputGuard, OutputLock};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{LazyLock, OnceLock};

use parking_lot::Mutex;
use tracing::{info, warn};

static CONTEXT: OnceLock<OutputContext> = OnceLock::new();
static INIT: Mutex<()> = Mutex::new(());

static FALLBACK_LOCK: OutputLock = OutputLock::new();
static FALLBACK_CLOCK: LazyLock<TickClock> =
    LazyLock::new(|| TickClock::new(DEFAULT_TICK_RATE_HZ));
static DROPPED: AtomicU64 = AtomicU64::new(0);

/// Build and register the process-wide context.
///
/// # Errors
///
/// Returns [`Error::AlreadyInitialized`] if a context is already registered
/// (nothing is built in that case), or any error from
/// [`OutputContextBuilder::build`].
pub fn port_init(builder: OutputContextBuilder) -> Result<&'static OutputContext> {
    let _init = INIT.lock();

    if CONTEXT.get().is_some() {
        return Err(Error::AlreadyInitialized);
    }

    let context = builder.build()?;
    info!(
        async_output = context.config().async_output,
        "output port registered"
    );

    // INIT is held and the cell is empty, so this context is the one stored
    Ok(CONTEXT.get_or_init(|| context))
}

/// The registered context, if any
#[must_use]
pub fn context() -> Option<&'static OutputContext> {
    CONTEXT.get()
}

/// No-op; the registered context stays for the life of the process
pub fn port_deinit() {
    if let Some(context) = context() {
        context.deinit();
    }
}

/// Write to the sink without taking the lock. Dropped before registration.
pub fn port_output(bytes: &[u8]) {
    match context() {
        Some(context) => context.output(bytes),
        None => {
            if DROPPED.fetch_add(1, Ordering::Relaxed) == 0 {
                warn!(
                    len = bytes.len(),
                    "output dropped: no port registered"
                );
            }
        }
    }
}

/// Writes dropped because no context was registered
#[must_use]
pub fn dropped_output_count() -> u64 {
    DROPPED.load(Ordering::Relaxed)
}

/// Acquire the output lock.
///
/// Before registration this takes a standalone fallback lock. A guard taken
/// then does not exclude writers that use the registered context's lock
/// after [`port_init`] succeeds.
pub fn acquire_output_lock() -> OutputGuard<'static> {
    match context() {
        Some(context) => context.acquire_output_lock(),
        None => FALLBACK_LOCK.acquire(),
    }
}

/// Guard-less acquire, paired with [`release_output_lock`].
///
/// Takes the fallback lock before registration, with the same caveat as
/// [`acquire_output_lock`].
pub fn lock_output() {
    match context() {
        Some(context) => context.lock_output(),
        None => FALLBACK_LOCK.acquire_raw(),
    }
}

/// Release a lock taken with [`lock_output`].
///
/// # Safety
///
/// The lock must be held through [`lock_output`], and registration must not
/// have happened between the two calls.
pub unsafe fn release_output_lock() {
    match context() {
        // SAFETY: forwarded from the caller
        Some(context) => unsafe { context.unlock_output() },
        // SAFETY: forwarded from the caller
        None => unsafe { FALLBACK_LOCK.release_raw() },
    }
}

/// The current tick count as text
pub fn current_time_string() -> TimeString {
    match context() {
        Some(context) => context.current_time_string(),
        None => TimeString::from_ticks(FALLBACK_CLOCK.ticks()),
    }
}

/// Always empty
#[must_use]
pub const fn current_process_name() -> &'static str {
    process_name()
}

/// The calling thread's name, truncated to fit
#[must_use]
pub fn current_task_name() -> TaskName {
    TaskName::current()
}

/// Wake the dispatcher. Does nothing before registration.
///
/// # Panics
///
/// Panics if the registered context has async output disabled.
pub fn notify_async_output() {
    if let Some(context) = context() {
        context.notify_async_output();
    }
}
