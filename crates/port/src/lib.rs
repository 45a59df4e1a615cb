//! Platform binding that moves formatted log records onto an output sink.
//!
//! The logging engine owns formatting, buffering and filtering. This crate
//! supplies the rest of a port:
//!
//! - an output lock serializing every write to the [`Sink`]
//! - a dispatcher thread that drains the engine's backlog through
//!   [`PendingRecordSource`] whenever a coalescing wake is raised
//! - tick time and task-name queries returning fixed-capacity values
//!
//! ```text
//! producer ──append──▶ engine backlog ◀──pull── dispatcher ──lock+write──▶ sink
//!     └──────── notify_async_output() ───────────────▲
//! sync caller ─────────────────────────────lock+write──▶ sink
//! ```
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod config;
mod context;
mod dispatcher;
mod env;
mod error;
pub mod global;
mod lock;
mod signal;
mod sink;
mod source;

pub use config::{
    DEFAULT_DISPATCHER_NAME, DEFAULT_DISPATCHER_STACK_SIZE, DEFAULT_SCRATCH_CAPACITY,
    DEFAULT_TICK_RATE_HZ, MAX_SCRATCH_CAPACITY, PortConfig, PortConfigBuilder, PullMode,
};
pub use context::{OutputContext, OutputContextBuilder};
pub use dispatcher::{Dispatcher, DispatcherState, DispatcherStats};
pub use env::{
    Clock, TASK_NAME_CAPACITY, TIME_PREFIX, TIME_STRING_CAPACITY, TaskName, TickClock,
    TimeString, process_name,
};
pub use error::{Error, Result};
pub use lock::{OutputGuard, OutputLock};
pub use signal::{WakeSignal, WakeWaiter, wake_signal};
pub use sink::{Sink, StdoutSink, WriterSink};
pub use source::PendingRecordSource;
