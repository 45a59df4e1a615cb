//! In-memory backlog, sink and clock for local development and testing.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod backlog;
mod clock;
mod sink;

pub use backlog::MemoryBacklog;
pub use clock::ManualClock;
pub use sink::{RecordingSink, WriteSpan};
