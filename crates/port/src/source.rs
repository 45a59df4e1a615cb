//! Pull interface onto the logging engine's backlog

use crate::config::PullMode;

/// The engine's queue of formatted records awaiting output.
///
/// The port neither owns nor sizes this storage; it only polls it from the
/// dispatcher thread. Both capabilities remove what they return and signal
/// an empty backlog by returning 0.
pub trait PendingRecordSource: Send + Sync + 'static {
    /// Move up to `buf.len()` pending bytes into `buf`; returns how many
    fn pull(&self, buf: &mut [u8]) -> usize;

    /// Line-oriented variant of [`PendingRecordSource::pull`].
    ///
    /// Sources without line framing fall back to plain pulls.
    fn pull_line(&self, buf: &mut [u8]) -> usize {
        self.pull(buf)
    }
}

/// Pull with the capability selected by `mode`.
pub(crate) fn pull_with(source: &dyn PendingRecordSource, mode: PullMode, buf: &mut [u8]) -> usize {
    match mode {
        PullMode::Chunk => source.pull(buf),
        PullMode::Line => source.pull_line(buf),
    }
}
