//! Environment queries: tick time and task identity
//!
//! Results are small fixed-capacity values returned by copy. Nothing here
//! allocates, and no buffer is shared between callers, so a value read on one
//! thread cannot be overwritten by a query on another.

use std::fmt;
use std::time::Instant;

/// Bytes available for a time string, terminator included.
pub const TIME_STRING_CAPACITY: usize = 16;

/// Bytes available for a task name, terminator included.
pub const TASK_NAME_CAPACITY: usize = 16;

/// Prefix of every time string.
pub const TIME_PREFIX: &str = "tick:";

/// Inline string of at most `N - 1` bytes followed by a NUL terminator.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct FixedStr<const N: usize> {
    buf: [u8; N],
    len: usize,
}

impl<const N: usize> FixedStr<N> {
    const fn new() -> Self {
        Self {
            buf: [0; N],
            len: 0,
        }
    }

    /// Append as much of `s` as fits, cutting on a character boundary.
    fn push_str(&mut self, s: &str) {
        let room = N - 1 - self.len;
        let mut take = s.len().min(room);
        while !s.is_char_boundary(take) {
            take -= 1;
        }
        self.buf[self.len..self.len + take].copy_from_slice(&s.as_bytes()[..take]);
        self.len += take;
    }

    fn as_str(&self) -> &str {
        // only whole characters are ever copied in
        std::str::from_utf8(&self.buf[..self.len]).unwrap_or_default()
    }

    fn as_bytes_with_nul(&self) -> &[u8] {
        &self.buf[..=self.len]
    }
}

impl<const N: usize> fmt::Write for FixedStr<N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push_str(s);
        Ok(())
    }
}

/// Textual tick timestamp, `tick:` followed by ten zero-padded digits.
///
/// A 32-bit tick count never exceeds ten digits, so every value is exactly 15
/// visible characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeString(FixedStr<TIME_STRING_CAPACITY>);

impl TimeString {
    /// Format a tick count
    #[must_use]
    pub fn from_ticks(ticks: u32) -> Self {
        use fmt::Write as _;

        let mut inner = FixedStr::new();
        let _ = write!(inner, "{TIME_PREFIX}{ticks:010}");
        Self(inner)
    }

    /// The timestamp text
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// The timestamp bytes including the trailing NUL
    #[must_use]
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        self.0.as_bytes_with_nul()
    }
}

impl AsRef<str> for TimeString {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for TimeString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for TimeString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TimeString").field(&self.as_str()).finish()
    }
}

/// Name of a task, truncated to `TASK_NAME_CAPACITY - 1` bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskName(FixedStr<TASK_NAME_CAPACITY>);

impl TaskName {
    /// Copy `name`, truncating on a character boundary if it is too long
    #[must_use]
    pub fn new(name: &str) -> Self {
        let mut inner = FixedStr::new();
        inner.push_str(name);
        Self(inner)
    }

    /// Name of the calling thread; empty for unnamed threads
    #[must_use]
    pub fn current() -> Self {
        Self::new(std::thread::current().name().unwrap_or_default())
    }

    /// The (possibly truncated) name
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// The name bytes including the trailing NUL
    #[must_use]
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        self.0.as_bytes_with_nul()
    }
}

impl AsRef<str> for TaskName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TaskName").field(&self.as_str()).finish()
    }
}

/// The process name. There is no process distinct from the running image.
#[must_use]
pub const fn process_name() -> &'static str {
    ""
}

/// Source of the scheduler tick count
pub trait Clock: Send + Sync + 'static {
    /// Current tick count; wraps at `u32::MAX`
    fn ticks(&self) -> u32;
}

/// Tick counter derived from a monotonic clock
#[derive(Debug, Clone, Copy)]
pub struct TickClock {
    origin: Instant,
    tick_rate_hz: u32,
}

impl TickClock {
    /// Start counting from zero now
    #[must_use]
    pub fn new(tick_rate_hz: u32) -> Self {
        Self {
            origin: Instant::now(),
            tick_rate_hz: tick_rate_hz.max(1),
        }
    }
}

impl Clock for TickClock {
    #[allow(clippy::cast_possible_truncation)]
    fn ticks(&self) -> u32 {
        let elapsed = self.origin.elapsed().as_nanos();
        let ticks = elapsed * u128::from(self.tick_rate_hz) / 1_000_000_000;
        // wrap like a hardware tick counter
        (ticks & u128::from(u32::MAX)) as u32
    }
}
