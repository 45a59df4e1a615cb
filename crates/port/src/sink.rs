//! Physical output sinks

use std::fmt;
use std::io::{self, Write};

use parking_lot::Mutex;

/// The physical output device.
///
/// Writes are best-effort: a failed or partial write is dropped, never retried
/// and never reported. Implementations need not be reentrant; every caller
/// holds the output lock before writing.
pub trait Sink: Send + Sync + 'static {
    /// Write exactly `bytes` to the device
    fn write(&self, bytes: &[u8]);
}

/// Sink that writes to the process's standard output
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl Sink for StdoutSink {
    fn write(&self, bytes: &[u8]) {
        let mut stdout = io::stdout().lock();
        let _ = stdout.write_all(bytes);
        let _ = stdout.flush();
    }
}

/// Sink over any [`io::Write`] implementation
pub struct WriterSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send + 'static> WriterSink<W> {
    /// Wrap a writer
    pub const fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Unwrap the writer
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write + Send + 'static> Sink for WriterSink<W> {
    fn write(&self, bytes: &[u8]) {
        // uncontended whenever the output lock is held
        let mut writer = self.writer.lock();
        let _ = writer.write_all(bytes);
        let _ = writer.flush();
    }
}

impl<W> fmt::Debug for WriterSink<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriterSink").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Writer that accepts at most `limit` bytes, then fails.
    struct Failing {
        accepted: Vec<u8>,
        limit: usize,
    }

    impl Write for Failing {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let room = self.limit - self.accepted.len();
            if room == 0 {
                return Err(io::Error::other("device full"));
            }
            let n = buf.len().min(room);
            self.accepted.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_writer_sink_writes_all_bytes() {
        let sink = WriterSink::new(Vec::new());

        sink.write(b"hello ");
        sink.write(b"world\n");

        assert_eq!(sink.into_inner(), b"hello world\n");
    }

    #[test]
    fn test_failed_write_is_swallowed() {
        let sink = WriterSink::new(Failing {
            accepted: Vec::new(),
            limit: 4,
        });

        sink.write(b"abcdef");
        sink.write(b"gh");

        assert_eq!(sink.into_inner().accepted, b"abcd");
    }

    #[test]
    fn test_stdout_sink_does_not_panic() {
        StdoutSink.write(b"");
    }
}
