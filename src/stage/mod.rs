//! Instrumented source and sink wrappers
//!
//! `MeteredReader` and `MeteredWriter` sit between the pipeline and the raw
//! source/sink. With measurement on, every operation is timed on the shared
//! `Clock` under `"read"` / `"write"`, and an optional throughput ceiling is
//! enforced by sleeping after the operation and before its timer stops, so
//! the recorded time is the paced time.
//!
//! Measurement is off by default: the clock's mutex and the timestamps are
//! not free, and the unmeasured path must stay a plain read or write.

pub mod reader;
pub mod writer;

pub use reader::MeteredReader;
pub use writer::MeteredWriter;

use serde::{Deserialize, Serialize};
use std::io::{self, ErrorKind, Read, Write};
use std::time::Duration;

/// Per-stage instrumentation settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metering {
    /// Time each operation on the shared clock
    #[serde(default)]
    pub measure: bool,
    /// Throughput ceiling in bytes/sec; only applied while measuring
    #[serde(default)]
    pub limit: Option<u64>,
}

impl Metering {
    /// No timing, no pacing
    pub fn off() -> Self {
        Self::default()
    }

    /// Timing without a ceiling
    pub fn measured() -> Self {
        Self {
            measure: true,
            limit: None,
        }
    }

    /// Timing plus a ceiling of `bytes_per_sec`
    pub fn limited(bytes_per_sec: u64) -> Self {
        Self {
            measure: true,
            limit: Some(bytes_per_sec),
        }
    }

    /// Ceiling to enforce, if any
    #[inline]
    pub(crate) fn ceiling(&self) -> Option<u64> {
        if self.measure {
            self.limit.filter(|&rate| rate > 0)
        } else {
            None
        }
    }
}

/// How long to sleep so that moving `n` bytes took at least `n / rate` seconds
///
/// Returns `None` when the operation was already slower than the target pace.
pub fn pacing_delay(n: usize, elapsed: Duration, rate: u64) -> Option<Duration> {
    if rate == 0 {
        return None;
    }
    let expected = Duration::from_secs_f64(n as f64 / rate as f64);
    expected.checked_sub(elapsed).filter(|d| !d.is_zero())
}

/// How a full read ended
#[derive(Debug)]
pub(crate) enum Fill {
    /// The buffer is full
    Full,
    /// The source has nothing more to give
    Eof,
    /// The source failed; bytes read before the failure are still valid
    Failed(io::Error),
}

/// Read until `buf` is full, the source ends, or it fails
///
/// `UnexpectedEof` from the source is an ordinary end of stream here.
pub(crate) fn read_full<R: Read + ?Sized>(src: &mut R, buf: &mut [u8]) -> (usize, Fill) {
    let mut filled = 0;
    while filled < buf.len() {
        match src.read(&mut buf[filled..]) {
            Ok(0) => return (filled, Fill::Eof),
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => return (filled, Fill::Eof),
            Err(e) => return (filled, Fill::Failed(e)),
        }
    }
    (filled, Fill::Full)
}

/// Write all of `buf` unless the sink stops accepting bytes or fails
pub(crate) fn write_full<W: Write + ?Sized>(dst: &mut W, buf: &[u8]) -> (usize, Option<io::Error>) {
    let mut written = 0;
    while written < buf.len() {
        match dst.write(&buf[written..]) {
            Ok(0) => break,
            Ok(n) => written += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return (written, Some(e)),
        }
    }
    (written, None)
}

#[cfg(test)]
pub(crate) mod testutil {
    //! Sources and sinks with scripted behavior

    use std::collections::VecDeque;
    use std::io::{self, Read, Write};

    /// Source returning a scripted sequence of read results
    pub struct ScriptedReader {
        pub steps: VecDeque<io::Result<Vec<u8>>>,
        pub calls: usize,
    }

    impl ScriptedReader {
        pub fn new(steps: Vec<io::Result<Vec<u8>>>) -> Self {
            Self {
                steps: steps.into(),
                calls: 0,
            }
        }
    }

    impl Read for ScriptedReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.calls += 1;
            match self.steps.pop_front() {
                None => Ok(0),
                Some(Err(e)) => Err(e),
                Some(Ok(mut data)) => {
                    let n = data.len().min(buf.len());
                    buf[..n].copy_from_slice(&data[..n]);
                    if n < data.len() {
                        self.steps.push_front(Ok(data.split_off(n)));
                    }
                    Ok(n)
                }
            }
        }
    }

    /// Sink that can fail or accept short writes on a given call
    #[derive(Default)]
    pub struct FaultyWriter {
        pub data: Vec<u8>,
        pub calls: usize,
        /// 1-based call that returns an error
        pub fail_on: Option<usize>,
        /// 1-based call that accepts only this many bytes
        pub short_on: Option<(usize, usize)>,
        /// Largest single write seen
        pub max_write: usize,
        pub min_write: Option<usize>,
    }

    impl Write for FaultyWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.calls += 1;
            self.max_write = self.max_write.max(buf.len());
            self.min_write = Some(self.min_write.map_or(buf.len(), |m| m.min(buf.len())));
            if self.fail_on == Some(self.calls) {
                return Err(io::Error::new(io::ErrorKind::Other, "injected write failure"));
            }
            let n = match self.short_on {
                Some((call, accept)) if call == self.calls => accept.min(buf.len()),
                _ => buf.len(),
            };
            self.data.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}
