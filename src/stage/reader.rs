//! Metered source

use super::{pacing_delay, read_full, Fill, Metering};
use crate::util::clock::{Clock, READ};
use std::io::{self, ErrorKind, Read};
use std::sync::Arc;
use tracing::debug;

/// Source wrapper that fills whole buffers and optionally times and paces them
///
/// Each `read` call is one full transfer attempt: the buffer is filled
/// completely unless the source ends first. A failure after partial progress
/// returns the bytes read and reports the error on the next call.
pub struct MeteredReader<R> {
    inner: R,
    clock: Arc<Clock>,
    metering: Metering,
    bytes: u64,
    last_error: Option<ErrorKind>,
    pending: Option<io::Error>,
    exhausted: bool,
}

impl<R: Read> MeteredReader<R> {
    pub fn new(inner: R, clock: Arc<Clock>, metering: Metering) -> Self {
        Self {
            inner,
            clock,
            metering,
            bytes: 0,
            last_error: None,
            pending: None,
            exhausted: false,
        }
    }

    /// Bytes read so far
    pub fn bytes_read(&self) -> u64 {
        self.bytes
    }

    /// Kind of the last error the source reported
    pub fn last_error(&self) -> Option<ErrorKind> {
        self.last_error
    }

    pub fn metering(&self) -> Metering {
        self.metering
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for MeteredReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(e) = self.pending.take() {
            return Err(e);
        }
        if self.exhausted || buf.is_empty() {
            return Ok(0);
        }

        if self.metering.measure {
            self.clock.start(READ);
        }
        let (n, end) = read_full(&mut self.inner, buf);
        if self.metering.measure {
            if let Some(rate) = self.metering.ceiling() {
                if let Some(delay) = pacing_delay(n, self.clock.elapsed(READ), rate) {
                    std::thread::sleep(delay);
                }
            }
            let elapsed = self.clock.stop(READ);
            debug!("Read {} bytes in {:.6} seconds", n, elapsed.as_secs_f64());
        }

        self.bytes += n as u64;
        match end {
            Fill::Full => {}
            Fill::Eof => self.exhausted = true,
            Fill::Failed(e) => {
                self.last_error = Some(e.kind());
                if n == 0 {
                    return Err(e);
                }
                self.pending = Some(e);
            }
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::testutil::ScriptedReader;
    use crate::util::pattern::{FillPattern, PatternReader};
    use std::time::{Duration, Instant};

    #[test]
    fn test_fills_whole_buffer() {
        let src = ScriptedReader::new(vec![Ok(vec![1; 3]), Ok(vec![2; 3]), Ok(vec![3; 3])]);
        let mut reader = MeteredReader::new(src, Arc::new(Clock::new()), Metering::off());

        let mut buf = [0u8; 8];
        assert_eq!(reader.read(&mut buf).unwrap(), 8);
        assert_eq!(buf, [1, 1, 1, 2, 2, 2, 3, 3]);
        assert_eq!(reader.read(&mut buf).unwrap(), 1);
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
        assert_eq!(reader.bytes_read(), 9);
    }

    #[test]
    fn test_exhausted_source_not_read_again() {
        let src = ScriptedReader::new(vec![Ok(vec![7; 4])]);
        let clock = Arc::new(Clock::new());
        let mut reader = MeteredReader::new(src, clock.clone(), Metering::measured());

        let mut buf = [0u8; 8];
        assert_eq!(reader.read(&mut buf).unwrap(), 4);
        let calls = reader.get_ref().calls;
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
        assert_eq!(reader.get_ref().calls, calls);
        assert!(!clock.is_running(READ));
    }

    #[test]
    fn test_unmeasured_leaves_clock_alone() {
        let clock = Arc::new(Clock::new());
        let mut reader = MeteredReader::new(
            PatternReader::new(FillPattern::Zeros, 100),
            clock.clone(),
            Metering::off(),
        );
        let mut buf = [0u8; 64];
        reader.read(&mut buf).unwrap();
        assert!(clock.snapshot().is_empty());
    }

    #[test]
    fn test_measured_records_read_timer() {
        let clock = Arc::new(Clock::new());
        let mut reader = MeteredReader::new(
            PatternReader::new(FillPattern::Zeros, 100),
            clock.clone(),
            Metering::measured(),
        );
        let mut buf = [0u8; 64];
        reader.read(&mut buf).unwrap();
        reader.read(&mut buf).unwrap();
        assert!(clock.total(READ).is_some());
        assert!(!clock.is_running(READ));
    }

    #[test]
    fn test_error_after_partial_read_is_deferred() {
        let src = ScriptedReader::new(vec![
            Ok(vec![5; 3]),
            Err(io::Error::new(ErrorKind::ConnectionReset, "reset")),
        ]);
        let mut reader = MeteredReader::new(src, Arc::new(Clock::new()), Metering::off());

        let mut buf = [0u8; 8];
        assert_eq!(reader.read(&mut buf).unwrap(), 3);
        assert_eq!(reader.last_error(), Some(ErrorKind::ConnectionReset));
        let err = reader.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectionReset);
    }

    #[test]
    fn test_rate_limit_paces_reads() {
        // 64 KiB at 1 MiB/s is at least 62.5ms
        let clock = Arc::new(Clock::new());
        let mut reader = MeteredReader::new(
            PatternReader::new(FillPattern::Zeros, 64 * 1024),
            clock.clone(),
            Metering::limited(1 << 20),
        );

        let start = Instant::now();
        let mut buf = vec![0u8; 16 * 1024];
        let mut total = 0;
        loop {
            let n = reader.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            total += n;
        }
        let elapsed = start.elapsed();

        assert_eq!(total, 64 * 1024);
        assert!(elapsed >= Duration::from_micros(62_500), "{:?}", elapsed);
        assert!(clock.total(READ).unwrap() >= Duration::from_micros(62_500));
    }

    #[test]
    fn test_limit_ignored_without_measure() {
        let metering = Metering {
            measure: false,
            limit: Some(1024),
        };
        let mut reader = MeteredReader::new(
            PatternReader::new(FillPattern::Zeros, 64 * 1024),
            Arc::new(Clock::new()),
            metering,
        );

        // At 1 KiB/s this would take a minute if paced
        let start = Instant::now();
        let mut buf = vec![0u8; 64 * 1024];
        assert_eq!(reader.read(&mut buf).unwrap(), 64 * 1024);
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
