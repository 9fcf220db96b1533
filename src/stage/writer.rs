//! Metered sink

use super::{pacing_delay, write_full, Metering};
use crate::util::clock::{Clock, WRITE};
use std::io::{self, ErrorKind, Write};
use std::sync::Arc;
use tracing::{debug, warn};

/// Sink wrapper that writes whole buffers and optionally times and paces them
///
/// Each `write` call hands the entire buffer to the sink, looping over partial
/// writes. A count below the buffer length means the sink stopped accepting
/// bytes. A sink error is returned at once, even after partial progress; the
/// bytes accepted before it still count towards `bytes_written`.
pub struct MeteredWriter<W> {
    inner: W,
    clock: Arc<Clock>,
    metering: Metering,
    bytes: u64,
    last_error: Option<ErrorKind>,
}

impl<W: Write> MeteredWriter<W> {
    pub fn new(inner: W, clock: Arc<Clock>, metering: Metering) -> Self {
        Self {
            inner,
            clock,
            metering,
            bytes: 0,
            last_error: None,
        }
    }

    /// Bytes accepted by the sink so far
    pub fn bytes_written(&self) -> u64 {
        self.bytes
    }

    /// Kind of the last error the sink reported
    pub fn last_error(&self) -> Option<ErrorKind> {
        self.last_error
    }

    pub fn metering(&self) -> Metering {
        self.metering
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for MeteredWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        if self.metering.measure {
            self.clock.start(WRITE);
        }
        let (n, err) = write_full(&mut self.inner, buf);
        if self.metering.measure {
            if let Some(rate) = self.metering.ceiling() {
                if let Some(delay) = pacing_delay(n, self.clock.elapsed(WRITE), rate) {
                    std::thread::sleep(delay);
                }
            }
            let elapsed = self.clock.stop(WRITE);
            debug!("Wrote {} bytes in {:.6} seconds", n, elapsed.as_secs_f64());
        }

        self.bytes += n as u64;
        if let Some(e) = err {
            self.last_error = Some(e.kind());
            if n > 0 {
                warn!("Sink failed after {} of {} bytes: {}", n, buf.len(), e);
            }
            return Err(e);
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::testutil::FaultyWriter;
    use std::time::{Duration, Instant};

    #[test]
    fn test_counts_bytes() {
        let clock = Arc::new(Clock::new());
        let mut writer = MeteredWriter::new(Vec::new(), clock.clone(), Metering::measured());

        assert_eq!(writer.write(b"hello").unwrap(), 5);
        assert_eq!(writer.write(b" world").unwrap(), 6);
        writer.flush().unwrap();

        assert_eq!(writer.bytes_written(), 11);
        assert!(clock.total(WRITE).is_some());
        assert_eq!(writer.into_inner(), b"hello world");
    }

    #[test]
    fn test_short_sink_reported_as_count() {
        let sink = FaultyWriter {
            short_on: Some((1, 3)),
            ..Default::default()
        };
        let mut writer = MeteredWriter::new(sink, Arc::new(Clock::new()), Metering::off());

        // The wrapper keeps writing the remainder after a short write
        assert_eq!(writer.write(&[1u8; 8]).unwrap(), 8);
        assert_eq!(writer.get_ref().calls, 2);
        assert_eq!(writer.get_ref().data.len(), 8);
    }

    #[test]
    fn test_failure_surfaces() {
        let sink = FaultyWriter {
            fail_on: Some(1),
            ..Default::default()
        };
        let mut writer = MeteredWriter::new(sink, Arc::new(Clock::new()), Metering::measured());

        let err = writer.write(&[0u8; 4]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
        assert_eq!(writer.last_error(), Some(ErrorKind::Other));
        assert_eq!(writer.bytes_written(), 0);
    }

    #[test]
    fn test_failure_after_partial_surfaces_at_once() {
        let sink = FaultyWriter {
            short_on: Some((1, 2)),
            fail_on: Some(2),
            ..Default::default()
        };
        let mut writer = MeteredWriter::new(sink, Arc::new(Clock::new()), Metering::off());

        let err = writer.write(&[0u8; 4]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
        assert_eq!(writer.bytes_written(), 2);
        assert_eq!(writer.get_ref().calls, 2);
    }

    #[test]
    fn test_rate_limit_paces_writes() {
        // 4 x 32 KiB at 2 MiB/s is at least 62.5ms
        let mut writer = MeteredWriter::new(
            std::io::sink(),
            Arc::new(Clock::new()),
            Metering::limited(2 << 20),
        );

        let block = vec![0u8; 32 * 1024];
        let start = Instant::now();
        for _ in 0..4 {
            assert_eq!(writer.write(&block).unwrap(), block.len());
        }
        assert!(start.elapsed() >= Duration::from_micros(62_500));
        assert_eq!(writer.bytes_written(), 128 * 1024);
    }

    #[test]
    fn test_no_limit_no_delay() {
        let mut writer = MeteredWriter::new(
            std::io::sink(),
            Arc::new(Clock::new()),
            Metering::measured(),
        );
        let block = vec![0u8; 1 << 20];
        let start = Instant::now();
        for _ in 0..16 {
            writer.write(&block).unwrap();
        }
        assert!(start.elapsed() < Duration::from_secs(2));
    }
}
