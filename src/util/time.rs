//! Throughput and duration formatting for transfer reports

use std::time::Duration;

/// Bytes in a kibibyte
pub const KIB: u64 = 1 << 10;
/// Bytes in a mebibyte
pub const MIB: u64 = 1 << 20;

/// Convert a byte count to MiB
///
/// # Examples
///
/// ```
/// use iosink::util::time::to_mib;
///
/// assert_eq!(to_mib(3 * 1024 * 1024), 3.0);
/// assert_eq!(to_mib(512 * 1024), 0.5);
/// ```
pub fn to_mib(bytes: u64) -> f64 {
    bytes as f64 / MIB as f64
}

/// Calculate throughput from bytes transferred and duration
///
/// Returns bytes per second, or 0 for a zero duration.
pub fn calculate_throughput(bytes: u64, duration: Duration) -> f64 {
    let seconds = duration.as_secs_f64();
    if seconds > 0.0 {
        bytes as f64 / seconds
    } else {
        0.0
    }
}

/// Format a duration in human-readable form
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use iosink::util::time::format_duration;
///
/// assert_eq!(format_duration(Duration::from_nanos(500)), "500ns");
/// assert_eq!(format_duration(Duration::from_nanos(1500)), "1.50us");
/// assert_eq!(format_duration(Duration::from_micros(2500)), "2.50ms");
/// assert_eq!(format_duration(Duration::from_secs(5)), "5.00s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let nanos = duration.as_nanos();

    if nanos < 1_000 {
        format!("{}ns", nanos)
    } else if nanos < 1_000_000 {
        format!("{:.2}us", nanos as f64 / 1_000.0)
    } else if nanos < 1_000_000_000 {
        format!("{:.2}ms", nanos as f64 / 1_000_000.0)
    } else {
        format!("{:.2}s", nanos as f64 / 1_000_000_000.0)
    }
}

/// Format throughput in human-readable form (B/s, KB/s, MB/s, GB/s)
///
/// # Examples
///
/// ```
/// use iosink::util::time::format_throughput;
///
/// assert_eq!(format_throughput(500.0), "500.00 B/s");
/// assert_eq!(format_throughput(1536.0), "1.50 KB/s");
/// assert_eq!(format_throughput(2_621_440.0), "2.50 MB/s");
/// ```
pub fn format_throughput(bytes_per_sec: f64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    if bytes_per_sec >= GB {
        format!("{:.2} GB/s", bytes_per_sec / GB)
    } else if bytes_per_sec >= MB {
        format!("{:.2} MB/s", bytes_per_sec / MB)
    } else if bytes_per_sec >= KB {
        format!("{:.2} KB/s", bytes_per_sec / KB)
    } else {
        format!("{:.2} B/s", bytes_per_sec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_throughput() {
        let duration = Duration::from_secs(10);
        let throughput = calculate_throughput(10 * MIB, duration);
        assert_eq!(throughput, MIB as f64);
    }

    #[test]
    fn test_calculate_throughput_zero_duration() {
        assert_eq!(calculate_throughput(MIB, Duration::ZERO), 0.0);
    }

    #[test]
    fn test_format_throughput() {
        assert_eq!(format_throughput(1536.0 * 1024.0), "1.50 MB/s");
        assert_eq!(format_throughput(1536.0 * 1024.0 * 1024.0), "1.50 GB/s");
    }

    #[test]
    fn test_to_mib() {
        assert_eq!(to_mib(0), 0.0);
        assert_eq!(to_mib(10 * MIB), 10.0);
        assert_eq!(KIB * 1024, MIB);
    }
}
