//! CLI to Config conversion utilities

use crate::config::cli;
use crate::util::pattern::FillPattern;
use anyhow::{Context, Result};

/// Parse a size string (e.g., "1G", "100M", "4k") to bytes
pub fn parse_size(s: &str) -> Result<u64> {
    let s = s.trim().to_lowercase();

    let (num_str, multiplier) = if s.ends_with('k') || s.ends_with("kb") {
        (s.trim_end_matches("kb").trim_end_matches('k'), 1024u64)
    } else if s.ends_with('m') || s.ends_with("mb") {
        (s.trim_end_matches("mb").trim_end_matches('m'), 1024 * 1024)
    } else if s.ends_with('g') || s.ends_with("gb") {
        (s.trim_end_matches("gb").trim_end_matches('g'), 1024 * 1024 * 1024)
    } else if s.ends_with('t') || s.ends_with("tb") {
        (s.trim_end_matches("tb").trim_end_matches('t'), 1024 * 1024 * 1024 * 1024)
    } else {
        (s.trim_end_matches('b'), 1)
    };

    let num: u64 = num_str
        .trim()
        .parse()
        .with_context(|| format!("Invalid size format: {}", s))?;

    num.checked_mul(multiplier)
        .with_context(|| format!("Size too large: {}", s))
}

/// Parse a size string that must fit in memory-sized quantities
pub fn parse_block_size(s: &str) -> Result<usize> {
    let bytes = parse_size(s)?;
    usize::try_from(bytes).with_context(|| format!("Block size too large: {}", s))
}

/// Convert CLI PatternKind to a FillPattern
pub fn convert_pattern(kind: cli::PatternKind, seed: u64) -> FillPattern {
    match kind {
        cli::PatternKind::Random => FillPattern::Random(seed),
        cli::PatternKind::Zeros => FillPattern::Zeros,
        cli::PatternKind::Ones => FillPattern::Ones,
        cli::PatternKind::Sequential => FillPattern::Sequential,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("512").unwrap(), 512);
        assert_eq!(parse_size("512b").unwrap(), 512);
        assert_eq!(parse_size("4k").unwrap(), 4096);
        assert_eq!(parse_size("4KB").unwrap(), 4096);
        assert_eq!(parse_size("1M").unwrap(), 1 << 20);
        assert_eq!(parse_size(" 10m ").unwrap(), 10 << 20);
        assert_eq!(parse_size("2g").unwrap(), 2 << 30);
        assert_eq!(parse_size("1t").unwrap(), 1 << 40);
    }

    #[test]
    fn test_parse_size_invalid() {
        assert!(parse_size("").is_err());
        assert!(parse_size("abc").is_err());
        assert!(parse_size("1.5M").is_err());
        assert!(parse_size("99999999999t").is_err());
    }

    #[test]
    fn test_parse_block_size() {
        assert_eq!(parse_block_size("64k").unwrap(), 65536);
    }

    #[test]
    fn test_convert_pattern() {
        assert_eq!(convert_pattern(cli::PatternKind::Random, 9), FillPattern::Random(9));
        assert_eq!(convert_pattern(cli::PatternKind::Ones, 9), FillPattern::Ones);
    }
}
