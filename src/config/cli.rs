//! CLI argument parsing using clap

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Payload pattern for generated uploads
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PatternKind {
    /// Seeded pseudo-random bytes
    Random,
    /// All zeros
    Zeros,
    /// All ones (0xFF)
    Ones,
    /// 0x00, 0x01, ..., 0xFF, 0x00, ...
    Sequential,
}

/// iosink - stream an upload into storage and measure the write throughput
#[derive(Parser, Debug)]
#[command(name = "iosink")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Upload source file ("-" or omitted reads stdin)
    #[arg(value_name = "INPUT", conflicts_with = "generate")]
    pub input: Option<PathBuf>,

    /// Generate a payload of this size instead of reading INPUT (e.g., 10M, 1G)
    #[arg(long, value_name = "SIZE")]
    pub generate: Option<String>,

    /// Pattern of the generated payload
    #[arg(long, value_enum, default_value = "random")]
    pub pattern: PatternKind,

    /// Seed for the random pattern
    #[arg(long, default_value = "0")]
    pub seed: u64,

    /// Announced upload length (defaults to the input file or generated size)
    #[arg(long, value_name = "SIZE")]
    pub expected_size: Option<String>,

    /// Accept uploads whose length is unknown or differs from the announced one
    #[arg(long)]
    pub no_strict_length: bool,

    /// TOML configuration file (CLI flags take precedence)
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    // === Pipeline Options ===
    /// Block size for copying data to storage (e.g., 4k, 1M) [default: 1M]
    #[arg(short = 'b', long)]
    pub block_size: Option<String>,

    /// Number of buffers circulating between reader and writer [default: 2]
    #[arg(short = 'p', long)]
    pub pool_size: Option<usize>,

    /// Buffer alignment in bytes [default: 512]
    #[arg(long)]
    pub alignment: Option<usize>,

    // === Rate Options ===
    /// Limit read rate in megabytes per second
    #[arg(long, env = "IOSINK_LIMIT_READ_MBPS")]
    pub limit_read_mbps: Option<u64>,

    /// Limit write rate in megabytes per second
    #[arg(long, env = "IOSINK_LIMIT_WRITE_MBPS")]
    pub limit_write_mbps: Option<u64>,

    // === Output Options ===
    /// Output file name; if not set output goes to /dev/null
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Drop data in-process instead of writing to a file
    #[arg(long, conflicts_with = "output")]
    pub discard: bool,

    /// Use direct IO (O_DIRECT)
    #[arg(long)]
    pub direct: bool,

    /// Create the output file if it does not exist
    #[arg(long)]
    pub create: bool,

    /// Truncate the output file before writing
    #[arg(long)]
    pub truncate: bool,

    // === Reporting Options ===
    /// Show upload stats
    #[arg(long)]
    pub stats: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Print the transfer report as JSON
    #[arg(long)]
    pub json: bool,

    /// Validate and print the configuration without transferring
    #[arg(long)]
    pub dry_run: bool,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Whether the upload comes from stdin
    pub fn reads_stdin(&self) -> bool {
        self.generate.is_none()
            && self
                .input
                .as_ref()
                .map_or(true, |p| p.as_os_str() == "-")
    }
}
