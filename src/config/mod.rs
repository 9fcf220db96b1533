//! Configuration module
//!
//! Handles CLI argument parsing, TOML configuration files, and validation.
//! Everything that shapes a transfer lives in `Config`; nothing is read from
//! process-wide state, so independent transfers can run side by side with
//! different settings.

pub mod cli;
pub mod cli_convert;
pub mod toml;
pub mod validator;

use crate::pipeline::CopyConfig;
use crate::stage::Metering;
use crate::target::OpenFlags;
use crate::util::time::MIB;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Complete transfer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Block geometry of the copy pipeline
    pub copy: CopyConfig,
    /// Where the upload lands
    pub output: OutputConfig,
    /// Throughput ceilings
    pub rate: RateConfig,
    /// Instrumentation and reporting
    pub report: ReportConfig,
    /// Reject transfers whose byte count differs from the announced length,
    /// and transfers that announce no length at all
    pub strict_length: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            copy: CopyConfig::default(),
            output: OutputConfig::default(),
            rate: RateConfig::default(),
            report: ReportConfig::default(),
            strict_length: true,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output file or device
    pub path: PathBuf,
    /// Drop data in-process instead of opening `path`
    pub discard: bool,
    /// Use direct IO (O_DIRECT)
    pub direct: bool,
    /// Create the output if missing
    pub create: bool,
    /// Truncate the output on open
    pub truncate: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/dev/null"),
            discard: false,
            direct: false,
            create: false,
            truncate: false,
        }
    }
}

/// Rate limits in MiB/s
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateConfig {
    /// Limit read rate in MiB per second
    pub read_mbps: Option<u64>,
    /// Limit write rate in MiB per second
    pub write_mbps: Option<u64>,
}

impl RateConfig {
    /// Read ceiling in bytes/sec
    pub fn read_limit(&self) -> Option<u64> {
        self.read_mbps.map(|mbps| mbps * MIB)
    }

    /// Write ceiling in bytes/sec
    pub fn write_limit(&self) -> Option<u64> {
        self.write_mbps.map(|mbps| mbps * MIB)
    }
}

/// Reporting configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Show per-phase timings after each transfer
    pub stats: bool,
    /// Log every read and write
    pub debug: bool,
    /// Print the transfer report as JSON
    pub json: bool,
}

impl Config {
    /// Instrumentation for the read stage
    ///
    /// Reads are timed when stats or debug output is wanted, or when a read
    /// ceiling needs the timings to pace against.
    pub fn read_metering(&self) -> Metering {
        Metering {
            measure: self.report.stats || self.report.debug || self.rate.read_mbps.is_some(),
            limit: self.rate.read_limit(),
        }
    }

    /// Instrumentation for the write stage
    pub fn write_metering(&self) -> Metering {
        Metering {
            measure: self.report.stats || self.report.debug || self.rate.write_mbps.is_some(),
            limit: self.rate.write_limit(),
        }
    }

    /// Flags for opening the output
    pub fn open_flags(&self) -> OpenFlags {
        OpenFlags {
            direct: self.output.direct,
            create: self.output.create,
            truncate: self.output.truncate,
        }
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Using block_size={}", self.copy.block_size)?;
        writeln!(f, "Using pool_size={}", self.copy.pool_size)?;
        writeln!(f, "Using alignment={}", self.copy.alignment)?;
        writeln!(f, "Using limit_read_mbps={}", display_limit(self.rate.read_mbps))?;
        writeln!(f, "Using limit_write_mbps={}", display_limit(self.rate.write_mbps))?;
        writeln!(f, "Using direct={}", self.output.direct)?;
        if self.output.discard {
            writeln!(f, "Using output=<discard>")?;
        } else {
            writeln!(f, "Using output={}", self.output.path.display())?;
        }
        writeln!(f, "Using strict_length={}", self.strict_length)?;
        writeln!(f, "Using stats={}", self.report.stats)?;
        write!(f, "Using debug={}", self.report.debug)
    }
}

fn display_limit(limit: Option<u64>) -> String {
    limit.map_or_else(|| "unlimited".to_string(), |v| v.to_string())
}
