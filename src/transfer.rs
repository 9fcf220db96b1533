//! Transfer session
//!
//! One transfer is one upload: open the output, copy the payload through the
//! pipeline with metered stages, sync and close the output, and report how
//! long each phase took. All timers live on a `Clock` created for the
//! transfer:
//!
//! - `total`: the whole upload, owned by [`Transfer::upload`]
//! - `copy`: the pipeline
//! - `read` / `write`: individual stage operations, when measured
//! - `sync`: flushing the output to stable storage

use crate::config::Config;
use crate::pipeline::{CopyStats, Pipeline};
use crate::stage::{MeteredReader, MeteredWriter};
use crate::target::{DiscardTarget, FileTarget, SyncOutcome, Target};
use crate::util::clock::{Clock, TimerSnapshot, COPY, SYNC, TOTAL};
use crate::util::time::{calculate_throughput, to_mib, MIB};
use crate::Result;
use anyhow::Context;
use serde::Serialize;
use std::io::Read;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Outcome of a transfer's copy and sync phases
#[derive(Debug)]
pub struct Written {
    /// Bytes accepted by the output
    pub bytes: u64,
    pub copy: CopyStats,
    pub sync: SyncOutcome,
}

/// What a finished upload reports
#[derive(Debug, Clone, Serialize)]
pub struct TransferReport {
    /// Bytes accepted by the output
    pub bytes: u64,
    /// Announced length, if any
    pub expected: Option<u64>,
    /// Wall time of the whole upload
    pub elapsed_seconds: f64,
    /// Upload rate over the whole upload
    pub throughput_mib_s: f64,
    /// Whether the output reached stable storage
    pub synced: bool,
    /// Per-phase pipeline figures
    pub copy: CopyStats,
    /// All timers in first-use order
    pub timers: Vec<TimerSnapshot>,
}

/// Runs uploads with a fixed configuration
#[derive(Debug, Clone)]
pub struct Transfer {
    config: Config,
    pipeline: Pipeline,
}

impl Transfer {
    pub fn new(config: Config) -> Self {
        let pipeline = Pipeline::new(config.copy);
        Self { config, pipeline }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Open the configured output
    pub fn open_target(&self) -> Result<Box<dyn Target>> {
        if self.config.output.discard {
            return Ok(Box::new(DiscardTarget::new()));
        }
        let target = FileTarget::open(&self.config.output.path, self.config.open_flags())?;
        Ok(Box::new(target))
    }

    /// Copy `src` to the output, then sync and close it
    ///
    /// Records `copy` and `sync` on `clock`, plus `read` / `write` when the
    /// stages are measured. Timers are stopped whether or not the phase
    /// succeeds. With `strict_length`, a byte count that differs from
    /// `expected` is an error.
    pub fn run<R: Read>(&self, src: R, expected: Option<u64>, clock: &Arc<Clock>) -> Result<Written> {
        let mut target = self.open_target()?;
        let name = target.describe();

        let mut reader = MeteredReader::new(src, clock.clone(), self.config.read_metering());
        let mut writer = MeteredWriter::new(target.as_mut(), clock.clone(), self.config.write_metering());

        clock.start(COPY);
        let copied = self.pipeline.copy(&mut writer, &mut reader);
        clock.stop(COPY);
        drop(writer);
        let copy = copied.with_context(|| format!("Copy to {} failed", name))?;

        let bytes = copy.written;
        if let Some(expected) = expected {
            if self.config.strict_length && bytes != expected {
                anyhow::bail!(
                    "Incomplete write, copied {} bytes, expected {} bytes",
                    bytes,
                    expected
                );
            }
        }

        clock.start(SYNC);
        let synced = target.sync();
        let elapsed = clock.stop(SYNC);
        let sync = synced?;
        match sync {
            SyncOutcome::Synced => debug!("Synced in {:.6} seconds", elapsed.as_secs_f64()),
            SyncOutcome::Unsupported => debug!("Sync not supported by {}, skipped", name),
        }

        target.close()?;

        Ok(Written { bytes, copy, sync })
    }

    /// Run one upload of `src`, announced as `expected` bytes long
    ///
    /// This is the request-level entry point: it owns the `total` timer and
    /// logs START / FINISH / ERROR events. With `strict_length`, an upload
    /// without an announced length is rejected before anything is opened.
    pub fn upload<R: Read>(&self, src: R, expected: Option<u64>) -> Result<TransferReport> {
        match expected {
            Some(len) => info!("START ({:.2} MiB)", to_mib(len)),
            None => info!("START (unknown length)"),
        }

        if expected.is_none() && self.config.strict_length {
            error!("ERROR Content-Length required");
            anyhow::bail!("Content-Length required");
        }

        let clock = Arc::new(Clock::new());
        clock.start(TOTAL);

        let result = self.run(src, expected, &clock);
        let elapsed = clock.stop(TOTAL);
        let written = match result {
            Ok(written) => written,
            Err(e) => {
                error!("ERROR {:#} ({:.2} seconds)", e, elapsed.as_secs_f64());
                if self.config.report.stats {
                    info!("Stats: {}", clock);
                }
                return Err(e);
            }
        };

        if self.config.report.stats {
            info!("Stats: {}", clock);
        }

        let throughput = calculate_throughput(written.bytes, elapsed);
        info!(
            "FINISH ({:.2} MiB in {:.2} seconds, {:.2} MiB/s)",
            to_mib(written.bytes),
            elapsed.as_secs_f64(),
            throughput / MIB as f64
        );

        Ok(TransferReport {
            bytes: written.bytes,
            expected,
            elapsed_seconds: elapsed.as_secs_f64(),
            throughput_mib_s: throughput / MIB as f64,
            synced: written.sync == SyncOutcome::Synced,
            copy: written.copy,
            timers: clock.snapshot(),
        })
    }
}
