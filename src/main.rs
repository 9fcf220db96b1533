//! iosink CLI entry point

use anyhow::{Context, Result};
use iosink::config::cli::Cli;
use iosink::config::{cli_convert, toml, validator};
use iosink::transfer::{Transfer, TransferReport};
use iosink::util::pattern::PatternReader;
use iosink::util::time::{format_duration, format_throughput, to_mib, MIB};
use std::fs::File;
use std::io::{self, Read};
use std::time::Duration;
use tracing::{debug, level_filters::LevelFilter};
use tracing_subscriber::{prelude::*, EnvFilter, Registry};

fn main() -> Result<()> {
    let cli = Cli::parse_args();
    init_logging(cli.debug)?;

    let config = toml::load_config(&cli)?;
    validator::validate_config(&config).context("Configuration validation failed")?;

    if cli.debug || cli.dry_run {
        println!("{}", config);
    }
    if cli.dry_run {
        println!();
        println!("Dry run mode - configuration validated successfully");
        return Ok(());
    }

    let (source, expected) = open_source(&cli)?;
    let report_config = config.report;
    let transfer = Transfer::new(config);
    let report = transfer.upload(source, expected)?;

    if report_config.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, report_config.stats);
    }

    Ok(())
}

/// Log to stderr so reports on stdout stay machine-readable
fn init_logging(debug: bool) -> Result<()> {
    let level = if debug { LevelFilter::DEBUG } else { LevelFilter::INFO };
    let registry = Registry::default().with(
        tracing_subscriber::fmt::layer()
            .with_writer(io::stderr)
            .with_filter(
                EnvFilter::builder()
                    .with_default_directive(level.into())
                    .from_env_lossy(),
            ),
    );
    tracing::subscriber::set_global_default(registry).context("Failed to set global default subscriber")
}

/// Pick the upload source and the length it announces
fn open_source(cli: &Cli) -> Result<(Box<dyn Read>, Option<u64>)> {
    let announced = cli
        .expected_size
        .as_deref()
        .map(cli_convert::parse_size)
        .transpose()
        .context("Invalid expected size")?;

    if let Some(ref size) = cli.generate {
        let len = cli_convert::parse_size(size).context("Invalid generate size")?;
        let pattern = cli_convert::convert_pattern(cli.pattern, cli.seed);
        debug!("Generating {} bytes of {:?}", len, pattern);
        return Ok((Box::new(PatternReader::new(pattern, len)), announced.or(Some(len))));
    }

    if cli.reads_stdin() {
        debug!("Reading upload from stdin");
        return Ok((Box::new(io::stdin().lock()), announced));
    }

    // reads_stdin() is false without --generate only when a path was given
    let path = cli.input.as_deref().context("No input given")?;
    let file = File::open(path).with_context(|| format!("Failed to open input: {}", path.display()))?;
    let len = file
        .metadata()
        .with_context(|| format!("Failed to stat input: {}", path.display()))?
        .len();
    Ok((Box::new(file), announced.or(Some(len))))
}

fn print_report(report: &TransferReport, timers: bool) {
    let elapsed = Duration::from_secs_f64(report.elapsed_seconds);
    println!();
    println!("Transfer complete");
    println!("  Bytes:      {} ({:.2} MiB)", report.bytes, to_mib(report.bytes));
    println!("  Elapsed:    {}", format_duration(elapsed));
    println!("  Throughput: {}", format_throughput(report.throughput_mib_s * MIB as f64));
    println!("  Blocks:     {}", report.copy.blocks);
    println!("  Synced:     {}", if report.synced { "yes" } else { "no" });

    if timers {
        println!();
        println!("Timers:");
        for timer in &report.timers {
            println!("  {:<6} {}", timer.name, format_duration(timer.total));
        }
    }
}
