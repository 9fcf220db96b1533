//! TOML configuration file parsing

use super::cli_convert::parse_block_size;
use super::*;
use crate::config::cli::Cli;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<Config> {
    let config: Config = ::toml::from_str(contents).context("Failed to parse TOML configuration")?;

    Ok(config)
}

/// Merge CLI arguments with TOML configuration (CLI takes precedence)
pub fn merge_cli_with_config(cli: &Cli, mut config: Config) -> Result<Config> {
    // Pipeline geometry
    if let Some(ref block_size) = cli.block_size {
        config.copy.block_size = parse_block_size(block_size).context("Invalid block size")?;
    }
    if let Some(pool_size) = cli.pool_size {
        config.copy.pool_size = pool_size;
    }
    if let Some(alignment) = cli.alignment {
        config.copy.alignment = alignment;
    }

    // Rate limits
    if cli.limit_read_mbps.is_some() {
        config.rate.read_mbps = cli.limit_read_mbps;
    }
    if cli.limit_write_mbps.is_some() {
        config.rate.write_mbps = cli.limit_write_mbps;
    }

    // Output
    if let Some(ref output) = cli.output {
        config.output.path = output.clone();
        config.output.discard = false;
    }
    config.output.discard |= cli.discard;
    config.output.direct |= cli.direct;
    config.output.create |= cli.create;
    config.output.truncate |= cli.truncate;

    // Reporting
    config.report.stats |= cli.stats;
    config.report.debug |= cli.debug;
    config.report.json |= cli.json;

    if cli.no_strict_length {
        config.strict_length = false;
    }

    Ok(config)
}

/// Build the configuration for a CLI invocation
///
/// Starts from the TOML file if one was given, otherwise from defaults.
pub fn load_config(cli: &Cli) -> Result<Config> {
    let base = match cli.config {
        Some(ref path) => parse_toml_file(path)?,
        None => Config::default(),
    };
    merge_cli_with_config(cli, base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn test_parse_empty_toml() {
        let config = parse_toml_string("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_parse_toml_sections() {
        let config = parse_toml_string(
            r#"
            strict_length = false

            [copy]
            block_size = 65536
            pool_size = 4

            [output]
            path = "/tmp/upload.dat"
            direct = true

            [rate]
            write_mbps = 200

            [report]
            stats = true
            "#,
        )
        .unwrap();

        assert_eq!(config.copy.block_size, 65536);
        assert_eq!(config.copy.pool_size, 4);
        assert_eq!(config.copy.alignment, 512);
        assert_eq!(config.output.path, PathBuf::from("/tmp/upload.dat"));
        assert!(config.output.direct);
        assert_eq!(config.rate.write_mbps, Some(200));
        assert_eq!(config.rate.read_mbps, None);
        assert!(config.report.stats);
        assert!(!config.strict_length);
    }

    #[test]
    fn test_parse_toml_rejects_garbage() {
        assert!(parse_toml_string("[copy]\nblock_size = \"big\"").is_err());
    }

    #[test]
    fn test_cli_overrides_toml() {
        let base = parse_toml_string("[copy]\nblock_size = 4096\npool_size = 8\n").unwrap();
        let cli = Cli::try_parse_from(["iosink", "-b", "1M", "--limit-read-mbps", "50", "--debug"]).unwrap();

        let config = merge_cli_with_config(&cli, base).unwrap();
        assert_eq!(config.copy.block_size, 1 << 20);
        assert_eq!(config.copy.pool_size, 8);
        assert_eq!(config.rate.read_mbps, Some(50));
        assert!(config.report.debug);
    }

    #[test]
    fn test_cli_invalid_block_size() {
        let cli = Cli::try_parse_from(["iosink", "-b", "lots"]).unwrap();
        assert!(merge_cli_with_config(&cli, Config::default()).is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("iosink.toml");
        std::fs::write(&path, "[output]\ndiscard = true\n").unwrap();

        let cli = Cli::try_parse_from(["iosink", "-c", path.to_str().unwrap()]).unwrap();
        let config = load_config(&cli).unwrap();
        assert!(config.output.discard);
    }

    #[test]
    fn test_load_config_missing_file() {
        let cli = Cli::try_parse_from(["iosink", "-c", "/nonexistent/iosink.toml"]).unwrap();
        let err = load_config(&cli).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
