//! Configuration validation
//!
//! The pipeline panics on zero-sized pools or blocks and misaligned
//! geometry, since those are programming errors at that layer. User input
//! goes through here first and gets a readable error instead.

use super::*;
use anyhow::Result;

/// Largest number of buffers a pool may hold
pub const MAX_POOL_SIZE: usize = 1024;

/// Largest accepted rate limit in MiB/s
pub const MAX_RATE_MBPS: u64 = 1 << 30;

/// Validate complete configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_copy(&config.copy, config.output.direct)?;
    validate_rate(&config.rate)?;
    validate_output(&config.output)?;

    Ok(())
}

/// Validate pipeline geometry
pub fn validate_copy(copy: &CopyConfig, direct: bool) -> Result<()> {
    if copy.block_size == 0 {
        anyhow::bail!("block_size must be greater than 0");
    }

    if copy.pool_size == 0 || copy.pool_size > MAX_POOL_SIZE {
        anyhow::bail!(
            "pool_size must be between 1 and {}, got {}",
            MAX_POOL_SIZE,
            copy.pool_size
        );
    }

    if !copy.alignment.is_power_of_two() {
        anyhow::bail!("alignment must be a power of 2, got {}", copy.alignment);
    }

    // O_DIRECT transfers must be a multiple of the logical block size
    if direct && copy.block_size % copy.alignment != 0 {
        anyhow::bail!(
            "block_size ({}) must be a multiple of alignment ({}) with direct IO",
            copy.block_size,
            copy.alignment
        );
    }

    if copy
        .block_size
        .checked_add(copy.alignment)
        .and_then(|b| b.checked_mul(copy.pool_size))
        .is_none()
    {
        anyhow::bail!(
            "pool of {} x {} byte buffers does not fit in memory",
            copy.pool_size,
            copy.block_size
        );
    }

    Ok(())
}

/// Validate rate limits
pub fn validate_rate(rate: &RateConfig) -> Result<()> {
    for (name, limit) in [("read", rate.read_mbps), ("write", rate.write_mbps)] {
        if let Some(mbps) = limit {
            if mbps == 0 || mbps > MAX_RATE_MBPS {
                anyhow::bail!(
                    "limit_{}_mbps must be between 1 and {}, got {}",
                    name,
                    MAX_RATE_MBPS,
                    mbps
                );
            }
        }
    }

    Ok(())
}

/// Validate output settings
pub fn validate_output(output: &OutputConfig) -> Result<()> {
    if output.discard {
        if output.direct {
            anyhow::bail!("direct IO has no effect when discarding output");
        }
        return Ok(());
    }

    if output.path.as_os_str().is_empty() {
        anyhow::bail!("output path must not be empty");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_block_size() {
        let mut config = Config::default();
        config.copy.block_size = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_pool_size_bounds() {
        let mut config = Config::default();
        config.copy.pool_size = 0;
        assert!(validate_config(&config).is_err());
        config.copy.pool_size = MAX_POOL_SIZE + 1;
        assert!(validate_config(&config).is_err());
        config.copy.pool_size = 1;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_alignment_power_of_two() {
        let mut config = Config::default();
        config.copy.alignment = 500;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("power of 2"));
    }

    #[test]
    fn test_direct_requires_aligned_blocks() {
        let mut config = Config::default();
        config.copy.block_size = 1000;
        assert!(validate_config(&config).is_ok());

        config.output.direct = true;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("multiple of alignment"));
    }

    #[test]
    fn test_rate_limits() {
        let mut config = Config::default();
        config.rate.read_mbps = Some(0);
        assert!(validate_config(&config).is_err());
        config.rate.read_mbps = Some(100);
        config.rate.write_mbps = Some(MAX_RATE_MBPS + 1);
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("limit_write_mbps"));
    }

    #[test]
    fn test_output_rules() {
        let mut config = Config::default();
        config.output.path = PathBuf::new();
        assert!(validate_config(&config).is_err());

        config.output.discard = true;
        assert!(validate_config(&config).is_ok());

        config.output.direct = true;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_oversized_pool() {
        let mut config = Config::default();
        config.copy.block_size = usize::MAX - 10;
        assert!(validate_config(&config).is_err());
    }
}
