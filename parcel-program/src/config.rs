//! Configuration for the marketplace

use crate::{error::ParcelError, fees::BASIS_POINTS, state::MAX_DESCRIPTION_LEN, Result};
use serde::{Deserialize, Serialize};

/// Marketplace service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Ledger the program runs on
    pub ledger: parcel_ledger::Config,

    /// Program rules
    pub marketplace: MarketplaceConfig,
}

/// Program rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketplaceConfig {
    /// Fee applied when `initialize` is called without one (basis points)
    pub default_fee_rate: u16,

    /// Lowest reputation allowed to accept a delivery
    pub min_accept_reputation: u32,

    /// Highest reputation a new carrier may start with
    pub max_initial_reputation: u32,

    /// Longest package description accepted (capped by the record size)
    pub max_description_len: usize,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            default_fee_rate: 200, // 2%
            min_accept_reputation: 50,
            max_initial_reputation: 100,
            max_description_len: MAX_DESCRIPTION_LEN,
        }
    }
}

impl MarketplaceConfig {
    /// Reject settings the program cannot honor
    pub fn validate(&self) -> Result<()> {
        if self.default_fee_rate > BASIS_POINTS {
            return Err(ParcelError::InvalidFeeRate);
        }
        if self.max_description_len > MAX_DESCRIPTION_LEN {
            return Err(config_error(format!(
                "max_description_len {} exceeds record budget of {}",
                self.max_description_len, MAX_DESCRIPTION_LEN
            )));
        }
        Ok(())
    }
}

fn config_error(message: String) -> ParcelError {
    ParcelError::Ledger(parcel_ledger::Error::Config(message))
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ParcelError::Ledger(parcel_ledger::Error::Io(e)))?;
        Self::from_toml(&content)
    }

    /// Parse from a TOML document
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| config_error(format!("Failed to parse config: {}", e)))?;
        config.marketplace.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Config {
            ledger: parcel_ledger::Config::from_env()?,
            marketplace: MarketplaceConfig::default(),
        };

        if let Ok(rate) = std::env::var("PARCEL_FEE_RATE") {
            config.marketplace.default_fee_rate = rate
                .parse()
                .map_err(|_| config_error(format!("Invalid fee rate: {}", rate)))?;
        }

        if let Ok(reputation) = std::env::var("PARCEL_MIN_ACCEPT_REPUTATION") {
            config.marketplace.min_accept_reputation = reputation.parse().map_err(|_| {
                config_error(format!("Invalid minimum reputation: {}", reputation))
            })?;
        }

        config.marketplace.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.marketplace.default_fee_rate, 200);
        assert_eq!(config.marketplace.min_accept_reputation, 50);
        assert_eq!(config.marketplace.max_initial_reputation, 100);
        assert!(config.marketplace.validate().is_ok());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
            [ledger]
            data_dir = "/tmp/parcel"
            service_name = "parcel-ledger"
            service_version = "0.1.0"
            storage = "memory"
            mailbox_capacity = 8

            [ledger.rent]
            lamports_per_byte = 6960
            account_overhead_bytes = 128

            [ledger.rocksdb]
            write_buffer_size_mb = 64
            max_write_buffer_number = 4
            max_background_jobs = 4
            enable_statistics = false

            [marketplace]
            default_fee_rate = 150
            min_accept_reputation = 10
            max_initial_reputation = 100
            max_description_len = 64
            "#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.marketplace.default_fee_rate, 150);
        assert_eq!(config.marketplace.max_description_len, 64);
        assert_eq!(config.ledger.mailbox_capacity, 8);
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let config = MarketplaceConfig {
            default_fee_rate: 10_001,
            ..MarketplaceConfig::default()
        };
        assert!(matches!(config.validate(), Err(ParcelError::InvalidFeeRate)));

        let config = MarketplaceConfig {
            max_description_len: MAX_DESCRIPTION_LEN + 1,
            ..MarketplaceConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ParcelError::Ledger(parcel_ledger::Error::Config(_)))
        ));
    }
}
