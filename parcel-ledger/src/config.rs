//! Configuration for the ledger

use crate::rent::Rent;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory for RocksDB
    pub data_dir: PathBuf,

    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Which account store to open
    pub storage: StorageBackend,

    /// Actor mailbox capacity (bounded for backpressure)
    pub mailbox_capacity: usize,

    /// Reserve schedule for records
    pub rent: Rent,

    /// RocksDB configuration
    pub rocksdb: RocksDBConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/parcel-ledger"),
            service_name: "parcel-ledger".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            storage: StorageBackend::Memory,
            mailbox_capacity: 1000,
            rent: Rent::default(),
            rocksdb: RocksDBConfig::default(),
        }
    }
}

/// Account store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local, lost on exit
    Memory,
    /// Persistent, requires the `rocksdb` feature
    RocksDb,
}

impl StorageBackend {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Some(StorageBackend::Memory),
            "rocksdb" => Some(StorageBackend::RocksDb),
            _ => None,
        }
    }
}

/// RocksDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RocksDBConfig {
    /// Write buffer size (MB)
    pub write_buffer_size_mb: usize,

    /// Max write buffers
    pub max_write_buffer_number: i32,

    /// Max background jobs (compaction + flush)
    pub max_background_jobs: i32,

    /// Enable statistics
    pub enable_statistics: bool,
}

impl Default for RocksDBConfig {
    fn default() -> Self {
        Self {
            write_buffer_size_mb: 64,
            max_write_buffer_number: 4,
            max_background_jobs: 4,
            enable_statistics: false,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse from a TOML document
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        toml::from_str(content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(data_dir) = std::env::var("PARCEL_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(backend) = std::env::var("PARCEL_STORAGE_BACKEND") {
            config.storage = StorageBackend::parse(&backend).ok_or_else(|| {
                crate::Error::Config(format!("Unknown storage backend: {}", backend))
            })?;
        }

        if let Ok(capacity) = std::env::var("PARCEL_MAILBOX_CAPACITY") {
            config.mailbox_capacity = capacity.parse().map_err(|_| {
                crate::Error::Config(format!("Invalid mailbox capacity: {}", capacity))
            })?;
        }

        Ok(config)
    }
}
