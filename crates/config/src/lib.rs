//! # Config
//!
//! Runtime settings for the block store, read from environment variables with
//! defaults for anything unset or unparsable.
//!
//! ```text
//! CHAIN_DATA_PATH      block file path               (default: "blockchain.bin")
//! CHAIN_BUFFER_BLOCKS  blocks staged per batch write (default: 16)
//! CHAIN_HASH_BITS      nonce table size exponent     (default: 14, range 1..=24)
//! CHAIN_REPLAY_BATCH   blocks read per replay call   (default: 1024)
//! CHAIN_SYNC           fsync after every batch write (default: "false")
//! CHAIN_LOG            log level filter              (default: "info")
//! ```

use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

pub const DEFAULT_DATA_PATH: &str = "blockchain.bin";
pub const DEFAULT_BUFFER_BLOCKS: usize = 16;
pub const DEFAULT_HASH_BITS: u32 = 14;
pub const DEFAULT_REPLAY_BATCH: usize = 1024;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Hash bits accepted by [`StoreConfig::validate`].
pub const HASH_BITS_RANGE: std::ops::RangeInclusive<u32> = 1..=24;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Rejected configuration values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("buffer capacity must be at least 1 block")]
    ZeroBufferCapacity,

    #[error("replay batch must be at least 1 block")]
    ZeroReplayBatch,

    #[error("hash bits {0} out of range 1..=24")]
    HashBits(u32),

    #[error("unknown log level {0:?}")]
    LogLevel(String),
}

/// Settings for opening a block store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub path: PathBuf,
    pub buffer_capacity: usize,
    pub hash_bits: u32,
    pub replay_batch: usize,
    pub sync: bool,
    pub log_level: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DATA_PATH),
            buffer_capacity: DEFAULT_BUFFER_BLOCKS,
            hash_bits: DEFAULT_HASH_BITS,
            replay_batch: DEFAULT_REPLAY_BATCH,
            sync: false,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl StoreConfig {
    /// Defaults with a different block file path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Reads every setting from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads every setting through `lookup`, which maps a variable name to its
    /// value. Missing or unparsable values fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        Self {
            path: lookup("CHAIN_DATA_PATH").map(PathBuf::from).unwrap_or(d.path),
            buffer_capacity: parse_or(&lookup, "CHAIN_BUFFER_BLOCKS", d.buffer_capacity),
            hash_bits: parse_or(&lookup, "CHAIN_HASH_BITS", d.hash_bits),
            replay_batch: parse_or(&lookup, "CHAIN_REPLAY_BATCH", d.replay_batch),
            sync: parse_or(&lookup, "CHAIN_SYNC", d.sync),
            log_level: lookup("CHAIN_LOG")
                .map(|s| s.trim().to_ascii_lowercase())
                .unwrap_or(d.log_level),
        }
    }

    /// Checks ranges that the store cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_capacity == 0 {
            return Err(ConfigError::ZeroBufferCapacity);
        }
        if self.replay_batch == 0 {
            return Err(ConfigError::ZeroReplayBatch);
        }
        if !HASH_BITS_RANGE.contains(&self.hash_bits) {
            return Err(ConfigError::HashBits(self.hash_bits));
        }
        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(ConfigError::LogLevel(self.log_level.clone()));
        }
        Ok(())
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
