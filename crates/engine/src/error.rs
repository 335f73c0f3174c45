//! Store-level errors and payload anomalies.
//!
//! Errors returned from a [`BlockStore`](crate::BlockStore) operation are
//! fatal for that operation. Payload anomalies are not errors: they are logged
//! and recorded while the block is stored anyway.
use blocklog::LogError;
use config::ConfigError;
use nonce_index::IndexError;
use std::collections::TryReserveError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Requested id is outside `1..=total`.
    #[error("block {id} not found (store holds {total} blocks)")]
    NotFound { id: u32, total: u32 },

    /// Reading or writing the block file failed.
    #[error("storage failure: {0}")]
    Io(#[source] LogError),

    /// An index or cache could not grow.
    #[error("out of memory: {0}")]
    Allocation(#[from] TryReserveError),

    /// The store already holds `u32::MAX` blocks.
    #[error("sequence number overflow (u32::MAX blocks reached)")]
    SequenceOverflow,

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl StoreError {
    /// Whether the store may hold state that disagrees with the file.
    ///
    /// After a fatal error every later write fails; callers should stop.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, StoreError::Io(_) | StoreError::Allocation(_))
    }
}

impl From<LogError> for StoreError {
    fn from(e: LogError) -> Self {
        match e {
            LogError::NotFound { id, len } => StoreError::NotFound { id, total: len },
            LogError::Full { .. } => StoreError::SequenceOverflow,
            other => StoreError::Io(other),
        }
    }
}

impl From<IndexError> for StoreError {
    fn from(e: IndexError) -> Self {
        match e {
            IndexError::Bits(bits) => StoreError::Config(ConfigError::HashBits(bits)),
            IndexError::Allocation(e) => StoreError::Allocation(e),
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(LogError::Io(e))
    }
}

/// A transaction whose origin cannot cover the amount.
///
/// The transfer is skipped, the block is still stored and indexed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "block {id}: transaction {index} moves {amount} from address {origin} \
     to {destination}, but {origin} holds only {balance}"
)]
pub struct PayloadAnomaly {
    /// Block id.
    pub id: u32,
    /// Position of the triple within the payload.
    pub index: u8,
    pub origin: u8,
    pub destination: u8,
    pub amount: u8,
    /// Origin balance at the time the transaction was applied.
    pub balance: u64,
}
