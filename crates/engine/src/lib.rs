//! # Engine - Block Store
//!
//! The orchestrator that ties the [`blocklog`], [`nonce_index`] and
//! [`category_index`] crates into a queryable block store.
//!
//! ## Architecture
//!
//! ```text
//! Producer
//!   |
//!   v
//! ┌───────────────────────────────────────────────┐
//! │                  BLOCK STORE                  │
//! │                                               │
//! │ write.rs → ingest (indexes + ledger)          │
//! │              |                                │
//! │              v                                │
//! │          write buffer ──(full?)──> block file │
//! │                                               │
//! │ read.rs  → buffer (unflushed tail) or file    │
//! │ report.rs → bucket sort + ledger rankings     │
//! │ recovery.rs → replay file → ingest            │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Module Responsibilities
//!
//! | Module       | Purpose                                                 |
//! |--------------|---------------------------------------------------------|
//! | [`lib.rs`]   | `BlockStore` struct, `open`, accessors, `Debug`, `Drop` |
//! | [`recovery`] | replay of the block file into fresh in-memory state     |
//! | [`write`]    | `append()`, `flush()`, `close()`, shared `ingest()`     |
//! | [`read`]     | `read_by_id()`, nonce and category lookups              |
//! | [`report`]   | tx-count report, rankings, averages                     |
//! | [`ledger`]   | per-block tx counts, balances, anomalies, last digest   |
//!
//! ## Ids
//!
//! A block's id is its 1-based position in the file. The `number` field the
//! producer wrote is stored verbatim but never used for addressing.
//!
//! ## Crash Safety
//!
//! Blocks in the write buffer are lost on a crash. Everything in the file is
//! recovered on the next [`BlockStore::open`]; a torn trailing block is
//! discarded.
mod error;
mod ledger;
mod read;
mod recovery;
mod report;
mod write;

pub use error::{PayloadAnomaly, Result, StoreError};
pub use ledger::{Ledger, ADDRESSES, MINING_REWARD};
pub use nonce_index::Histogram;
pub use report::{group_by_tx_count, Ranking, ReportRow, TxExtreme, TX_BUCKETS};

use blocklog::{BlockLog, BufferedLog};
use category_index::CategoryIndex;
use config::StoreConfig;
use nonce_index::NonceIndex;
use tracing::info;

/// A block file plus its in-memory indexes.
///
/// # Write Path
///
/// 1. Assign the next id (`total_count() + 1`).
/// 2. Insert into the nonce index, the category index and the ledger.
/// 3. Stage the block in the write buffer.
/// 4. When the buffer is full, write all staged blocks in one batch.
///
/// # Read Path
///
/// Ids above `flushed_count()` are served from the buffer, the rest with a
/// single positioned read from the file.
///
/// # Recovery
///
/// [`BlockStore::open`] replays the file from the start, ingesting every block
/// under its positional id. The resulting state equals the state built by
/// appending the same blocks one by one.
pub struct BlockStore {
    pub(crate) log: BufferedLog,
    pub(crate) indexes: Indexes,
    pub(crate) config: StoreConfig,
}

/// Everything derived from block contents. Rebuilt from scratch on replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Indexes {
    pub(crate) nonces: NonceIndex,
    pub(crate) categories: CategoryIndex,
    pub(crate) ledger: Ledger,
}

impl std::fmt::Debug for BlockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockStore")
            .field("path", &self.config.path)
            .field("total", &self.total_count())
            .field("flushed", &self.flushed_count())
            .field("buffered", &self.buffered_count())
            .field("flushes", &self.flush_count())
            .field("buffer_capacity", &self.log.capacity())
            .field("hash_bits", &self.indexes.nonces.bits())
            .field("nonce_entries", &self.indexes.nonces.len())
            .field("anomalies", &self.indexes.ledger.anomalies().len())
            .field("poisoned", &self.log.is_poisoned())
            .finish()
    }
}

impl BlockStore {
    /// Opens the block file named by `config`, creating it if missing, and
    /// rebuilds every index from its contents.
    ///
    /// # Errors
    ///
    /// [`StoreError::Config`] for invalid settings, [`StoreError::Io`] when the
    /// file cannot be opened or read, [`StoreError::Allocation`] when the
    /// indexes cannot hold the file's blocks.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        config.validate()?;

        let log = BlockLog::open(&config.path, config.sync)?;
        let created = log.was_created();

        let mut store = Self {
            log: BufferedLog::new(log, config.buffer_capacity),
            indexes: Indexes {
                nonces: NonceIndex::with_bits(config.hash_bits)?,
                categories: CategoryIndex::new(),
                ledger: Ledger::new(),
            },
            config: config.clone(),
        };

        if created {
            info!(path = %config.path.display(), "created empty block store");
        } else {
            store.restore()?;
        }
        Ok(store)
    }

    /// Total blocks: flushed plus buffered.
    #[must_use]
    pub fn total_count(&self) -> u32 {
        self.log.len()
    }

    /// Blocks already written to the file.
    #[must_use]
    pub fn flushed_count(&self) -> u32 {
        self.log.flushed_len()
    }

    /// Blocks staged in memory.
    #[must_use]
    pub fn buffered_count(&self) -> usize {
        self.log.buffered_len()
    }

    /// Batched writes performed since `open`.
    #[must_use]
    pub fn flush_count(&self) -> u64 {
        self.log.flush_count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_count() == 0
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Derived aggregates (tx counts, balances, anomalies).
    pub fn ledger(&self) -> &Ledger {
        &self.indexes.ledger
    }
}

/// Best-effort flush on drop.
///
/// Buffered blocks are written so a plain drop does not lose them. Errors are
/// ignored here; call [`BlockStore::close`] to observe them. A store whose
/// log failed earlier is not written again.
impl Drop for BlockStore {
    fn drop(&mut self) {
        if self.log.buffered_len() > 0 && !self.log.is_poisoned() {
            let _ = self.log.flush();
        }
    }
}

#[cfg(test)]
mod tests;
