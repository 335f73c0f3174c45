/// Write path: `append()`, `flush()`, `close()` and the shared `ingest()`.
///
/// Every block, whether appended live or replayed at startup, goes through
/// `ingest` exactly once. That single routine is what makes a recovered store
/// indistinguishable from one built incrementally.
use block::Block;
use blocklog::LogError;
use tracing::warn;

use crate::{BlockStore, Indexes, Result, StoreError};

impl BlockStore {
    /// Appends a finalized block and returns its id (the former total + 1).
    ///
    /// The block is indexed immediately and staged in the write buffer; it is
    /// written to the file when the buffer fills up, on [`flush`](Self::flush)
    /// or on [`close`](Self::close). The digest chain is not validated.
    ///
    /// # Errors
    ///
    /// [`StoreError::SequenceOverflow`] once `u32::MAX` blocks exist,
    /// [`StoreError::Io`] if a triggered batch write fails,
    /// [`StoreError::Allocation`] if an index cannot grow.
    ///
    /// `Io` and `Allocation` leave the store refusing every later write; see
    /// [`StoreError::is_fatal`].
    pub fn append(&mut self, block: Block) -> Result<u32> {
        if self.log.is_poisoned() {
            return Err(LogError::Poisoned.into());
        }
        let id = self
            .total_count()
            .checked_add(1)
            .ok_or(StoreError::SequenceOverflow)?;

        // A half-ingested block leaves the indexes ahead of the log
        if let Err(e) = self.indexes.ingest(id, &block) {
            self.log.poison();
            return Err(e);
        }

        let assigned = self.log.push(block)?;
        debug_assert_eq!(assigned, id);
        Ok(id)
    }

    /// Writes all buffered blocks in one batch. No-op when nothing is buffered.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the write fails, and on every call after
    /// a failed write.
    pub fn flush(&mut self) -> Result<()> {
        self.log.flush()?;
        Ok(())
    }

    /// Flushes the buffer and releases the store.
    pub fn close(mut self) -> Result<()> {
        self.flush()?;
        Ok(())
    }
}

impl Indexes {
    /// Folds block `id` into every in-memory structure.
    pub(crate) fn ingest(&mut self, id: u32, block: &Block) -> Result<()> {
        if block.number != id {
            warn!(id, number = block.number, "block number disagrees with position");
        }
        self.nonces.insert(block.nonce, id)?;
        self.categories.append(block.miner(), id)?;
        self.ledger.apply(id, block)?;
        Ok(())
    }

    pub(crate) fn clear(&mut self) {
        self.nonces.clear();
        self.categories.clear();
        self.ledger.clear();
    }
}
