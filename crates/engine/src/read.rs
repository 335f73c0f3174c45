/// Read path: `read_by_id()`, nonce lookups, category listings.
///
/// Indexes only hold ids; every block body comes from `read_by_id`, which
/// serves the unflushed tail from memory and everything else from the file.
use block::{Block, Digest};
use nonce_index::Histogram;

use crate::{BlockStore, Result};

impl BlockStore {
    /// Returns block `id`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`](crate::StoreError::NotFound) when `id` is 0 or
    /// above `total_count()`, [`StoreError::Io`](crate::StoreError::Io) on a
    /// failed file read.
    pub fn read_by_id(&self, id: u32) -> Result<Block> {
        Ok(self.log.read(id)?)
    }

    /// Every block whose nonce equals `nonce`, in ascending id order.
    ///
    /// Duplicate nonces are all returned; no match is an empty vector.
    pub fn lookup_by_nonce(&self, nonce: u32) -> Result<Vec<(u32, Block)>> {
        let mut ids: Vec<u32> = self.indexes.nonces.lookup(nonce).collect();
        // Chains are newest-first
        ids.reverse();
        self.resolve(ids)
    }

    /// The first `n` blocks mined by `category`, oldest first.
    pub fn first_n_by_category(&self, category: u8, n: usize) -> Result<Vec<(u32, Block)>> {
        self.resolve(self.indexes.categories.first_n(category, n))
    }

    /// Number of blocks mined by `category`.
    #[must_use]
    pub fn count_by_category(&self, category: u8) -> u32 {
        self.indexes.categories.count(category)
    }

    /// Chain-length distribution of the nonce index.
    #[must_use]
    pub fn histogram_snapshot(&self) -> Histogram {
        self.indexes.nonces.histogram()
    }

    /// Current balance of `address`.
    #[must_use]
    pub fn balance(&self, address: u8) -> u64 {
        self.indexes.ledger.balance(address)
    }

    /// Digest of the latest block, zero when the store is empty.
    #[must_use]
    pub fn last_hash(&self) -> Digest {
        self.indexes.ledger.last_hash()
    }

    /// Transactions skipped because their origin could not cover them.
    pub fn anomalies(&self) -> &[crate::PayloadAnomaly] {
        self.indexes.ledger.anomalies()
    }

    fn resolve<I>(&self, ids: I) -> Result<Vec<(u32, Block)>>
    where
        I: IntoIterator<Item = u32>,
    {
        ids.into_iter()
            .map(|id| self.read_by_id(id).map(|b| (id, b)))
            .collect()
    }
}
