//! Aggregates derived from block payloads: per-block transaction counts,
//! address balances, total value moved, anomalies and the latest digest.
//!
//! Every block passes through [`Ledger::apply`] exactly once, in id order,
//! whether it comes from a live append or a replay.
use block::{Block, Digest, ZERO_DIGEST};
use std::collections::TryReserveError;
use tracing::warn;

use crate::PayloadAnomaly;

/// Coins credited to the miner of every block, origin included.
pub const MINING_REWARD: u64 = 50;

/// Number of distinct addresses.
pub const ADDRESSES: usize = 256;

#[derive(Clone, PartialEq, Eq)]
pub struct Ledger {
    /// `tx_counts[id - 1]` is the transaction count of block `id`.
    tx_counts: Vec<u8>,
    balances: [u64; ADDRESSES],
    transferred: u64,
    anomalies: Vec<PayloadAnomaly>,
    last_hash: Digest,
}

impl Ledger {
    pub fn new() -> Self {
        Self {
            tx_counts: Vec::new(),
            balances: [0; ADDRESSES],
            transferred: 0,
            anomalies: Vec::new(),
            last_hash: ZERO_DIGEST,
        }
    }

    /// Folds block `id` into the aggregates and returns its transaction count.
    ///
    /// The miner is credited first. Block 1 is the origin block: its payload is
    /// text, so it carries no transactions. A transfer the origin address cannot
    /// cover is skipped and recorded as a [`PayloadAnomaly`].
    pub(crate) fn apply(&mut self, id: u32, block: &Block) -> Result<u8, TryReserveError> {
        let count = if id == 1 { 0 } else { block.tx_count() };
        self.tx_counts.try_reserve(1)?;
        self.tx_counts.push(count);

        let miner = block.miner() as usize;
        self.balances[miner] = self.balances[miner].saturating_add(MINING_REWARD);

        for (index, tx) in block.transactions(count).enumerate() {
            let amount = u64::from(tx.amount);
            let balance = self.balances[tx.origin as usize];
            if balance >= amount {
                self.balances[tx.origin as usize] -= amount;
                let dest = &mut self.balances[tx.destination as usize];
                *dest = dest.saturating_add(amount);
                self.transferred = self.transferred.saturating_add(amount);
            } else {
                let anomaly = PayloadAnomaly {
                    id,
                    index: index as u8,
                    origin: tx.origin,
                    destination: tx.destination,
                    amount: tx.amount,
                    balance,
                };
                warn!(%anomaly, "skipping uncovered transaction");
                self.anomalies.try_reserve(1)?;
                self.anomalies.push(anomaly);
            }
        }

        self.last_hash = block.hash;
        Ok(count)
    }

    /// Transaction count of block `id`, if it has been applied.
    #[must_use]
    pub fn tx_count(&self, id: u32) -> Option<u8> {
        let at = (id as usize).checked_sub(1)?;
        self.tx_counts.get(at).copied()
    }

    /// Transaction counts in id order.
    pub fn tx_counts(&self) -> &[u8] {
        &self.tx_counts
    }

    #[must_use]
    pub fn balance(&self, address: u8) -> u64 {
        self.balances[address as usize]
    }

    pub fn balances(&self) -> &[u64; ADDRESSES] {
        &self.balances
    }

    /// Sum of every applied transfer.
    #[must_use]
    pub fn transferred(&self) -> u64 {
        self.transferred
    }

    pub fn anomalies(&self) -> &[PayloadAnomaly] {
        &self.anomalies
    }

    /// Digest of the most recent block, zero when empty.
    #[must_use]
    pub fn last_hash(&self) -> Digest {
        self.last_hash
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tx_counts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tx_counts.is_empty()
    }

    pub fn clear(&mut self) {
        self.tx_counts.clear();
        self.balances = [0; ADDRESSES];
        self.transferred = 0;
        self.anomalies.clear();
        self.last_hash = ZERO_DIGEST;
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("blocks", &self.tx_counts.len())
            .field("transferred", &self.transferred)
            .field("anomalies", &self.anomalies.len())
            .field("last_hash", &block::hex(&self.last_hash))
            .finish()
    }
}
