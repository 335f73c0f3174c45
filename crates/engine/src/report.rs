//! Reports over the whole store.
//!
//! The tx-count report orders blocks by transaction count with a bucket sort:
//! counts are bounded to `0..=61`, so one pass over the cached counts plus one
//! pass over the buckets is enough, O(n) with no comparisons.
//!
//! The remaining reports are rankings over the ledger and the category index.
use block::{Block, MAX_TRANSACTIONS};

use crate::{BlockStore, Result};

/// Number of distinct transaction counts (`0..=61`).
pub const TX_BUCKETS: usize = MAX_TRANSACTIONS as usize + 1;

/// One line of the tx-count report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub id: u32,
    pub tx_count: u8,
    pub block: Block,
}

/// Addresses sharing the best value of some ranking, ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ranking {
    pub value: u64,
    pub addresses: Vec<u8>,
}

/// Blocks sharing the highest or lowest transaction count, ascending id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxExtreme {
    pub tx_count: u8,
    pub ids: Vec<u32>,
}

/// Groups consecutive report rows by transaction count.
///
/// Input is expected in report order; output has one entry per non-empty count.
pub fn group_by_tx_count(rows: &[ReportRow]) -> Vec<(u8, Vec<u32>)> {
    let mut groups: Vec<(u8, Vec<u32>)> = Vec::new();
    for row in rows {
        match groups.last_mut() {
            Some((count, ids)) if *count == row.tx_count => ids.push(row.id),
            _ => groups.push((row.tx_count, vec![row.id])),
        }
    }
    groups
}

impl BlockStore {
    /// The first `n` blocks (ids `1..=n`) ordered by ascending transaction
    /// count, ties in ascending id.
    ///
    /// `n` is clamped to `total_count()`; `n == 0` yields an empty report.
    pub fn report_by_tx_count(&self, n: u32) -> Result<Vec<ReportRow>> {
        let n = n.min(self.total_count()) as usize;
        if n == 0 {
            return Ok(Vec::new());
        }
        let counts = &self.indexes.ledger.tx_counts()[..n];

        let mut blocks: Vec<Option<Block>> = Vec::new();
        blocks.try_reserve_exact(n)?;
        for id in 1..=n as u32 {
            blocks.push(Some(self.read_by_id(id)?));
        }

        // Filling back to front leaves every bucket list in ascending id order
        let mut heads = [None::<u32>; TX_BUCKETS];
        let mut next: Vec<Option<u32>> = Vec::new();
        next.try_reserve_exact(n)?;
        next.resize(n, None);
        for at in (0..n).rev() {
            let bucket = (counts[at] as usize).min(TX_BUCKETS - 1);
            next[at] = heads[bucket];
            heads[bucket] = Some(at as u32);
        }

        let mut rows = Vec::new();
        rows.try_reserve_exact(n)?;
        for (bucket, head) in heads.iter().enumerate() {
            let mut cursor = *head;
            while let Some(at) = cursor {
                let at = at as usize;
                if let Some(block) = blocks[at].take() {
                    rows.push(ReportRow {
                        id: at as u32 + 1,
                        tx_count: bucket as u8,
                        block,
                    });
                }
                cursor = next[at];
            }
        }
        Ok(rows)
    }

    /// Address(es) with the highest balance.
    #[must_use]
    pub fn richest(&self) -> Ranking {
        if self.is_empty() {
            return Ranking::empty();
        }
        Ranking::best(self.indexes.ledger.balances().iter().copied())
    }

    /// Address(es) that mined the most blocks.
    #[must_use]
    pub fn top_miners(&self) -> Ranking {
        if self.is_empty() {
            return Ranking::empty();
        }
        Ranking::best(
            self.indexes
                .categories
                .counts()
                .map(|(_, n)| u64::from(n)),
        )
    }

    /// Block(s) with the most transactions.
    ///
    /// The origin block is only considered when it is the sole block.
    #[must_use]
    pub fn max_tx_blocks(&self) -> TxExtreme {
        self.tx_extreme(|best, c| c > best)
    }

    /// Block(s) with the fewest transactions.
    ///
    /// The origin block is only considered when it is the sole block.
    #[must_use]
    pub fn min_tx_blocks(&self) -> TxExtreme {
        self.tx_extreme(|best, c| c < best)
    }

    /// Coins moved by applied transactions, averaged over every block.
    /// Zero for an empty store.
    #[must_use]
    pub fn average_transferred(&self) -> f64 {
        match self.total_count() {
            0 => 0.0,
            total => self.indexes.ledger.transferred() as f64 / f64::from(total),
        }
    }

    fn tx_extreme<F>(&self, better: F) -> TxExtreme
    where
        F: Fn(u8, u8) -> bool,
    {
        let counts = self.indexes.ledger.tx_counts();
        let skip = usize::from(counts.len() > 1);

        let mut out: Option<TxExtreme> = None;
        for (at, &count) in counts.iter().enumerate().skip(skip) {
            let id = at as u32 + 1;
            match out.as_mut() {
                Some(e) if e.tx_count == count => e.ids.push(id),
                Some(e) if !better(e.tx_count, count) => {}
                _ => {
                    out = Some(TxExtreme {
                        tx_count: count,
                        ids: vec![id],
                    })
                }
            }
        }
        out.unwrap_or(TxExtreme {
            tx_count: 0,
            ids: Vec::new(),
        })
    }
}

impl Ranking {
    fn empty() -> Self {
        Self {
            value: 0,
            addresses: Vec::new(),
        }
    }

    /// Every index holding the maximum of `values`.
    fn best<I: Iterator<Item = u64>>(values: I) -> Self {
        let mut out = Self::empty();
        for (address, value) in values.enumerate() {
            if value > out.value || out.addresses.is_empty() {
                out.value = value;
                out.addresses.clear();
                out.addresses.push(address as u8);
            } else if value == out.value {
                out.addresses.push(address as u8);
            }
        }
        out
    }
}
