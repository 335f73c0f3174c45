//! Payload interpretation: transaction triples, the end-of-data rule, and a
//! small builder used by producers and tests.

use crate::{MAX_TRANSACTIONS, MINER_OFFSET, PAYLOAD_SIZE};

/// Tag written into the origin block payload.
pub const GENESIS_TAG: &str =
    "The Times 03/Jan/2009 Chancellor on brink of second bailout for banks";

/// Bytes inspected after an all-zero triple before declaring end of data.
const LOOKAHEAD: usize = 6;

/// A single value transfer between two addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transaction {
    /// Paying address.
    pub origin: u8,
    /// Receiving address.
    pub destination: u8,
    /// Amount moved.
    pub amount: u8,
}

impl Transaction {
    pub fn new(origin: u8, destination: u8, amount: u8) -> Self {
        Self {
            origin,
            destination,
            amount,
        }
    }
}

/// Counts the transactions stored in `data`.
///
/// Triples are read at offsets `0, 3, .., 180`. An all-zero triple ends the
/// scan only if the following bytes up to `i + 9` (never past the miner byte)
/// are zero as well; otherwise it counts as a genuine `(0, 0, 0)` transfer.
#[must_use]
pub fn tx_count(data: &[u8; PAYLOAD_SIZE]) -> u8 {
    let mut count = 0u8;
    let mut i = 0;
    while i + 3 <= MINER_OFFSET {
        if data[i..i + 3] == [0, 0, 0] {
            let end = (i + 3 + LOOKAHEAD).min(MINER_OFFSET);
            let start = (i + 3).min(end);
            if data[start..end].iter().all(|&b| b == 0) {
                break;
            }
        }
        count += 1;
        i += 3;
    }
    count
}

/// Iterator over the leading transaction triples of a payload.
pub struct Transactions<'a> {
    data: &'a [u8; PAYLOAD_SIZE],
    next: usize,
    count: usize,
}

impl<'a> Transactions<'a> {
    pub(crate) fn new(data: &'a [u8; PAYLOAD_SIZE], count: u8) -> Self {
        Self {
            data,
            next: 0,
            count: count.min(MAX_TRANSACTIONS) as usize,
        }
    }
}

impl Iterator for Transactions<'_> {
    type Item = Transaction;

    fn next(&mut self) -> Option<Transaction> {
        if self.next >= self.count {
            return None;
        }
        let at = self.next * 3;
        self.next += 1;
        Some(Transaction::new(
            self.data[at],
            self.data[at + 1],
            self.data[at + 2],
        ))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.count - self.next;
        (left, Some(left))
    }
}

impl ExactSizeIterator for Transactions<'_> {}

/// Builds payload buffers.
pub struct Payload;

impl Payload {
    /// Origin payload: `tag` (truncated to fit) followed by zeros, then the
    /// miner byte.
    #[must_use]
    pub fn origin(tag: &str, miner: u8) -> [u8; PAYLOAD_SIZE] {
        let mut data = [0u8; PAYLOAD_SIZE];
        let bytes = tag.as_bytes();
        let n = bytes.len().min(MINER_OFFSET - 1);
        data[..n].copy_from_slice(&bytes[..n]);
        data[MINER_OFFSET] = miner;
        data
    }

    /// Regular payload: transactions packed from offset 0, zero padding, then
    /// the miner byte. Transactions beyond [`MAX_TRANSACTIONS`] are dropped.
    #[must_use]
    pub fn with_transactions(miner: u8, txs: &[Transaction]) -> [u8; PAYLOAD_SIZE] {
        let mut data = [0u8; PAYLOAD_SIZE];
        for (i, tx) in txs.iter().take(MAX_TRANSACTIONS as usize).enumerate() {
            data[i * 3] = tx.origin;
            data[i * 3 + 1] = tx.destination;
            data[i * 3 + 2] = tx.amount;
        }
        data[MINER_OFFSET] = miner;
        data
    }
}
