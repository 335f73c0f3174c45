//! # Nonce Index
//!
//! A fixed-size chained hash table mapping a 32-bit nonce to the ids of every
//! block that carries it.
//!
//! Nonces are not unique: two blocks may share one, and many nonces share a
//! bucket. Lookups therefore walk the whole bucket chain and yield **all**
//! matching ids.
//!
//! ## Layout
//!
//! Chains are stored arena-style: one dense `Vec` of entries, each holding the
//! index of the next entry in its bucket. Bucket heads point into the arena.
//! Insertion pushes onto the head of the chain, so chains are newest-first.
//!
//! ```text
//! heads: [ None | Some(4) | None | Some(2) | ... ]   (2^bits slots)
//!                   |                 |
//! entries:          v                 v
//!   [0] {nonce, id, next: None}   [2] {.., next: Some(0)}
//!   [4] {nonce, id, next: Some(1)} ...
//! ```
//!
//! ## Hashing
//!
//! Multiplicative (Knuth) hashing keeps the high `bits` bits of
//! `nonce * 2654435761 mod 2^32`, which scatters clustered nonces evenly.
//!
//! ## Example
//!
//! ```rust
//! use nonce_index::NonceIndex;
//!
//! let mut idx = NonceIndex::with_bits(10).unwrap();
//! idx.insert(100, 2).unwrap();
//! idx.insert(100, 4).unwrap();
//! let mut ids: Vec<u32> = idx.lookup(100).collect();
//! ids.sort();
//! assert_eq!(ids, vec![2, 4]);
//! ```

use std::collections::TryReserveError;
use thiserror::Error;

/// Knuth's multiplicative hashing constant (`2^32 / phi`).
pub const KNUTH_CONSTANT: u32 = 2_654_435_761;

/// Default table size exponent: 16384 slots, load factor ~1.8 at 30k blocks.
pub const DEFAULT_HASH_BITS: u32 = 14;

/// Largest supported table size exponent.
pub const MAX_HASH_BITS: u32 = 24;

/// Last histogram row; chains this long or longer share it.
pub const HISTOGRAM_DEPTH: usize = 19;

/// Errors from building a [`NonceIndex`].
#[derive(Debug, Error)]
pub enum IndexError {
    /// Table size exponent outside `1..=MAX_HASH_BITS`.
    #[error("hash bits must be in 1..=24, got {0}")]
    Bits(u32),

    #[error("cannot allocate nonce table: {0}")]
    Allocation(#[from] TryReserveError),
}

/// Maps `nonce` to a slot in a table of `2^bits` buckets.
#[must_use]
pub fn knuth_hash(nonce: u32, bits: u32) -> usize {
    (nonce.wrapping_mul(KNUTH_CONSTANT) >> (32 - bits)) as usize
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Entry {
    nonce: u32,
    id: u32,
    next: Option<u32>,
}

/// Chained hash index from nonce to block ids.
#[derive(Clone, PartialEq, Eq)]
pub struct NonceIndex {
    bits: u32,
    heads: Vec<Option<u32>>,
    entries: Vec<Entry>,
}

impl NonceIndex {
    /// Creates an empty table with `2^bits` slots.
    ///
    /// # Errors
    ///
    /// [`IndexError::Bits`] if `bits` is not in `1..=MAX_HASH_BITS`,
    /// [`IndexError::Allocation`] if the slot array cannot be reserved.
    pub fn with_bits(bits: u32) -> Result<Self, IndexError> {
        if !(1..=MAX_HASH_BITS).contains(&bits) {
            return Err(IndexError::Bits(bits));
        }
        let slots = 1usize << bits;
        let mut heads = Vec::new();
        heads.try_reserve_exact(slots)?;
        heads.resize(slots, None);
        Ok(Self {
            bits,
            heads,
            entries: Vec::new(),
        })
    }

    /// Records that block `id` carries `nonce`. O(1).
    ///
    /// Fails only if the entry arena cannot grow.
    pub fn insert(&mut self, nonce: u32, id: u32) -> Result<(), TryReserveError> {
        self.entries.try_reserve(1)?;
        let slot = knuth_hash(nonce, self.bits);
        let at = self.entries.len() as u32;
        self.entries.push(Entry {
            nonce,
            id,
            next: self.heads[slot],
        });
        self.heads[slot] = Some(at);
        Ok(())
    }

    /// Iterates over the ids of every block with `nonce`, newest first.
    pub fn lookup(&self, nonce: u32) -> Lookup<'_> {
        Lookup {
            entries: &self.entries,
            cursor: self.heads[knuth_hash(nonce, self.bits)],
            nonce,
        }
    }

    /// Walks every chain and summarizes their lengths.
    ///
    /// O(slots + entries); meant for diagnostics, not hot paths.
    pub fn histogram(&self) -> Histogram {
        let mut h = Histogram {
            slots: self.heads.len(),
            occupied: 0,
            max_chain: 0,
            entries: self.entries.len(),
            buckets: [0; HISTOGRAM_DEPTH + 1],
        };

        for &head in &self.heads {
            let mut len = 0usize;
            let mut cursor = head;
            while let Some(at) = cursor {
                len += 1;
                cursor = self.entries[at as usize].next;
            }
            if len > 0 {
                h.occupied += 1;
            }
            h.max_chain = h.max_chain.max(len);
            h.buckets[len.min(HISTOGRAM_DEPTH)] += 1;
        }
        h
    }

    /// Drops every entry and empties all buckets.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.heads.fill(None);
    }

    /// Number of (nonce, id) entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Table size exponent.
    #[must_use]
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Number of buckets (`2^bits`).
    #[must_use]
    pub fn slots(&self) -> usize {
        self.heads.len()
    }
}

impl std::fmt::Debug for NonceIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NonceIndex")
            .field("bits", &self.bits)
            .field("slots", &self.heads.len())
            .field("entries", &self.entries.len())
            .finish()
    }
}

/// Iterator returned by [`NonceIndex::lookup`].
pub struct Lookup<'a> {
    entries: &'a [Entry],
    cursor: Option<u32>,
    nonce: u32,
}

impl Iterator for Lookup<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        while let Some(at) = self.cursor {
            let entry = &self.entries[at as usize];
            self.cursor = entry.next;
            if entry.nonce == self.nonce {
                return Some(entry.id);
            }
        }
        None
    }
}

/// Chain-length distribution of a [`NonceIndex`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram {
    /// Total number of buckets.
    pub slots: usize,
    /// Buckets holding at least one entry.
    pub occupied: usize,
    /// Longest chain.
    pub max_chain: usize,
    /// Total entries in the table.
    pub entries: usize,
    /// `buckets[n]` = number of slots whose chain has length `n`; the last
    /// row counts every chain of length `HISTOGRAM_DEPTH` or more.
    pub buckets: [usize; HISTOGRAM_DEPTH + 1],
}

impl Histogram {
    #[must_use]
    pub fn empty_slots(&self) -> usize {
        self.slots - self.occupied
    }

    /// Entries per slot.
    #[must_use]
    pub fn load_factor(&self) -> f64 {
        self.entries as f64 / self.slots as f64
    }

    /// Mean chain length over occupied slots (0 when the table is empty).
    #[must_use]
    pub fn mean_occupied_chain(&self) -> f64 {
        if self.occupied == 0 {
            return 0.0;
        }
        self.entries as f64 / self.occupied as f64
    }
}
