//! # Block - Fixed-Size Record Codec
//!
//! Defines the on-disk representation of one mined block and the two values
//! the storage engine derives from its payload: the miner address (category)
//! and the number of transactions it carries.
//!
//! ## Binary Layout (256 bytes, little-endian)
//!
//! ```text
//! ┌────────┬──────┬───────────────────────────────────────────┐
//! │ offset │ size │ field                                     │
//! ├────────┼──────┼───────────────────────────────────────────┤
//! │      0 │    4 │ number     (u32, written by the producer) │
//! │      4 │    4 │ nonce      (u32, search key)              │
//! │      8 │  184 │ data       (payload, see below)           │
//! │    192 │   32 │ prev_hash  (digest of the previous block) │
//! │    224 │   32 │ hash       (digest of this block)         │
//! └────────┴──────┴───────────────────────────────────────────┘
//! ```
//!
//! ## Payload
//!
//! ```text
//! [origin u8 | destination u8 | amount u8] x up to 61   (offsets 0..183)
//! [miner u8]                                            (offset 183)
//! ```
//!
//! The first block of a chain (the *origin* block) stores a text tag in place
//! of transactions. Whether a block is the origin is decided by its position
//! in the log, never by its `number` field.
//!
//! ## Example
//!
//! ```rust
//! use block::{Block, Payload, Transaction, BLOCK_SIZE};
//!
//! let data = Payload::with_transactions(9, &[Transaction::new(1, 2, 30)]);
//! let block = Block::new(2, 77, data, [0u8; 32], [1u8; 32]);
//!
//! let bytes = block.encoded();
//! assert_eq!(bytes.len(), BLOCK_SIZE);
//! assert_eq!(Block::decode(&bytes).unwrap(), block);
//! assert_eq!(block.miner(), 9);
//! assert_eq!(block.tx_count(), 1);
//! ```

mod payload;

pub use payload::{tx_count, Payload, Transaction, Transactions, GENESIS_TAG};

use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;

/// Size of the opaque payload in bytes.
pub const PAYLOAD_SIZE: usize = 184;

/// Size of a SHA-256 digest in bytes.
pub const DIGEST_SIZE: usize = 32;

/// Size of one encoded block: 4 (`number`) + 4 (`nonce`) + 184 + 32 + 32.
pub const BLOCK_SIZE: usize = 4 + 4 + PAYLOAD_SIZE + DIGEST_SIZE + DIGEST_SIZE;

/// Payload offset of the miner address byte.
pub const MINER_OFFSET: usize = PAYLOAD_SIZE - 1;

/// Upper bound on the number of transactions a payload can carry.
pub const MAX_TRANSACTIONS: u8 = (MINER_OFFSET / 3) as u8;

/// A 32-byte digest.
pub type Digest = [u8; DIGEST_SIZE];

/// Zero digest, used as `prev_hash` of the origin block.
pub const ZERO_DIGEST: Digest = [0u8; DIGEST_SIZE];

const NUMBER_AT: usize = 0;
const NONCE_AT: usize = 4;
const DATA_AT: usize = 8;
const PREV_HASH_AT: usize = DATA_AT + PAYLOAD_SIZE;
const HASH_AT: usize = PREV_HASH_AT + DIGEST_SIZE;

/// Errors produced while decoding a block.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The input did not contain a full block.
    #[error("short block: got {got} bytes, need {}", BLOCK_SIZE)]
    Short {
        /// Number of bytes supplied.
        got: usize,
    },
}

/// One finalized, immutable block.
///
/// Every field is stored and returned verbatim. The storage engine never
/// recomputes `hash` and never trusts `number` as an ordering key.
#[derive(Clone, PartialEq, Eq)]
pub struct Block {
    /// Block number as written by the producer.
    pub number: u32,
    /// Proof-of-work nonce, indexed as the search key.
    pub nonce: u32,
    /// Fixed-size payload.
    pub data: [u8; PAYLOAD_SIZE],
    /// Digest of the previous block.
    pub prev_hash: Digest,
    /// Digest of this block.
    pub hash: Digest,
}

impl Block {
    /// Assembles a block from its parts.
    pub fn new(
        number: u32,
        nonce: u32,
        data: [u8; PAYLOAD_SIZE],
        prev_hash: Digest,
        hash: Digest,
    ) -> Self {
        Self {
            number,
            nonce,
            data,
            prev_hash,
            hash,
        }
    }

    /// Miner address stored in the last payload byte.
    #[must_use]
    pub fn miner(&self) -> u8 {
        self.data[MINER_OFFSET]
    }

    /// Number of transactions in the payload.
    ///
    /// Callers that know the block is the origin block must use `0` instead;
    /// the origin payload holds text that this parser would misread.
    #[must_use]
    pub fn tx_count(&self) -> u8 {
        tx_count(&self.data)
    }

    /// Iterates over the first `count` transaction triples of the payload.
    pub fn transactions(&self, count: u8) -> Transactions<'_> {
        Transactions::new(&self.data, count)
    }

    /// Serializes the block into `out`.
    pub fn encode_into(&self, out: &mut [u8; BLOCK_SIZE]) {
        LittleEndian::write_u32(&mut out[NUMBER_AT..NONCE_AT], self.number);
        LittleEndian::write_u32(&mut out[NONCE_AT..DATA_AT], self.nonce);
        out[DATA_AT..PREV_HASH_AT].copy_from_slice(&self.data);
        out[PREV_HASH_AT..HASH_AT].copy_from_slice(&self.prev_hash);
        out[HASH_AT..BLOCK_SIZE].copy_from_slice(&self.hash);
    }

    /// Serializes the block into a fresh array.
    #[must_use]
    pub fn encoded(&self) -> [u8; BLOCK_SIZE] {
        let mut out = [0u8; BLOCK_SIZE];
        self.encode_into(&mut out);
        out
    }

    /// Deserializes a block from the first [`BLOCK_SIZE`] bytes of `buf`.
    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        if buf.len() < BLOCK_SIZE {
            return Err(DecodeError::Short { got: buf.len() });
        }
        let mut data = [0u8; PAYLOAD_SIZE];
        data.copy_from_slice(&buf[DATA_AT..PREV_HASH_AT]);
        let mut prev_hash = ZERO_DIGEST;
        prev_hash.copy_from_slice(&buf[PREV_HASH_AT..HASH_AT]);
        let mut hash = ZERO_DIGEST;
        hash.copy_from_slice(&buf[HASH_AT..BLOCK_SIZE]);

        Ok(Self {
            number: LittleEndian::read_u32(&buf[NUMBER_AT..NONCE_AT]),
            nonce: LittleEndian::read_u32(&buf[NONCE_AT..DATA_AT]),
            data,
            prev_hash,
            hash,
        })
    }
}

impl std::fmt::Debug for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Block")
            .field("number", &self.number)
            .field("nonce", &self.nonce)
            .field("miner", &self.miner())
            .field("prev_hash", &hex(&self.prev_hash))
            .field("hash", &hex(&self.hash))
            .finish()
    }
}

/// Lowercase hex rendering of a byte slice.
pub fn hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{:02x}", b);
    }
    s
}
