use crate::{BlockStore, Result};
use block::{Block, Digest, Payload, Transaction, GENESIS_TAG, ZERO_DIGEST};
use config::StoreConfig;
use std::path::{Path, PathBuf};

pub fn chain_path(dir: &Path) -> PathBuf {
    dir.join("chain.bin")
}

pub fn config_with_capacity(dir: &Path, capacity: usize) -> StoreConfig {
    StoreConfig {
        buffer_capacity: capacity,
        hash_bits: 10,
        ..StoreConfig::with_path(chain_path(dir))
    }
}

pub fn open_store(dir: &Path, capacity: usize) -> Result<BlockStore> {
    BlockStore::open(&config_with_capacity(dir, capacity))
}

/// Recognizable digest for block `number`.
pub fn digest_for(number: u32) -> Digest {
    let mut d = ZERO_DIGEST;
    d[..4].copy_from_slice(&number.to_le_bytes());
    d[31] = 0xEE;
    d
}

pub fn origin(miner: u8) -> Block {
    Block::new(
        1,
        0,
        Payload::origin(GENESIS_TAG, miner),
        ZERO_DIGEST,
        digest_for(1),
    )
}

pub fn block(number: u32, nonce: u32, miner: u8, txs: &[Transaction]) -> Block {
    Block::new(
        number,
        nonce,
        Payload::with_transactions(miner, txs),
        digest_for(number.wrapping_sub(1)),
        digest_for(number),
    )
}

/// Origin mined by 7, then blocks mined by 7, 3, 7 with nonces 100, 200, 100.
pub fn scenario_blocks() -> Vec<Block> {
    vec![
        origin(7),
        block(2, 100, 7, &[Transaction::new(7, 1, 10)]),
        block(3, 200, 3, &[]),
        block(4, 100, 7, &[Transaction::new(7, 3, 5), Transaction::new(1, 2, 4)]),
    ]
}

pub fn ids(rows: &[(u32, Block)]) -> Vec<u32> {
    rows.iter().map(|(id, _)| *id).collect()
}
