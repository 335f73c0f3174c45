//! Block assembly for the shell: SHA-256 sealing and transaction parsing.
//!
//! The digest covers `number | nonce | data | prev_hash` with integers in
//! little-endian. There is no difficulty target; the caller picks the nonce.

use anyhow::{anyhow, Context, Result};
use block::{Block, Digest, Payload, Transaction, GENESIS_TAG, MAX_TRANSACTIONS, PAYLOAD_SIZE};
use sha2::{Digest as _, Sha256};

/// Computes the digest of a block body.
pub fn digest(number: u32, nonce: u32, data: &[u8; PAYLOAD_SIZE], prev_hash: &Digest) -> Digest {
    let mut h = Sha256::new();
    h.update(number.to_le_bytes());
    h.update(nonce.to_le_bytes());
    h.update(data);
    h.update(prev_hash);
    h.finalize().into()
}

/// Builds a block whose `hash` is the digest of its other fields.
pub fn seal(number: u32, nonce: u32, data: [u8; PAYLOAD_SIZE], prev_hash: Digest) -> Block {
    let hash = digest(number, nonce, &data, &prev_hash);
    Block::new(number, nonce, data, prev_hash, hash)
}

/// The origin block: genesis tag payload, zero previous digest.
pub fn origin(nonce: u32, miner: u8) -> Block {
    seal(1, nonce, Payload::origin(GENESIS_TAG, miner), block::ZERO_DIGEST)
}

/// Parses `origin:destination:amount`.
pub fn parse_transaction(s: &str) -> Result<Transaction> {
    let mut it = s.split(':');
    let mut field = |name: &str| -> Result<u8> {
        it.next()
            .ok_or_else(|| anyhow!("missing {} in {:?}", name, s))?
            .parse::<u8>()
            .with_context(|| format!("bad {} in {:?}", name, s))
    };
    let tx = Transaction::new(field("origin")?, field("destination")?, field("amount")?);
    if it.next().is_some() {
        return Err(anyhow!("trailing fields in {:?}", s));
    }
    Ok(tx)
}

/// Parses every `o:d:v` argument, rejecting more than fit in a payload.
pub fn parse_transactions<'a, I>(args: I) -> Result<Vec<Transaction>>
where
    I: IntoIterator<Item = &'a str>,
{
    let txs = args
        .into_iter()
        .map(parse_transaction)
        .collect::<Result<Vec<_>>>()?;
    anyhow::ensure!(
        txs.len() <= MAX_TRANSACTIONS as usize,
        "at most {} transactions per block, got {}",
        MAX_TRANSACTIONS,
        txs.len()
    );
    Ok(txs)
}
