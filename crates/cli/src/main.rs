//! # CLI - Block Store Interactive Shell
//!
//! A REPL-style command-line interface for the block store. Reads commands
//! from stdin, executes them against the store, and prints results to stdout.
//! Logs go to stderr. Works interactively or with commands piped via stdin.
//!
//! ## Commands
//!
//! ```text
//! APPEND nonce miner [o:d:v ...]  Seal and append a block (origin block if empty)
//! BLOCK id                        Print every field of block `id`
//! MINER addr n                    First `n` blocks mined by `addr`
//! TXREPORT n                      Blocks 1..=n ordered by transaction count
//! NONCE k                         Every block with nonce `k`
//! HISTOGRAM                       Nonce index chain-length distribution
//! RICHEST                         Address(es) with the highest balance
//! TOPMINER                        Address(es) that mined the most blocks
//! MAXTX / MINTX                   Block(s) with the most / fewest transactions
//! AVERAGE                         Coins transferred per block
//! REPORTS                         RICHEST, TOPMINER, MAXTX, MINTX and AVERAGE
//! BALANCE addr                    Balance of one address
//! FLUSH                           Write buffered blocks to disk
//! STATS                           Print store debug info
//! EXIT / QUIT                     Flush and shut down
//! ```
//!
//! Bad arguments print an `ERR` line and the shell keeps reading. A failed
//! write or read of the block file ends the process with a non-zero status.
//!
//! ## Configuration
//!
//! ```text
//! CHAIN_DATA_PATH      block file path               (default: "blockchain.bin")
//! CHAIN_BUFFER_BLOCKS  blocks per batched write      (default: 16)
//! CHAIN_HASH_BITS      nonce table size exponent     (default: 14)
//! CHAIN_REPLAY_BATCH   blocks per replay read        (default: 1024)
//! CHAIN_SYNC           fsync after every batch       (default: "false")
//! CHAIN_LOG            log level                     (default: "info")
//! ```
//!
//! ## Example
//!
//! ```text
//! $ cargo run -p cli
//! block store ready (blocks=0, path=blockchain.bin, buffer=16, hash_bits=14)
//! > APPEND 0 7
//! OK id=1 hash=5c1e...
//! > APPEND 42 7 7:3:10
//! OK id=2 hash=0a9b...
//! > BALANCE 3
//! 10
//! > EXIT
//! bye
//! ```

mod seal;

use anyhow::{anyhow, Context, Result};
use block::{hex, Block, Payload};
use config::StoreConfig;
use engine::{BlockStore, Histogram, Ranking, StoreError, TxExtreme};
use std::io::{self, BufRead, Write};
use std::str::FromStr;
use tracing::Level;

fn init_logging(level: &str) {
    let level = Level::from_str(level).unwrap_or(Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let config = StoreConfig::from_env();
    config.validate()?;
    init_logging(&config.log_level);

    let mut store = BlockStore::open(&config)?;

    println!(
        "block store ready (blocks={}, path={}, buffer={}, hash_bits={})",
        store.total_count(),
        config.path.display(),
        config.buffer_capacity,
        config.hash_bits
    );
    println!("Commands: APPEND nonce miner [o:d:v ...] | BLOCK id | MINER addr n | TXREPORT n");
    println!("          NONCE k | HISTOGRAM | RICHEST | TOPMINER | MAXTX | MINTX | AVERAGE");
    println!("          REPORTS | BALANCE addr | FLUSH | STATS | EXIT");
    print!("> ");
    io::stdout().flush().ok();

    let stdin = io::stdin();

    for line in stdin.lock().lines() {
        let line = line?;
        let mut parts = line.split_whitespace();
        if let Some(cmd) = parts.next() {
            match cmd.to_uppercase().as_str() {
                "APPEND" => {
                    let nonce = parts.next().and_then(|s| s.parse::<u32>().ok());
                    let miner = parts.next().and_then(|s| s.parse::<u8>().ok());
                    match (nonce, miner) {
                        (Some(nonce), Some(miner)) => match append(&mut store, nonce, miner, parts) {
                            Ok((id, hash)) => println!("OK id={} hash={}", id, hash),
                            Err(e) if is_fatal(&e) => return Err(e.context("append failed")),
                            Err(e) => println!("ERR append failed: {}", e),
                        },
                        _ => println!("ERR usage: APPEND nonce miner [o:d:v ...]"),
                    }
                }
                "BLOCK" => match parts.next().and_then(|s| s.parse::<u32>().ok()) {
                    Some(id) => match store.read_by_id(id) {
                        Ok(b) => print_block(id, &b, tx_count(&store, id, &b)),
                        Err(e) if e.is_fatal() => return Err(e.into()),
                        Err(e) => println!("ERR {}", e),
                    },
                    None => println!("ERR usage: BLOCK id"),
                },
                "MINER" => {
                    let addr = parts.next().and_then(|s| s.parse::<u8>().ok());
                    let n = parts.next().and_then(|s| s.parse::<usize>().ok());
                    match (addr, n) {
                        (Some(addr), Some(n)) => match store.first_n_by_category(addr, n) {
                            Ok(blocks) => {
                                for (id, b) in &blocks {
                                    println!("#{} number={} nonce={}", id, b.number, b.nonce);
                                }
                                println!(
                                    "({} of {} blocks mined by {})",
                                    blocks.len(),
                                    store.count_by_category(addr),
                                    addr
                                );
                            }
                            Err(e) if e.is_fatal() => return Err(e.into()),
                            Err(e) => println!("ERR read failed: {}", e),
                        },
                        _ => println!("ERR usage: MINER addr n"),
                    }
                }
                "TXREPORT" => match parts.next().and_then(|s| s.parse::<u32>().ok()) {
                    Some(n) => match store.report_by_tx_count(n) {
                        Ok(rows) if rows.is_empty() => println!("(empty)"),
                        Ok(rows) => {
                            for r in &rows {
                                println!("#{}: {} transactions", r.id, r.tx_count);
                            }
                            println!("({} blocks)", rows.len());
                        }
                        Err(e) if e.is_fatal() => return Err(e.into()),
                        Err(e) => println!("ERR report failed: {}", e),
                    },
                    None => println!("ERR usage: TXREPORT n"),
                },
                "NONCE" => match parts.next().and_then(|s| s.parse::<u32>().ok()) {
                    Some(k) => match store.lookup_by_nonce(k) {
                        Ok(found) if found.is_empty() => println!("(none)"),
                        Ok(found) => {
                            for (id, b) in &found {
                                println!("#{} number={} miner={} hash={}", id, b.number, b.miner(), hex(&b.hash));
                            }
                            println!("({} blocks)", found.len());
                        }
                        Err(e) if e.is_fatal() => return Err(e.into()),
                        Err(e) => println!("ERR read failed: {}", e),
                    },
                    None => println!("ERR usage: NONCE k"),
                },
                "HISTOGRAM" => print_histogram(&store.histogram_snapshot()),
                "RICHEST" => print_ranking("richest", "coins", &store.richest()),
                "TOPMINER" => print_ranking("top miner", "blocks", &store.top_miners()),
                "MAXTX" => print_extreme("most transactions", &store.max_tx_blocks()),
                "MINTX" => print_extreme("fewest transactions", &store.min_tx_blocks()),
                "AVERAGE" => println!("average transferred per block: {:.2}", store.average_transferred()),
                "REPORTS" => {
                    print_ranking("richest", "coins", &store.richest());
                    print_ranking("top miner", "blocks", &store.top_miners());
                    print_extreme("most transactions", &store.max_tx_blocks());
                    print_extreme("fewest transactions", &store.min_tx_blocks());
                    println!("average transferred per block: {:.2}", store.average_transferred());
                    if !store.anomalies().is_empty() {
                        println!("anomalies: {}", store.anomalies().len());
                    }
                }
                "BALANCE" => match parts.next().and_then(|s| s.parse::<u8>().ok()) {
                    Some(addr) => println!("{}", store.balance(addr)),
                    None => println!("ERR usage: BALANCE addr"),
                },
                "FLUSH" => {
                    store.flush().context("flush failed")?;
                    println!(
                        "OK (flushed={}, buffered={})",
                        store.flushed_count(),
                        store.buffered_count()
                    );
                }
                "STATS" => {
                    println!("{:?}", store);
                }
                "EXIT" | "QUIT" => {
                    println!("bye");
                    break;
                }
                other => {
                    println!("unknown command: {}", other);
                }
            }
        }

        print!("> ");
        io::stdout().flush().ok();
    }

    store.close()?;
    Ok(())
}

/// Seals the next block from shell arguments and appends it.
///
/// An empty store gets the origin block, which carries no transactions.
fn append<'a, I>(store: &mut BlockStore, nonce: u32, miner: u8, args: I) -> Result<(u32, String)>
where
    I: IntoIterator<Item = &'a str>,
{
    let txs = seal::parse_transactions(args)?;
    let block = if store.is_empty() {
        if !txs.is_empty() {
            return Err(anyhow!("the origin block carries no transactions"));
        }
        seal::origin(nonce, miner)
    } else {
        let number = store.total_count() + 1;
        seal::seal(
            number,
            nonce,
            Payload::with_transactions(miner, &txs),
            store.last_hash(),
        )
    };
    let hash = hex(&block.hash);
    let id = store.append(block)?;
    Ok((id, hash))
}

/// Storage and allocation failures end the session; the rest are reported.
fn is_fatal(e: &anyhow::Error) -> bool {
    e.downcast_ref::<StoreError>().is_some_and(StoreError::is_fatal)
}

fn tx_count(store: &BlockStore, id: u32, b: &Block) -> u8 {
    store.ledger().tx_count(id).unwrap_or_else(|| b.tx_count())
}

fn print_block(id: u32, b: &Block, count: u8) {
    println!("#{}", id);
    println!("  number:    {}", b.number);
    println!("  nonce:     {}", b.nonce);
    println!("  miner:     {}", b.miner());
    println!("  prev_hash: {}", hex(&b.prev_hash));
    println!("  hash:      {}", hex(&b.hash));
    if id == 1 {
        let text: Vec<u8> = b.data[..block::MINER_OFFSET]
            .iter()
            .copied()
            .take_while(|&c| c != 0)
            .collect();
        println!("  tag:       {}", String::from_utf8_lossy(&text));
    }
    println!("  transactions: {}", count);
    for tx in b.transactions(count) {
        println!("    {} -> {}: {}", tx.origin, tx.destination, tx.amount);
    }
}

fn print_histogram(h: &Histogram) {
    println!(
        "slots={} entries={} empty={} load_factor={:.3} mean_chain={:.3} max_chain={}",
        h.slots,
        h.entries,
        h.empty_slots(),
        h.load_factor(),
        h.mean_occupied_chain(),
        h.max_chain
    );
    let last = h.buckets.len() - 1;
    for (len, &n) in h.buckets.iter().enumerate() {
        if n == 0 {
            continue;
        }
        if len == last {
            println!("  {}+: {}", len, n);
        } else {
            println!("  {}: {}", len, n);
        }
    }
}

fn print_ranking(label: &str, unit: &str, r: &Ranking) {
    if r.addresses.is_empty() {
        println!("{}: (empty)", label);
        return;
    }
    let addrs: Vec<String> = r.addresses.iter().map(|a| a.to_string()).collect();
    println!("{}: {} ({} {})", label, addrs.join(","), r.value, unit);
}

fn print_extreme(label: &str, e: &TxExtreme) {
    if e.ids.is_empty() {
        println!("{}: (empty)", label);
        return;
    }
    let ids: Vec<String> = e.ids.iter().map(|id| format!("#{}", id)).collect();
    println!("{}: {} ({} transactions)", label, ids.join(","), e.tx_count);
}
