use super::*;
use block::{Payload, Transaction, ZERO_DIGEST};
use std::fs;
use std::io::Cursor;
use tempfile::tempdir;

// -------------------- Helpers --------------------

fn make_block(number: u32, nonce: u32, miner: u8) -> Block {
    let data = Payload::with_transactions(miner, &[Transaction::new(1, 2, number as u8)]);
    Block::new(number, nonce, data, ZERO_DIGEST, [number as u8; 32])
}

fn replay_all(log: &BlockLog, batch: usize) -> Result<(Vec<Block>, ReplayStats), LogError> {
    let mut blocks = Vec::new();
    let stats = log.replay(batch, |b| -> Result<(), LogError> {
        blocks.push(b);
        Ok(())
    })?;
    Ok((blocks, stats))
}

fn replay_from_bytes(data: &[u8], batch: usize) -> Result<(Vec<Block>, ReplayStats), LogError> {
    let mut reader = BlockReader::from_reader(Cursor::new(data.to_vec()));
    let mut blocks = Vec::new();
    let stats = reader.replay(batch, |b| -> Result<(), LogError> {
        blocks.push(b);
        Ok(())
    })?;
    Ok((blocks, stats))
}

// -------------------- Open --------------------

#[test]
fn open_creates_missing_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("chain.bin");

    let log = BlockLog::open(&path, false).unwrap();
    assert!(log.was_created());
    assert!(log.is_empty());
    assert!(path.exists());
    assert_eq!(fs::metadata(&path).unwrap().len(), 0);
}

#[test]
fn reopen_counts_existing_blocks() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("chain.bin");

    {
        let mut log = BlockLog::open(&path, true).unwrap();
        log.append_batch(&[make_block(1, 10, 1), make_block(2, 20, 2)])
            .unwrap();
    }

    let log = BlockLog::open(&path, false).unwrap();
    assert!(!log.was_created());
    assert_eq!(log.len(), 2);
}

#[test]
fn open_truncates_partial_tail() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("chain.bin");

    {
        let mut log = BlockLog::open(&path, true).unwrap();
        log.append_batch(&[make_block(1, 10, 1), make_block(2, 20, 2)])
            .unwrap();
    }

    // Crash mid-append: half a block at the end
    let mut data = fs::read(&path).unwrap();
    data.extend_from_slice(&[0xAB; BLOCK_SIZE / 2]);
    fs::write(&path, &data).unwrap();

    let mut log = BlockLog::open(&path, false).unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(fs::metadata(&path).unwrap().len(), 2 * BLOCK_SIZE as u64);

    // The next append lands right after block 2
    log.append_batch(&[make_block(3, 30, 3)]).unwrap();
    assert_eq!(log.read(3).unwrap(), make_block(3, 30, 3));
}

// -------------------- Append / read --------------------

#[test]
fn append_then_read_each_block() {
    let dir = tempdir().unwrap();
    let mut log = BlockLog::open(dir.path().join("chain.bin"), false).unwrap();

    let blocks: Vec<_> = (1..=5).map(|i| make_block(i, i * 100, i as u8)).collect();
    log.append_batch(&blocks).unwrap();

    assert_eq!(log.len(), 5);
    for (i, b) in blocks.iter().enumerate() {
        assert_eq!(&log.read(i as u32 + 1).unwrap(), b);
    }
}

#[test]
fn append_empty_batch_is_noop() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("chain.bin");
    let mut log = BlockLog::open(&path, false).unwrap();

    log.append_batch(&[]).unwrap();
    assert!(log.is_empty());
    assert_eq!(fs::metadata(&path).unwrap().len(), 0);
}

#[test]
fn file_length_is_multiple_of_block_size() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("chain.bin");
    let mut log = BlockLog::open(&path, false).unwrap();

    log.append_batch(&[make_block(1, 1, 1)]).unwrap();
    log.append_batch(&[make_block(2, 2, 2), make_block(3, 3, 3)])
        .unwrap();

    assert_eq!(fs::metadata(&path).unwrap().len(), 3 * BLOCK_SIZE as u64);
}

#[test]
fn read_out_of_range_is_not_found() {
    let dir = tempdir().unwrap();
    let mut log = BlockLog::open(dir.path().join("chain.bin"), false).unwrap();
    log.append_batch(&[make_block(1, 1, 1)]).unwrap();

    assert!(matches!(log.read(0), Err(LogError::NotFound { id: 0, len: 1 })));
    assert!(matches!(log.read(2), Err(LogError::NotFound { id: 2, len: 1 })));
}

#[test]
fn read_ignores_stored_number_field() {
    let dir = tempdir().unwrap();
    let mut log = BlockLog::open(dir.path().join("chain.bin"), false).unwrap();

    // Producer wrote a bogus number; position still decides the id
    let odd = make_block(999, 5, 5);
    log.append_batch(&[make_block(1, 1, 1), odd.clone()]).unwrap();
    assert_eq!(log.read(2).unwrap(), odd);
}

// -------------------- Replay --------------------

#[test]
fn replay_yields_blocks_in_file_order() {
    let dir = tempdir().unwrap();
    let mut log = BlockLog::open(dir.path().join("chain.bin"), false).unwrap();
    let blocks: Vec<_> = (1..=10).map(|i| make_block(i, i, i as u8)).collect();
    log.append_batch(&blocks).unwrap();

    let (replayed, stats) = replay_all(&log, 4).unwrap();
    assert_eq!(replayed, blocks);
    assert_eq!(stats.blocks, 10);
    assert_eq!(stats.batches, 3); // 4 + 4 + 2
    assert_eq!(stats.trailing_bytes, 0);
}

#[test]
fn replay_batch_larger_than_file() {
    let dir = tempdir().unwrap();
    let mut log = BlockLog::open(dir.path().join("chain.bin"), false).unwrap();
    log.append_batch(&[make_block(1, 1, 1), make_block(2, 2, 2)])
        .unwrap();

    let (replayed, stats) = replay_all(&log, DEFAULT_REPLAY_BATCH).unwrap();
    assert_eq!(replayed.len(), 2);
    assert_eq!(stats.batches, 1);
}

#[test]
fn replay_empty_log() {
    let dir = tempdir().unwrap();
    let log = BlockLog::open(dir.path().join("chain.bin"), false).unwrap();

    let (replayed, stats) = replay_all(&log, 16).unwrap();
    assert!(replayed.is_empty());
    assert_eq!(stats, ReplayStats::default());
}

#[test]
fn replay_can_run_twice() {
    let dir = tempdir().unwrap();
    let mut log = BlockLog::open(dir.path().join("chain.bin"), false).unwrap();
    log.append_batch(&[make_block(1, 1, 1), make_block(2, 2, 2)])
        .unwrap();

    let (first, _) = replay_all(&log, 1).unwrap();
    let (second, _) = replay_all(&log, 1).unwrap();
    assert_eq!(first, second);
}

#[test]
fn reader_ignores_partial_tail_in_memory() {
    let mut data = Vec::new();
    data.extend_from_slice(&make_block(1, 1, 1).encoded());
    data.extend_from_slice(&make_block(2, 2, 2).encoded());
    data.extend_from_slice(&[1, 2, 3, 4, 5]);

    let (blocks, stats) = replay_from_bytes(&data, 8).unwrap();
    assert_eq!(blocks.len(), 2);
    assert_eq!(stats.trailing_bytes, 5);
}

#[test]
fn reader_partial_tail_on_batch_boundary() {
    let mut data = Vec::new();
    data.extend_from_slice(&make_block(1, 1, 1).encoded());
    data.extend_from_slice(&make_block(2, 2, 2).encoded());
    data.extend_from_slice(&[9; 100]);

    let (blocks, stats) = replay_from_bytes(&data, 2).unwrap();
    assert_eq!(blocks.len(), 2);
    assert_eq!(stats.batches, 2);
    assert_eq!(stats.trailing_bytes, 100);
}

#[test]
fn reader_only_garbage() {
    let (blocks, stats) = replay_from_bytes(&[0u8; BLOCK_SIZE - 1], 4).unwrap();
    assert!(blocks.is_empty());
    assert_eq!(stats.trailing_bytes, (BLOCK_SIZE - 1) as u64);
}

#[test]
fn callback_error_stops_replay() {
    let mut data = Vec::new();
    for i in 1..=5 {
        data.extend_from_slice(&make_block(i, i, 0).encoded());
    }
    let mut reader = BlockReader::from_reader(Cursor::new(data));
    let mut seen = 0;
    let res = reader.replay(2, |_| {
        seen += 1;
        if seen == 3 {
            return Err(LogError::Full { blocks: 0 });
        }
        Ok(())
    });

    assert!(matches!(res, Err(LogError::Full { .. })));
    assert_eq!(seen, 3);
}

// -------------------- WriteBuffer --------------------

#[test]
fn write_buffer_reports_full() {
    let mut buf = WriteBuffer::new(2);
    assert!(!buf.push(make_block(1, 1, 1)));
    assert!(buf.push(make_block(2, 2, 2)));
    assert!(buf.is_full());
    assert_eq!(buf.get(1).unwrap().nonce, 2);

    buf.clear();
    assert!(buf.is_empty());
    assert_eq!(buf.capacity(), 2);
}

#[test]
fn write_buffer_zero_capacity_is_one() {
    let mut buf = WriteBuffer::new(0);
    assert_eq!(buf.capacity(), 1);
    assert!(buf.push(make_block(1, 1, 1)));
}

// -------------------- BufferedLog --------------------

#[test]
fn buffered_log_flushes_on_capacity() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("chain.bin");
    let mut log = BufferedLog::new(BlockLog::open(&path, false).unwrap(), 2);

    for i in 1..=5 {
        assert_eq!(log.push(make_block(i, i, 0)).unwrap(), i);
    }

    assert_eq!(log.flush_count(), 2);
    assert_eq!(log.flushed_len(), 4);
    assert_eq!(log.buffered_len(), 1);
    assert_eq!(log.len(), 5);
    assert_eq!(fs::metadata(&path).unwrap().len(), 4 * BLOCK_SIZE as u64);

    // Block 5 is only in memory
    assert_eq!(log.read(5).unwrap(), make_block(5, 5, 0));
    // Block 2 comes from disk
    assert_eq!(log.read(2).unwrap(), make_block(2, 2, 0));
}

#[test]
fn buffered_log_flush_is_idempotent() {
    let dir = tempdir().unwrap();
    let mut log = BufferedLog::new(BlockLog::open(dir.path().join("c.bin"), false).unwrap(), 16);

    log.push(make_block(1, 1, 1)).unwrap();
    log.flush().unwrap();
    log.flush().unwrap();

    assert_eq!(log.flush_count(), 1);
    assert_eq!(log.flushed_len(), 1);
    assert_eq!(log.buffered_len(), 0);
}

#[test]
fn buffered_log_read_out_of_range() {
    let dir = tempdir().unwrap();
    let mut log = BufferedLog::new(BlockLog::open(dir.path().join("c.bin"), false).unwrap(), 16);
    log.push(make_block(1, 1, 1)).unwrap();

    assert!(matches!(log.read(0), Err(LogError::NotFound { .. })));
    assert!(matches!(log.read(2), Err(LogError::NotFound { id: 2, len: 1 })));
}

#[test]
fn buffered_log_last_prefers_buffer() {
    let dir = tempdir().unwrap();
    let mut log = BufferedLog::new(BlockLog::open(dir.path().join("c.bin"), false).unwrap(), 2);
    assert!(log.last().unwrap().is_none());

    log.push(make_block(1, 1, 1)).unwrap();
    log.push(make_block(2, 2, 2)).unwrap(); // flushed
    assert_eq!(log.last().unwrap().unwrap().nonce, 2);

    log.push(make_block(3, 3, 3)).unwrap(); // buffered
    assert_eq!(log.last().unwrap().unwrap().nonce, 3);
}

#[cfg(target_os = "linux")]
#[test]
fn failed_batch_poisons_buffered_log() {
    let mut log = BufferedLog::new(BlockLog::open("/dev/full", false).unwrap(), 1);

    let err = log.push(make_block(1, 1, 1)).unwrap_err();
    assert!(matches!(err, LogError::Io(_)));
    assert!(log.is_poisoned());
    // The failed block is still staged, nothing reached the file
    assert_eq!(log.flushed_len(), 0);
    assert_eq!(log.buffered_len(), 1);

    assert!(matches!(log.push(make_block(2, 2, 2)), Err(LogError::Poisoned)));
    assert!(matches!(log.flush(), Err(LogError::Poisoned)));
    assert_eq!(log.buffered_len(), 1);
    assert_eq!(log.flush_count(), 0);
}

#[test]
fn poisoned_log_rejects_writes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("c.bin");
    let mut log = BufferedLog::new(BlockLog::open(&path, false).unwrap(), 16);
    log.push(make_block(1, 1, 1)).unwrap();

    log.poison();

    assert!(matches!(log.push(make_block(2, 2, 2)), Err(LogError::Poisoned)));
    assert!(matches!(log.flush(), Err(LogError::Poisoned)));
    assert_eq!(log.len(), 1);
    assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    // Reads keep working
    assert_eq!(log.read(1).unwrap(), make_block(1, 1, 1));
}
