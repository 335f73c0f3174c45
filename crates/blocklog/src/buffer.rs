//! Write staging: a fixed-capacity buffer of not-yet-written blocks and the
//! [`BufferedLog`] that merges it with the on-disk [`BlockLog`].

use block::Block;
use tracing::{debug, warn};

use crate::{BlockLog, LogError};

/// Default number of blocks staged before a batched write.
pub const DEFAULT_BUFFER_CAPACITY: usize = 16;

/// Fixed-capacity staging area for the most recent blocks.
#[derive(Debug, Clone)]
pub struct WriteBuffer {
    blocks: Vec<Block>,
    capacity: usize,
}

impl WriteBuffer {
    /// Creates an empty buffer. A capacity of 0 is raised to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            blocks: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Stages `block`, returning `true` once the buffer is full.
    pub fn push(&mut self, block: Block) -> bool {
        debug_assert!(!self.is_full(), "push into a full write buffer");
        self.blocks.push(block);
        self.is_full()
    }

    /// Block at `offset` from the oldest staged block.
    pub fn get(&self, offset: usize) -> Option<&Block> {
        self.blocks.get(offset)
    }

    pub fn last(&self) -> Option<&Block> {
        self.blocks.last()
    }

    pub fn as_slice(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.blocks.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drops all staged blocks (keeps the allocation).
    pub fn clear(&mut self) {
        self.blocks.clear();
    }
}

/// Logical block store: the durable log plus its unflushed tail.
///
/// Ids `1..=flushed_len()` live on disk, ids above that live in the buffer.
/// [`read`](Self::read) hides the split from callers.
///
/// # Invariant
///
/// `len() == flushed_len() + buffered_len()` at all times.
///
/// A failed batch write poisons the log: the staged blocks stay where they
/// are, and every later `push` or `flush` returns [`LogError::Poisoned`]
/// without touching the file again.
#[derive(Debug)]
pub struct BufferedLog {
    log: BlockLog,
    buffer: WriteBuffer,
    flushes: u64,
    poisoned: bool,
}

impl BufferedLog {
    pub fn new(log: BlockLog, capacity: usize) -> Self {
        Self {
            log,
            buffer: WriteBuffer::new(capacity),
            flushes: 0,
            poisoned: false,
        }
    }

    /// Stages `block` under the next id and returns that id.
    ///
    /// Triggers a [`flush`](Self::flush) when the buffer reaches capacity; this
    /// is the only point where `push` touches the disk.
    pub fn push(&mut self, block: Block) -> Result<u32, LogError> {
        if self.poisoned {
            return Err(LogError::Poisoned);
        }
        let id = self
            .len()
            .checked_add(1)
            .ok_or(LogError::Full {
                blocks: self.len() as u64 + 1,
            })?;
        if self.buffer.push(block) {
            self.flush()?;
        }
        Ok(id)
    }

    /// Writes every staged block in one batch and empties the buffer.
    ///
    /// No-op when nothing is staged. A write error poisons the log.
    pub fn flush(&mut self) -> Result<(), LogError> {
        if self.poisoned {
            return Err(LogError::Poisoned);
        }
        if self.buffer.is_empty() {
            return Ok(());
        }
        if let Err(e) = self.log.append_batch(self.buffer.as_slice()) {
            self.poisoned = true;
            warn!(
                blocks = self.buffer.len(),
                error = %e,
                "batch write failed, log poisoned"
            );
            return Err(e);
        }
        debug!(
            blocks = self.buffer.len(),
            flushed = self.log.len(),
            "flushed write buffer"
        );
        self.buffer.clear();
        self.flushes += 1;
        Ok(())
    }

    /// Reads block `id`, from the buffer if it is not on disk yet.
    pub fn read(&self, id: u32) -> Result<Block, LogError> {
        let len = self.len();
        if id == 0 || id > len {
            return Err(LogError::NotFound { id, len });
        }
        let flushed = self.log.len();
        if id > flushed {
            let offset = (id - flushed - 1) as usize;
            return self
                .buffer
                .get(offset)
                .cloned()
                .ok_or(LogError::NotFound { id, len });
        }
        self.log.read(id)
    }

    /// Most recent block, if any.
    pub fn last(&self) -> Result<Option<Block>, LogError> {
        if let Some(block) = self.buffer.last() {
            return Ok(Some(block.clone()));
        }
        match self.log.len() {
            0 => Ok(None),
            n => self.log.read(n).map(Some),
        }
    }

    /// Total blocks: flushed plus buffered.
    #[must_use]
    pub fn len(&self) -> u32 {
        self.log.len() + self.buffer.len() as u32
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn flushed_len(&self) -> u32 {
        self.log.len()
    }

    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Number of batched writes performed since construction.
    #[must_use]
    pub fn flush_count(&self) -> u64 {
        self.flushes
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Whether a failed write has disabled this log.
    #[must_use]
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Refuses all further writes, e.g. after in-memory state derived from
    /// the staged blocks went out of sync.
    pub fn poison(&mut self) {
        self.poisoned = true;
    }

    /// The underlying on-disk log.
    pub fn log(&self) -> &BlockLog {
        &self.log
    }
}
