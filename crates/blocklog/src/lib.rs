//! # BlockLog - Append-Only Block File
//!
//! Durable storage for the chain: a flat file of fixed-size [`Block`]
//! records, no header, no footer. Block `id` (1-based) lives at byte offset
//! `(id - 1) * BLOCK_SIZE`, so random access is a single seek + read.
//!
//! ## File Format
//!
//! ```text
//! [block 1: 256 bytes][block 2: 256 bytes] ... [block N: 256 bytes]
//! ```
//!
//! The file length is always a multiple of [`BLOCK_SIZE`]. A shorter trailing
//! chunk can only come from a crash in the middle of a batched append; it is
//! discarded (and the file truncated) when the log is opened.
//!
//! ## Write Path
//!
//! Writers stage blocks in a [`WriteBuffer`] and hand them over in batches
//! through [`BlockLog::append_batch`], which issues one `write_all` per
//! batch. [`BufferedLog`] combines both and serves reads transparently from
//! whichever side holds the block.
//!
//! ## Example
//!
//! ```rust,no_run
//! use block::{Block, Payload, ZERO_DIGEST};
//! use blocklog::BlockLog;
//!
//! let mut log = BlockLog::open("chain.bin", false).unwrap();
//! let block = Block::new(1, 7, Payload::origin("hi", 3), ZERO_DIGEST, ZERO_DIGEST);
//! log.append_batch(&[block.clone()]).unwrap();
//! assert_eq!(log.read(1).unwrap(), block);
//!
//! log.replay(1024, |b| -> Result<(), blocklog::LogError> {
//!     println!("{:?}", b);
//!     Ok(())
//! })
//! .unwrap();
//! ```

mod buffer;

pub use buffer::{BufferedLog, WriteBuffer, DEFAULT_BUFFER_CAPACITY};

use block::{Block, DecodeError, BLOCK_SIZE};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

/// Default number of blocks read per call during replay.
pub const DEFAULT_REPLAY_BATCH: usize = 1024;

/// Errors that can occur during block log operations.
#[derive(Debug, Error)]
pub enum LogError {
    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The requested id is outside `1..=len`, or the file returned a short read.
    #[error("block {id} not found (log holds {len} blocks)")]
    NotFound {
        /// Requested 1-based id.
        id: u32,
        /// Number of blocks in the log at the time of the read.
        len: u32,
    },

    /// A block could not be decoded.
    #[error("corrupt block: {0}")]
    Decode(#[from] DecodeError),

    /// The log would hold more blocks than a `u32` id can address.
    #[error("log full: {blocks} blocks exceed the u32 id space")]
    Full {
        /// Number of blocks the operation would have produced.
        blocks: u64,
    },

    /// An earlier batch write failed; the log accepts no further writes.
    #[error("log is unusable after a failed write")]
    Poisoned,
}

/// Counters reported by a replay pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Complete blocks handed to the callback.
    pub blocks: u64,
    /// Read calls that returned data.
    pub batches: u64,
    /// Bytes at the end of the stream that did not form a full block.
    pub trailing_bytes: u64,
}

/// Append-only file of fixed-size blocks.
///
/// Only full blocks are ever counted. The in-memory `len` is the number of
/// blocks durably handed to the file; it is the source of truth for range
/// checks on reads.
pub struct BlockLog {
    file: File,
    path: PathBuf,
    sync: bool,
    created: bool,
    len: u32,
    /// Reusable scratch buffer for batched writes.
    buf: Vec<u8>,
}

impl BlockLog {
    /// Opens an existing block file, or creates an empty one.
    ///
    /// # Arguments
    ///
    /// * `path` - file system path of the log.
    /// * `sync` - if true, every `append_batch` is followed by `fsync`.
    ///
    /// A trailing partial block (crash mid-append) is dropped and the file is
    /// truncated back to the last full block, so new appends land at the
    /// offsets their ids imply.
    pub fn open<P: AsRef<Path>>(path: P, sync: bool) -> Result<Self, LogError> {
        let path = path.as_ref().to_path_buf();

        let (file, created) = match OpenOptions::new().read(true).append(true).open(&path) {
            Ok(f) => (f, false),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let f = OpenOptions::new()
                    .create(true)
                    .read(true)
                    .append(true)
                    .open(&path)?;
                debug!(path = %path.display(), "created block log");
                (f, true)
            }
            Err(e) => return Err(e.into()),
        };

        let size = file.metadata()?.len();
        let tail = size % BLOCK_SIZE as u64;
        if tail != 0 {
            warn!(
                path = %path.display(),
                size,
                discarded = tail,
                "log length is not a multiple of block size, truncating"
            );
            file.set_len(size - tail)?;
            file.sync_all()?;
        }

        let blocks = (size - tail) / BLOCK_SIZE as u64;
        let len = u32::try_from(blocks).map_err(|_| LogError::Full { blocks })?;

        Ok(Self {
            file,
            path,
            sync,
            created,
            len,
            buf: Vec::with_capacity(BLOCK_SIZE * DEFAULT_BUFFER_CAPACITY),
        })
    }

    /// Number of full blocks in the file.
    #[must_use]
    pub fn len(&self) -> u32 {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether [`open`](Self::open) had to create the file.
    #[must_use]
    pub fn was_created(&self) -> bool {
        self.created
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `blocks` to the end of the file in a single write.
    ///
    /// An empty slice is a no-op.
    pub fn append_batch(&mut self, blocks: &[Block]) -> Result<(), LogError> {
        if blocks.is_empty() {
            return Ok(());
        }
        let new_len = u32::try_from(blocks.len())
            .ok()
            .and_then(|n| self.len.checked_add(n))
            .ok_or(LogError::Full {
                blocks: self.len as u64 + blocks.len() as u64,
            })?;

        // Reuse the scratch buffer, keep the allocation
        self.buf.clear();
        for block in blocks {
            self.buf.extend_from_slice(&block.encoded());
        }

        self.file.write_all(&self.buf)?;
        self.file.flush()?;
        if self.sync {
            self.file.sync_all()?;
        }

        self.len = new_len;
        debug!(blocks = blocks.len(), len = self.len, "appended batch");
        Ok(())
    }

    /// Reads block `id` with one positioned read.
    ///
    /// Returns [`LogError::NotFound`] if `id` is outside `1..=len` or the file
    /// is shorter than expected.
    pub fn read(&self, id: u32) -> Result<Block, LogError> {
        if id == 0 || id > self.len {
            return Err(LogError::NotFound { id, len: self.len });
        }
        let offset = (id as u64 - 1) * BLOCK_SIZE as u64;
        let mut buf = [0u8; BLOCK_SIZE];

        let mut f = &self.file;
        f.seek(SeekFrom::Start(offset))?;
        match f.read_exact(&mut buf) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Err(LogError::NotFound { id, len: self.len });
            }
            Err(e) => return Err(e.into()),
        }
        Ok(Block::decode(&buf)?)
    }

    /// Replays every block in file order, `batch` blocks per read call.
    ///
    /// The callback sees blocks in ascending position; position `i` (0-based)
    /// is block id `i + 1`.
    pub fn replay<F, E>(&self, batch: usize, apply: F) -> Result<ReplayStats, E>
    where
        F: FnMut(Block) -> Result<(), E>,
        E: From<LogError>,
    {
        let mut f = &self.file;
        f.seek(SeekFrom::Start(0)).map_err(LogError::from)?;
        let limit = self.len as u64 * BLOCK_SIZE as u64;
        BlockReader::from_reader(f.take(limit)).replay(batch, apply)
    }

    /// Forces file contents to disk.
    pub fn sync_to_disk(&mut self) -> Result<(), LogError> {
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }
}

impl std::fmt::Debug for BlockLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockLog")
            .field("path", &self.path)
            .field("len", &self.len)
            .field("sync", &self.sync)
            .finish()
    }
}

/// Sequential batched block reader.
///
/// Generic over any `Read` implementor so tests can replay in-memory buffers.
/// A trailing chunk shorter than one block is counted in
/// [`ReplayStats::trailing_bytes`] and otherwise ignored.
pub struct BlockReader<R: Read> {
    rdr: R,
}

impl BlockReader<File> {
    /// Opens an existing block file for sequential replay.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<BlockReader<File>, LogError> {
        Ok(BlockReader {
            rdr: File::open(path)?,
        })
    }
}

impl<R: Read> BlockReader<R> {
    pub fn from_reader(reader: R) -> Self {
        BlockReader { rdr: reader }
    }

    /// Calls `apply` for every complete block, reading `batch` blocks at a time.
    ///
    /// # Termination
    ///
    /// - **Clean EOF** -> `Ok(stats)`.
    /// - **Partial tail** -> `Ok(stats)` with `trailing_bytes > 0`.
    /// - **I/O error** -> `Err(LogError::Io)`.
    /// - **Callback error** -> returned as is, replay stops.
    pub fn replay<F, E>(&mut self, batch: usize, mut apply: F) -> Result<ReplayStats, E>
    where
        F: FnMut(Block) -> Result<(), E>,
        E: From<LogError>,
    {
        let mut buf = vec![0u8; batch.max(1) * BLOCK_SIZE];
        let mut stats = ReplayStats::default();

        loop {
            let filled = fill(&mut self.rdr, &mut buf).map_err(LogError::from)?;
            if filled == 0 {
                break;
            }
            stats.batches += 1;

            let whole = filled - filled % BLOCK_SIZE;
            for chunk in buf[..whole].chunks_exact(BLOCK_SIZE) {
                apply(Block::decode(chunk).map_err(LogError::from)?)?;
                stats.blocks += 1;
            }
            debug!(batch = stats.batches, blocks = whole / BLOCK_SIZE, "replayed batch");

            if filled < buf.len() {
                stats.trailing_bytes = (filled - whole) as u64;
                break;
            }
        }

        Ok(stats)
    }
}

/// Reads until `buf` is full or the reader is exhausted.
fn fill<R: Read>(r: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests;
