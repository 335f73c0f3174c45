/// Cold-start path: rebuild every in-memory structure from the block file.
///
/// Replay reads the file front to back in batches of `replay_batch` blocks and
/// ingests block `i` (1-based file position) under id `i`. The `number` field
/// stored inside the block plays no part.
use tracing::info;

use crate::{BlockStore, Result};

impl BlockStore {
    /// Drops all derived state and replays the file.
    pub(crate) fn restore(&mut self) -> Result<()> {
        self.indexes.clear();

        let indexes = &mut self.indexes;
        let mut id = 0u32;
        let stats = self
            .log
            .log()
            .replay(self.config.replay_batch, |block| -> Result<()> {
                id += 1;
                indexes.ingest(id, &block)
            })?;

        info!(
            path = %self.config.path.display(),
            blocks = stats.blocks,
            batches = stats.batches,
            "restored block store"
        );
        Ok(())
    }

    /// Flushes the buffer, then rebuilds all indexes from the file.
    ///
    /// The result is identical to the state before the call.
    pub fn rebuild(&mut self) -> Result<()> {
        self.flush()?;
        self.restore()
    }
}
