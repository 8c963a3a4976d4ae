//! Block discovery for range reads
//!
//! Descends the partition tree level by level. A partition directory holds
//! only blocks whose `block_start` falls inside its calendar window, so any
//! subtree whose window starts after the query end is skipped. Windows that
//! end before the query start are still visited, because a block may run
//! past the end of the partition it starts in.

use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{BlockStore, BlockStoreError};
use crate::format::{parse_block_file_name, BlockName};
use crate::partition::{parse_component, window_start_micros};

impl BlockStore {
    /// Paths of every block overlapping `[start, end]`
    ///
    /// A block overlaps iff `block_end >= start && block_start <= end`.
    /// Results are ordered by `(block_start, block_end, sequence)`, then path.
    /// For blocks without a sequence suffix this is plain path order.
    /// Temporary and unrelated files are ignored. A missing root yields an
    /// empty list.
    pub fn find_blocks(&self, start: i64, end: i64) -> Result<Vec<PathBuf>, BlockStoreError> {
        let mut found = Vec::new();
        if start > end {
            return Ok(Vec::new());
        }
        let mut prefix = Vec::with_capacity(self.layout.depth().get());
        self.descend(&self.root, &mut prefix, start, end, &mut found)?;
        found.sort();
        debug!(target: "pancarte::block_store", start, end, blocks = found.len(), "Blocks discovered");
        Ok(found.into_iter().map(|(_, path)| path).collect())
    }

    fn descend(
        &self,
        dir: &Path,
        prefix: &mut Vec<u32>,
        start: i64,
        end: i64,
        found: &mut Vec<(BlockName, PathBuf)>,
    ) -> Result<(), BlockStoreError> {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(BlockStoreError::io(dir, e)),
        };
        let level = prefix.len();
        let at_leaf = level == self.layout.depth().get();

        for entry in entries {
            let entry = entry.map_err(|e| BlockStoreError::io(dir, e))?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with('.') {
                continue;
            }
            let is_dir = entry
                .file_type()
                .map_err(|e| BlockStoreError::io(entry.path(), e))?
                .is_dir();

            if at_leaf {
                if is_dir {
                    continue;
                }
                if let Some(block) = parse_block_file_name(&name) {
                    if block.end >= start && block.start <= end {
                        found.push((block, entry.path()));
                    }
                }
                continue;
            }

            if !is_dir {
                continue;
            }
            let Some(value) = parse_component(level, &name) else {
                continue;
            };
            prefix.push(value);
            let in_range = window_start_micros(prefix).map_or(false, |window| window <= end);
            if in_range {
                self.descend(&entry.path(), prefix, start, end, found)?;
            }
            prefix.pop();
        }

        Ok(())
    }
}
