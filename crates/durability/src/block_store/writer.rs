//! Crash-safe block writes
//!
//! Blocks use the write-fsync-link pattern:
//! 1. Write to a dot-prefixed temporary file next to the final path
//! 2. fsync the temporary file
//! 3. Hard-link it to `<start>-<end>[-<seq>].v1.pblk`, which fails if the
//!    name is taken, then remove the temporary name
//! 4. fsync the partition directory
//!
//! Either the complete block exists or it doesn't, and an existing block is
//! never replaced.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use pancarte_core::{Generation, RecordKind};
use tracing::{debug, info, warn};

use super::{BlockInfo, BlockStore, BlockStoreError};
use crate::format::{encode_block, temp_file_name, BlockName, BLOCK_EXTENSION, MAX_BLOCK_SEQUENCE};

impl BlockStore {
    /// Persist a generation as one block
    ///
    /// When a block with the same span already exists, the next free
    /// sequence number is used. Fails with [`BlockStoreError::Duplicate`]
    /// only once every sequence number for the span is taken.
    pub fn write_block(&self, generation: &Generation) -> Result<BlockInfo, BlockStoreError> {
        let (block_start, block_end) = generation.span().ok_or(BlockStoreError::EmptyGeneration)?;

        let dir = self.path_for(block_start)?;
        std::fs::create_dir_all(&dir).map_err(|e| BlockStoreError::io(&dir, e))?;

        let bytes = encode_block(generation, self.codec.as_ref()).map_err(BlockStoreError::Encode)?;
        let crc = footer_crc(&bytes);

        let base = BlockName::new(block_start, block_end);
        for sequence in 0..=MAX_BLOCK_SEQUENCE {
            let name = base.with_sequence(sequence).file_name();
            if dir.join(&name).exists() {
                continue;
            }
            let Some(path) = write_new(&dir, &name, &bytes)? else {
                continue;
            };
            sync_dir(&dir)?;

            if sequence > 0 {
                debug!(
                    target: "pancarte::block_store",
                    block_start,
                    block_end,
                    sequence,
                    "Span already taken; sequenced name used"
                );
            }
            let info = BlockInfo {
                path,
                block_start,
                block_end,
                sequence,
                lf_count: generation.kind_len(RecordKind::Lf),
                hf_count: generation.kind_len(RecordKind::Hf),
                number_of_values: generation.number_of_values(),
                size_bytes: bytes.len() as u64,
                crc,
            };
            info!(
                target: "pancarte::block_store",
                path = %info.path.display(),
                block_start,
                block_end,
                lf = info.lf_count,
                hf = info.hf_count,
                bytes = info.size_bytes,
                "Block written"
            );
            return Ok(info);
        }

        Err(BlockStoreError::Duplicate {
            path: dir.join(base.with_sequence(MAX_BLOCK_SEQUENCE).file_name()),
        })
    }

    /// Remove temporary block files left behind by a crash
    ///
    /// Walks the whole tree; returns how many files were removed.
    pub fn cleanup_temp_files(&self) -> Result<usize, BlockStoreError> {
        if !self.root.exists() {
            return Ok(0);
        }
        let mut count = 0;
        let mut stack: Vec<PathBuf> = vec![self.root.clone()];

        while let Some(dir) = stack.pop() {
            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(BlockStoreError::io(&dir, e)),
            };
            for entry in entries {
                let entry = entry.map_err(|e| BlockStoreError::io(&dir, e))?;
                let path = entry.path();
                let file_type = entry.file_type().map_err(|e| BlockStoreError::io(&path, e))?;
                if file_type.is_dir() {
                    stack.push(path);
                    continue;
                }
                if is_temp_block_name(&entry.file_name().to_string_lossy()) {
                    std::fs::remove_file(&path).map_err(|e| BlockStoreError::io(&path, e))?;
                    warn!(target: "pancarte::block_store", path = %path.display(), "Removed orphaned temporary block");
                    count += 1;
                }
            }
        }

        Ok(count)
    }
}

fn is_temp_block_name(name: &str) -> bool {
    name.starts_with('.') && name.ends_with(&format!("{}.tmp", BLOCK_EXTENSION))
}

/// Write `bytes` under `name` in `dir` without replacing anything
///
/// Returns `Ok(None)` when the name is taken, either by a finished block or
/// by a temporary file another writer is still filling.
fn write_new(dir: &Path, name: &str, bytes: &[u8]) -> Result<Option<PathBuf>, BlockStoreError> {
    let temp_path = dir.join(temp_file_name(name));
    let final_path = dir.join(name);

    let mut file = match OpenOptions::new().create_new(true).write(true).open(&temp_path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(None),
        Err(e) => return Err(BlockStoreError::io(&temp_path, e)),
    };
    let result = file
        .write_all(bytes)
        .and_then(|_| file.sync_all())
        .map_err(|e| BlockStoreError::io(&temp_path, e));
    drop(file);
    if let Err(e) = result {
        remove_temp(&temp_path);
        return Err(e);
    }

    let linked = std::fs::hard_link(&temp_path, &final_path);
    remove_temp(&temp_path);
    match linked {
        Ok(()) => Ok(Some(final_path)),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(None),
        Err(e) => Err(BlockStoreError::io(&final_path, e)),
    }
}

fn footer_crc(bytes: &[u8]) -> u32 {
    let tail = &bytes[bytes.len().saturating_sub(4)..];
    u32::from_le_bytes([tail[0], tail[1], tail[2], tail[3]])
}

fn remove_temp(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        warn!(target: "pancarte::block_store", path = %path.display(), error = %e, "Failed to remove temporary block");
    }
}

fn sync_dir(dir: &Path) -> Result<(), BlockStoreError> {
    let handle = File::open(dir).map_err(|e| BlockStoreError::io(dir, e))?;
    handle.sync_all().map_err(|e| BlockStoreError::io(dir, e))
}
