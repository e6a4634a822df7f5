//! Fixed-size block partitioning for file payloads.

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Default maximum block size (4 MiB).
pub const DEFAULT_BLOCK_SIZE: u32 = 4 * 1024 * 1024;

/// Partitioning parameters shared by the client and the commit validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockLayout {
    pub block_size: u32,
}

impl Default for BlockLayout {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

impl BlockLayout {
    pub fn new(block_size: u32) -> Self {
        Self { block_size }
    }

    /// Number of blocks a payload of `size` bytes occupies. An empty payload
    /// still occupies one (empty) block.
    #[inline]
    pub fn block_count(&self, size: u64) -> u64 {
        if size == 0 {
            1
        } else {
            size.div_ceil(self.block_size as u64)
        }
    }

    /// Byte ranges of each block of a `len`-byte payload, in order. The last
    /// range may be shorter; an empty payload yields one empty range.
    pub fn split_ranges(&self, len: usize) -> Vec<Range<usize>> {
        if len == 0 {
            return vec![0..0];
        }
        let block_size = self.block_size as usize;
        (0..len)
            .step_by(block_size)
            .map(|start| start..usize::min(start + block_size, len))
            .collect()
    }
}
