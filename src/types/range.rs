// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Block range types
//!
//! [`BlockRange`] is an inclusive `[start, end]` window of blocks. [`MaxBlockRange`]
//! caps how many blocks a single RPC `eth_getLogs` call or ingestion window may span
//! and splits larger ranges into chunks.

use std::fmt;

use alloy_primitives::BlockNumber;
use serde::{Deserialize, Serialize};

/// Inclusive range of blocks
///
/// # Examples
///
/// ```
/// use holdscan::BlockRange;
///
/// let range = BlockRange::new(100, 199).unwrap();
/// assert_eq!(range.len(), 100);
/// assert!(range.contains(150));
/// assert!(BlockRange::new(200, 100).is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockRange {
    start: BlockNumber,
    end: BlockNumber,
}

impl BlockRange {
    /// Returns `None` when `end < start`
    pub fn new(start: BlockNumber, end: BlockNumber) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// A range covering exactly one block
    pub const fn single(block: BlockNumber) -> Self {
        Self {
            start: block,
            end: block,
        }
    }

    pub const fn start(&self) -> BlockNumber {
        self.start
    }

    pub const fn end(&self) -> BlockNumber {
        self.end
    }

    /// Number of blocks in the range (always at least one)
    ///
    /// Saturates at `u64::MAX` for the full `0..=u64::MAX` range.
    pub const fn len(&self) -> u64 {
        (self.end - self.start).saturating_add(1)
    }

    pub const fn contains(&self, block: BlockNumber) -> bool {
        self.start <= block && block <= self.end
    }
}

impl fmt::Display for BlockRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Maximum block range for RPC queries and ingestion windows
///
/// This prevents overloading RPC nodes with queries that are too large.
/// Different chains have different limits based on their RPC infrastructure.
///
/// # Examples
///
/// ```
/// use holdscan::MaxBlockRange;
///
/// let conservative = MaxBlockRange::DEFAULT;
/// assert_eq!(conservative.as_u64(), 2000);
///
/// let generous = MaxBlockRange::GENEROUS;
/// assert_eq!(generous.as_u64(), 10000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "u64", into = "u64")]
pub struct MaxBlockRange(u64);

impl MaxBlockRange {
    /// Conservative default (works on most chains)
    pub const DEFAULT: Self = Self(2000);

    /// Moderate range for chains with good RPC support
    pub const MODERATE: Self = Self(5000);

    /// For chains with generous RPC limits (e.g., Base)
    pub const GENEROUS: Self = Self(10000);

    /// Very conservative for rate-limited RPCs
    pub const CONSERVATIVE: Self = Self(1000);

    /// Create a new max block range
    ///
    /// Zero is treated as one block per chunk.
    pub const fn new(blocks: u64) -> Self {
        if blocks == 0 {
            Self(1)
        } else {
            Self(blocks)
        }
    }

    /// Get the inner u64 value
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Calculate number of chunks needed to cover a range
    ///
    /// # Examples
    ///
    /// ```
    /// use holdscan::{BlockRange, MaxBlockRange};
    ///
    /// let range = MaxBlockRange::new(1000);
    /// let chunks = range.chunks_needed(BlockRange::new(0, 2500).unwrap());
    /// assert_eq!(chunks, 3); // 0-999, 1000-1999, 2000-2500
    /// ```
    pub fn chunks_needed(&self, range: BlockRange) -> usize {
        range.len().div_ceil(self.0) as usize
    }

    /// Split a block range into chunks of at most `self` blocks each
    ///
    /// # Examples
    ///
    /// ```
    /// use holdscan::{BlockRange, MaxBlockRange};
    ///
    /// let range = MaxBlockRange::new(1000);
    /// let chunks: Vec<_> = range.chunk_range(BlockRange::new(0, 2500).unwrap()).collect();
    ///
    /// assert_eq!(chunks.len(), 3);
    /// assert_eq!(chunks[0], BlockRange::new(0, 999).unwrap());
    /// assert_eq!(chunks[2], BlockRange::new(2000, 2500).unwrap());
    /// ```
    pub fn chunk_range(&self, range: BlockRange) -> ChunkIterator {
        ChunkIterator {
            next_start: Some(range.start),
            end: range.end,
            chunk_size: self.0,
        }
    }
}

impl Default for MaxBlockRange {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<u64> for MaxBlockRange {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl From<MaxBlockRange> for u64 {
    fn from(value: MaxBlockRange) -> Self {
        value.0
    }
}

impl fmt::Display for MaxBlockRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} blocks", self.0)
    }
}

/// Iterator over block range chunks
///
/// Created by [`MaxBlockRange::chunk_range`].
#[derive(Debug, Clone)]
pub struct ChunkIterator {
    next_start: Option<BlockNumber>,
    end: BlockNumber,
    chunk_size: u64,
}

impl Iterator for ChunkIterator {
    type Item = BlockRange;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.next_start?;
        if start > self.end {
            self.next_start = None;
            return None;
        }

        let end = start.saturating_add(self.chunk_size - 1).min(self.end);
        // `end == u64::MAX` would overflow the next start
        self.next_start = end.checked_add(1);

        Some(BlockRange { start, end })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.next_start {
            Some(start) if start <= self.end => {
                let remaining = (self.end - start).saturating_add(1);
                let chunks = remaining.div_ceil(self.chunk_size) as usize;
                (chunks, Some(chunks))
            }
            _ => (0, Some(0)),
        }
    }
}

impl ExactSizeIterator for ChunkIterator {}
