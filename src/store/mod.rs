// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Durable storage of normalized transfer events
//!
//! An [`EventStore`] holds the canonical event log for one (chain, token) pair and
//! remembers which blocks it has fully covered, so ingestion can resume where it
//! stopped:
//!
//! - [`MemoryEventStore`]: In-memory log for tests and ephemeral runs
//! - [`FileEventStore`]: JSON Lines log with a versioned metadata sidecar
//!
//! # Examples
//!
//! ```rust,ignore
//! use holdscan::{EventStore, FileEventStore, StoreKey};
//!
//! let store = FileEventStore::open("data/events_mainnet.jsonl", key).await?;
//!
//! let resume_from = store
//!     .highest_stored_block()
//!     .await
//!     .map_or(deployment_block, |covered| covered + 1);
//!
//! store.commit_window(window, fetched).await?;
//! let events = store.read_range(deployment_block, window.end()).await?;
//! ```

use std::collections::HashMap;
use std::fmt;

use alloy_chains::NamedChain;
use alloy_primitives::{Address, BlockNumber};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::{NormalizationError, StoreError};
use crate::normalize::normalize;
use crate::{BlockRange, EventKey, TransferEvent};

pub(crate) mod file;
mod memory;

pub use file::FileEventStore;
pub use memory::MemoryEventStore;

/// The (chain, token) pair an event store holds events for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoreKey {
    pub chain: NamedChain,
    pub token: Address,
}

impl StoreKey {
    pub fn new(chain: NamedChain, token: Address) -> Self {
        Self { chain, token }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chain, self.token)
    }
}

/// Trait for transfer event log backends
///
/// Implementations keep events in canonical order and never hold two events with the
/// same identity. Stored events are never rewritten.
///
/// # Thread Safety
///
/// Implementations must be safe to share between tasks. Use interior mutability
/// (e.g. `tokio::sync::Mutex`) so that writes are serialized.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Adds events to the log, returning how many were new
    ///
    /// Events already stored with an identical payload are skipped, so re-appending a
    /// window is a no-op.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Integrity`] if an event conflicts with a stored event or with
    ///   another event in the batch
    /// - [`StoreError::ResumeMismatch`] if a new event does not order strictly after
    ///   every stored event, or falls in an already covered block
    /// - [`StoreError::Io`] if the backend cannot persist the batch
    async fn append(&self, events: Vec<TransferEvent>) -> Result<usize, StoreError>;

    /// Events with `from_block <= block_number <= to_block`, in canonical order
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidInput`] when `from_block > to_block`.
    async fn read_range(
        &self,
        from_block: BlockNumber,
        to_block: BlockNumber,
    ) -> Result<Vec<TransferEvent>, StoreError>;

    /// Blocks known to be fully ingested, if any
    ///
    /// Coverage is one contiguous range. It starts where the first committed window
    /// started, which may be before the first stored event.
    async fn coverage(&self) -> Option<BlockRange>;

    /// Last block known to be fully ingested, if any
    ///
    /// This is the recorded coverage, not the block of the last stored event: a
    /// window without transfers still advances it.
    async fn highest_stored_block(&self) -> Option<BlockNumber> {
        self.coverage().await.map(|covered| covered.end())
    }

    /// Records that every event up to and including `through` has been stored
    ///
    /// Coverage only moves forward; marking an already covered block does nothing.
    /// When nothing is covered yet, coverage starts at the first stored event (or at
    /// `through` for an empty store).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidInput`] if `through` is below the last stored
    /// event.
    async fn mark_covered(&self, through: BlockNumber) -> Result<(), StoreError>;

    /// Records that every event in `range` has been stored
    ///
    /// Like [`mark_covered`](Self::mark_covered), except that a first window fixes
    /// the start of coverage at `range.start()`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidInput`] if an event is stored past `range`, or,
    /// when nothing is covered yet, before it.
    async fn mark_window_covered(&self, range: BlockRange) -> Result<(), StoreError>;

    /// Number of stored events
    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// The (chain, token) pair this store belongs to
    fn key(&self) -> StoreKey;

    /// Returns the name of this backend (for logging)
    fn name(&self) -> &'static str;

    /// Persists one fully fetched ingestion window
    ///
    /// Normalizes `events`, checks they all lie in `range`, checks `range` starts
    /// right after the current coverage (any start is accepted while nothing is
    /// covered yet), appends, then marks `range` covered. Returns how many events
    /// were new.
    ///
    /// A window that lies entirely inside the coverage is checked against the
    /// stored events instead: identical events commit nothing and return 0.
    ///
    /// # Errors
    ///
    /// - [`StoreError::ResumeMismatch`] if `range` leaves a gap after the coverage,
    ///   partly overlaps it, or re-commits a covered window with different events
    /// - [`StoreError::InvalidInput`] if an event lies outside `range`
    /// - any error from [`append`](Self::append) or
    ///   [`mark_window_covered`](Self::mark_window_covered)
    async fn commit_window(
        &self,
        range: BlockRange,
        events: Vec<TransferEvent>,
    ) -> Result<usize, StoreError> {
        let events = normalize(events)?;
        if let Some(outside) = events.iter().find(|e| !range.contains(e.block_number)) {
            return Err(StoreError::invalid_input(format!(
                "event {outside} lies outside window {range}"
            )));
        }

        if let Some(covered) = self.coverage().await {
            if covered.contains(range.start()) && covered.contains(range.end()) {
                // Conflicting payloads and new events in covered blocks fail here
                self.append(events.clone()).await?;
                let stored = self.read_range(range.start(), range.end()).await?;
                if stored != events {
                    return Err(StoreError::resume_mismatch(
                        range,
                        Some(covered.end()),
                        format!(
                            "covered window re-fetched with {} events, store holds {}",
                            events.len(),
                            stored.len()
                        ),
                    ));
                }
                return Ok(0);
            }

            if covered.end().checked_add(1) != Some(range.start()) {
                return Err(StoreError::resume_mismatch(
                    range,
                    Some(covered.end()),
                    format!(
                        "window must start at block {}",
                        covered.end().saturating_add(1)
                    ),
                ));
            }
        }

        let added = self.append(events).await?;
        self.mark_window_covered(range).await?;
        Ok(added)
    }
}

/// Canonical event log plus coverage, shared by the store backends
#[derive(Debug, Default)]
pub(crate) struct StoredEvents {
    events: Vec<TransferEvent>,
    index: HashMap<EventKey, usize>,
    covered: Option<BlockRange>,
}

impl StoredEvents {
    /// Wraps an already verified canonical log
    pub(crate) fn from_canonical(events: Vec<TransferEvent>, covered: Option<BlockRange>) -> Self {
        let index = events
            .iter()
            .enumerate()
            .map(|(idx, event)| (event.key(), idx))
            .collect();
        Self {
            events,
            index,
            covered,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.events.len()
    }

    pub(crate) fn coverage(&self) -> Option<BlockRange> {
        self.covered
    }

    pub(crate) fn covered_through(&self) -> Option<BlockNumber> {
        self.covered.map(|covered| covered.end())
    }

    pub(crate) fn first_event_block(&self) -> Option<BlockNumber> {
        self.events.first().map(|event| event.block_number)
    }

    pub(crate) fn last_event_block(&self) -> Option<BlockNumber> {
        self.events.last().map(|event| event.block_number)
    }

    /// Filters `batch` down to the events not stored yet
    ///
    /// Nothing is modified; the caller persists the result and then calls
    /// [`extend`](Self::extend).
    pub(crate) fn plan_append(
        &self,
        batch: Vec<TransferEvent>,
    ) -> Result<Vec<TransferEvent>, StoreError> {
        let batch = normalize(batch)?;
        let mut fresh = Vec::with_capacity(batch.len());

        for event in batch {
            if let Some(&idx) = self.index.get(&event.key()) {
                let stored = &self.events[idx];
                if *stored != event {
                    return Err(NormalizationError::conflicting_duplicate(stored, &event).into());
                }
                continue;
            }

            if let Some(tail) = self.events.last() {
                if event.order_key() <= tail.order_key() {
                    return Err(StoreError::resume_mismatch(
                        BlockRange::single(event.block_number),
                        self.covered_through(),
                        format!("new event {event} does not follow stored tail {tail}"),
                    ));
                }
            }
            if let Some(covered) = self.covered_through() {
                if event.block_number <= covered {
                    return Err(StoreError::resume_mismatch(
                        BlockRange::single(event.block_number),
                        Some(covered),
                        format!("new event {event} falls in an already covered block"),
                    ));
                }
            }

            fresh.push(event);
        }

        Ok(fresh)
    }

    /// Appends events returned by [`plan_append`](Self::plan_append)
    pub(crate) fn extend(&mut self, fresh: Vec<TransferEvent>) {
        for event in fresh {
            self.index.insert(event.key(), self.events.len());
            self.events.push(event);
        }
    }

    pub(crate) fn range(
        &self,
        from_block: BlockNumber,
        to_block: BlockNumber,
    ) -> Result<Vec<TransferEvent>, StoreError> {
        if from_block > to_block {
            return Err(StoreError::invalid_input(format!(
                "read range {from_block}-{to_block} is inverted"
            )));
        }

        let start = self
            .events
            .partition_point(|event| event.block_number < from_block);
        let end = self
            .events
            .partition_point(|event| event.block_number <= to_block);
        Ok(self.events[start..end].to_vec())
    }

    /// Coverage after recording blocks up to `through`, or `None` if nothing changes
    ///
    /// `start` only matters while nothing is covered: it fixes where coverage
    /// begins, and no stored event may precede it. Without it, coverage begins at
    /// the first stored event.
    pub(crate) fn plan_coverage(
        &self,
        start: Option<BlockNumber>,
        through: BlockNumber,
    ) -> Result<Option<BlockRange>, StoreError> {
        if let Some(last) = self.last_event_block() {
            if through < last {
                return Err(StoreError::invalid_input(format!(
                    "cannot mark coverage through block {through}: events stored up to block {last}"
                )));
            }
        }

        if let Some(covered) = self.covered {
            if through <= covered.end() {
                return Ok(None);
            }
            return Ok(BlockRange::new(covered.start(), through));
        }

        let first = self.first_event_block();
        let start = match start {
            Some(start) => {
                if let Some(first) = first.filter(|&first| first < start) {
                    return Err(StoreError::invalid_input(format!(
                        "cannot start coverage at block {start}: events stored from block {first}"
                    )));
                }
                start
            }
            None => first.map_or(through, |first| first.min(through)),
        };

        BlockRange::new(start, through).map(Some).ok_or_else(|| {
            StoreError::invalid_input(format!(
                "coverage start {start} is past block {through}"
            ))
        })
    }

    pub(crate) fn set_coverage(&mut self, covered: BlockRange) {
        self.covered = Some(covered);
    }
}
