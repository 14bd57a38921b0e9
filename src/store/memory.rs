// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! In-memory event store

use alloy_primitives::BlockNumber;
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::{EventStore, StoreKey, StoredEvents};
use crate::errors::StoreError;
use crate::{BlockRange, TransferEvent};

/// Event store that lives only as long as the process
///
/// Same semantics as [`FileEventStore`](super::FileEventStore) without
/// persistence. Useful for tests and one-off ledger builds.
///
/// # Examples
///
/// ```rust,ignore
/// use holdscan::{EventStore, MemoryEventStore, StoreKey};
///
/// let store = MemoryEventStore::new(StoreKey::new(NamedChain::Gnosis, token));
/// store.commit_window(window, events).await?;
/// ```
#[derive(Debug)]
pub struct MemoryEventStore {
    key: StoreKey,
    state: Mutex<StoredEvents>,
}

impl MemoryEventStore {
    pub fn new(key: StoreKey) -> Self {
        Self {
            key,
            state: Mutex::new(StoredEvents::default()),
        }
    }

    async fn record_coverage(
        &self,
        start: Option<BlockNumber>,
        through: BlockNumber,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if let Some(covered) = state.plan_coverage(start, through)? {
            state.set_coverage(covered);
        }
        Ok(())
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn append(&self, events: Vec<TransferEvent>) -> Result<usize, StoreError> {
        let mut state = self.state.lock().await;
        let fresh = state.plan_append(events)?;
        let added = fresh.len();
        state.extend(fresh);

        debug!(store = %self.key, added, total = state.len(), "Appended events (memory)");
        Ok(added)
    }

    async fn read_range(
        &self,
        from_block: BlockNumber,
        to_block: BlockNumber,
    ) -> Result<Vec<TransferEvent>, StoreError> {
        self.state.lock().await.range(from_block, to_block)
    }

    async fn coverage(&self) -> Option<BlockRange> {
        self.state.lock().await.coverage()
    }

    async fn mark_covered(&self, through: BlockNumber) -> Result<(), StoreError> {
        self.record_coverage(None, through).await
    }

    async fn mark_window_covered(&self, range: BlockRange) -> Result<(), StoreError> {
        self.record_coverage(Some(range.start()), range.end()).await
    }

    async fn len(&self) -> usize {
        self.state.lock().await.len()
    }

    fn key(&self) -> StoreKey {
        self.key
    }

    fn name(&self) -> &'static str {
        "MemoryEventStore"
    }
}
