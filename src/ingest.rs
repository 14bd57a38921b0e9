// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Resumable ingestion of transfer events into an event store
//!
//! The [`Ingestor`] picks up where the store's coverage ends, splits the remaining
//! blocks into windows, fetches up to `max_concurrent_windows` of them at once and
//! commits them strictly in block order. A window is committed only once it has
//! been fetched completely, so a failure never leaves a gap: the next run resumes
//! right after the last committed window.
//!
//! # Example
//!
//! ```rust,ignore
//! use holdscan::{FileEventStore, Ingestor, RpcEventSource};
//!
//! let source = RpcEventSource::connect_http(rpc_url, chain, token);
//! let store = FileEventStore::open(config.events_path(chain), key).await?;
//!
//! let summary = Ingestor::from_config(source, store, &config)
//!     .ingest_through(deployment_block, target_block)
//!     .await?;
//! println!("{summary}");
//! ```

use std::fmt;

use alloy_chains::NamedChain;
use alloy_primitives::{Address, BlockNumber};
use futures::stream::{self, StreamExt};
use tokio::time::sleep;
use tracing::{debug, info, warn, Instrument};

use crate::config::constants::{DEFAULT_MAX_CONCURRENT_WINDOWS, DEFAULT_WINDOW_BLOCKS};
use crate::config::{HoldscanConfig, RetryConfig};
use crate::errors::{IngestError, StoreError};
use crate::{spans, BlockRange, ChainEventSource, EventStore, MaxBlockRange, TransferEvent};

/// Outcome of one ingestion run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestSummary {
    pub chain: NamedChain,
    pub token: Address,
    /// Blocks fetched by this run; `None` when the store was already up to date
    pub fetched: Option<BlockRange>,
    /// Windows committed
    pub windows: usize,
    /// Events returned by the source, duplicates included
    pub events_fetched: usize,
    /// Events the store did not hold before
    pub events_added: usize,
    /// Store coverage after the run
    pub covered_through: Option<BlockNumber>,
}

impl fmt::Display for IngestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.fetched {
            Some(range) => write!(
                f,
                "{} {}: fetched blocks {} in {} windows, {} events ({} new)",
                self.chain, self.token, range, self.windows, self.events_fetched, self.events_added
            ),
            None => write!(
                f,
                "{} {}: up to date through block {:?}",
                self.chain, self.token, self.covered_through
            ),
        }
    }
}

/// Moves transfer events from a [`ChainEventSource`] into an [`EventStore`]
#[derive(Debug)]
pub struct Ingestor<S, E> {
    source: S,
    store: E,
    window_blocks: MaxBlockRange,
    max_concurrent_windows: usize,
    retry: RetryConfig,
}

impl<S, E> Ingestor<S, E>
where
    S: ChainEventSource,
    E: EventStore,
{
    pub fn new(source: S, store: E) -> Self {
        Self {
            source,
            store,
            window_blocks: MaxBlockRange::new(DEFAULT_WINDOW_BLOCKS),
            max_concurrent_windows: DEFAULT_MAX_CONCURRENT_WINDOWS,
            retry: RetryConfig::default(),
        }
    }

    /// Ingestor using the window, concurrency and retry settings of `config`
    pub fn from_config(source: S, store: E, config: &HoldscanConfig) -> Self {
        Self::new(source, store)
            .with_window_blocks(config.window_blocks)
            .with_max_concurrent_windows(config.max_concurrent_windows)
            .with_retry(config.retry)
    }

    pub fn with_window_blocks(mut self, window_blocks: MaxBlockRange) -> Self {
        self.window_blocks = window_blocks;
        self
    }

    /// Zero is treated as one
    pub fn with_max_concurrent_windows(mut self, windows: usize) -> Self {
        self.max_concurrent_windows = windows.max(1);
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn store(&self) -> &E {
        &self.store
    }

    pub fn into_store(self) -> E {
        self.store
    }

    /// Fetches and commits every block up to `target_block` the store lacks
    ///
    /// An empty store starts at `start_block`; otherwise ingestion resumes one block
    /// past the stored coverage.
    ///
    /// # Errors
    ///
    /// - [`IngestError::InvalidRange`] if `target_block < start_block`
    /// - [`IngestError::Store`] with [`StoreError::ResumeMismatch`] if the stored
    ///   coverage starts after `start_block`, leaving earlier blocks unfetched
    /// - [`IngestError::WindowFailed`] if a window still fails after all retries
    /// - [`IngestError::Fatal`] on a non-transient source error
    /// - [`IngestError::Store`] if the store rejects a window
    ///
    /// Windows committed before the error stay committed.
    pub async fn ingest_through(
        &self,
        start_block: BlockNumber,
        target_block: BlockNumber,
    ) -> Result<IngestSummary, IngestError> {
        if target_block < start_block {
            return Err(IngestError::invalid_range(format!(
                "target block {target_block} precedes start block {start_block}"
            )));
        }

        let coverage = self.store.coverage().await;
        if let Some(coverage) = coverage.filter(|c| start_block < c.start()) {
            let missing = BlockRange::new(start_block, coverage.start() - 1);
            return Err(StoreError::resume_mismatch(
                missing.unwrap_or(coverage),
                Some(coverage.end()),
                format!(
                    "store covers {coverage}, so blocks from {start_block} were never fetched"
                ),
            )
            .into());
        }

        let covered = coverage.map(|c| c.end());
        let resume_from = covered.map_or(Some(start_block), |c| c.checked_add(1));
        let mut summary = IngestSummary {
            chain: self.source.chain(),
            token: self.source.token(),
            fetched: None,
            windows: 0,
            events_fetched: 0,
            events_added: 0,
            covered_through: covered,
        };

        let Some(range) = resume_from.and_then(|from| BlockRange::new(from, target_block)) else {
            debug!(
                chain = %summary.chain,
                covered_through = ?covered,
                target_block,
                "Event store already up to date"
            );
            return Ok(summary);
        };

        let span = spans::ingest(summary.chain, summary.token, range);
        self.ingest_range(range, &mut summary).instrument(span).await?;
        Ok(summary)
    }

    async fn ingest_range(
        &self,
        range: BlockRange,
        summary: &mut IngestSummary,
    ) -> Result<(), IngestError> {
        info!(
            windows = self.window_blocks.chunks_needed(range),
            max_concurrent = self.max_concurrent_windows,
            "Starting ingestion"
        );

        let mut fetches = stream::iter(self.window_blocks.chunk_range(range))
            .map(|window| self.fetch_window(window))
            .buffered(self.max_concurrent_windows);

        while let Some(fetched) = fetches.next().await {
            let (window, events) = fetched?;
            summary.events_fetched += events.len();

            let added = self.store.commit_window(window, events).await?;
            summary.events_added += added;
            summary.windows += 1;
            summary.covered_through = Some(window.end());
            summary.fetched = BlockRange::new(range.start(), window.end());

            debug!(window = %window, added, "Committed window");
        }

        info!(
            windows = summary.windows,
            events_fetched = summary.events_fetched,
            events_added = summary.events_added,
            "Finished ingestion"
        );
        Ok(())
    }

    async fn fetch_window(
        &self,
        window: BlockRange,
    ) -> Result<(BlockRange, Vec<TransferEvent>), IngestError> {
        let mut attempt: u32 = 0;
        loop {
            let result = self
                .source
                .fetch_logs(window)
                .instrument(spans::fetch_window(self.source.chain(), window))
                .await;

            match result {
                Ok(events) => return Ok((window, events)),
                Err(source) if !source.is_transient() => {
                    return Err(IngestError::Fatal {
                        range: window,
                        source,
                    })
                }
                Err(source) if attempt >= self.retry.max_retries => {
                    return Err(IngestError::WindowFailed {
                        range: window,
                        attempts: attempt + 1,
                        source,
                    })
                }
                Err(e) => {
                    let delay = self.retry.backoff(attempt);
                    warn!(
                        window = %window,
                        attempt = attempt + 1,
                        max_retries = self.retry.max_retries,
                        delay_ms = delay.as_millis(),
                        error = %e,
                        "Window fetch failed, retrying"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SourceError;
    use crate::{MemoryEventStore, StoreKey};
    use alloy_primitives::{TxHash, U256};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    const TOKEN: Address = Address::with_last_byte(0x70);

    /// One mint per block that is a multiple of ten; fails the first `failures` calls
    struct FlakySource {
        failures: AtomicU32,
        transient: bool,
        calls: AtomicU32,
    }

    impl FlakySource {
        fn new(failures: u32, transient: bool) -> Self {
            Self {
                failures: AtomicU32::new(failures),
                transient,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl ChainEventSource for FlakySource {
        async fn fetch_logs(&self, range: BlockRange) -> Result<Vec<TransferEvent>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(if self.transient {
                    SourceError::Timeout {
                        range,
                        timeout: Duration::from_secs(1),
                    }
                } else {
                    SourceError::incomplete_log(range, "missing log index")
                });
            }

            Ok((range.start()..=range.end())
                .filter(|block| block % 10 == 0)
                .map(|block| {
                    TransferEvent::new(
                        block,
                        0,
                        TxHash::with_last_byte((block % 256) as u8),
                        Address::ZERO,
                        Address::with_last_byte(1),
                        U256::from(1),
                    )
                })
                .collect())
        }

        fn chain(&self) -> NamedChain {
            NamedChain::Mainnet
        }

        fn token(&self) -> Address {
            TOKEN
        }
    }

    fn ingestor(source: FlakySource) -> Ingestor<FlakySource, MemoryEventStore> {
        Ingestor::new(
            source,
            MemoryEventStore::new(StoreKey::new(NamedChain::Mainnet, TOKEN)),
        )
        .with_window_blocks(MaxBlockRange::new(25))
        .with_max_concurrent_windows(3)
    }

    #[tokio::test]
    async fn test_ingests_all_windows_in_order() {
        let ingestor = ingestor(FlakySource::new(0, true));

        let summary = ingestor.ingest_through(100, 199).await.unwrap();
        assert_eq!(summary.windows, 4);
        assert_eq!(summary.events_added, 10);
        assert_eq!(summary.fetched, BlockRange::new(100, 199));
        assert_eq!(summary.covered_through, Some(199));
        assert_eq!(ingestor.store().highest_stored_block().await, Some(199));
    }

    #[tokio::test]
    async fn test_resumes_from_coverage() {
        let ingestor = ingestor(FlakySource::new(0, true));
        ingestor.ingest_through(100, 149).await.unwrap();

        let summary = ingestor.ingest_through(100, 199).await.unwrap();
        assert_eq!(summary.fetched, BlockRange::new(150, 199));
        assert_eq!(summary.events_added, 5);

        let again = ingestor.ingest_through(100, 199).await.unwrap();
        assert_eq!(again.fetched, None);
        assert_eq!(again.windows, 0);
        assert_eq!(ingestor.store().len().await, 10);
    }

    #[tokio::test]
    async fn test_earlier_start_than_coverage_is_rejected() {
        let ingestor = ingestor(FlakySource::new(0, true));
        ingestor.ingest_through(150, 199).await.unwrap();
        let calls = ingestor.source().calls.load(Ordering::SeqCst);

        let err = ingestor.ingest_through(100, 199).await.unwrap_err();
        match err {
            IngestError::Store(StoreError::ResumeMismatch {
                range,
                covered_through,
                ..
            }) => {
                assert_eq!(Some(range), BlockRange::new(100, 149));
                assert_eq!(covered_through, Some(199));
            }
            other => panic!("expected resume mismatch, got {other:?}"),
        }
        assert_eq!(ingestor.source().calls.load(Ordering::SeqCst), calls);

        // Starting at or after the coverage start still resumes normally
        let summary = ingestor.ingest_through(160, 224).await.unwrap();
        assert_eq!(summary.fetched, BlockRange::new(200, 224));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_failures() {
        let ingestor = ingestor(FlakySource::new(2, true));

        let summary = ingestor.ingest_through(100, 124).await.unwrap();
        assert_eq!(summary.windows, 1);
        assert_eq!(ingestor.source().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_retries() {
        let ingestor = ingestor(FlakySource::new(10, true)).with_retry(RetryConfig {
            max_retries: 2,
            ..RetryConfig::default()
        });

        let err = ingestor.ingest_through(100, 124).await.unwrap_err();
        assert!(matches!(err, IngestError::WindowFailed { attempts: 3, .. }));
        assert_eq!(ingestor.store().highest_stored_block().await, None);
    }

    #[tokio::test]
    async fn test_non_transient_error_is_not_retried() {
        let ingestor = ingestor(FlakySource::new(1, false));

        let err = ingestor.ingest_through(100, 124).await.unwrap_err();
        assert!(matches!(err, IngestError::Fatal { .. }));
        assert_eq!(ingestor.source().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rejects_inverted_range() {
        let ingestor = ingestor(FlakySource::new(0, true));
        assert!(matches!(
            ingestor.ingest_through(200, 100).await,
            Err(IngestError::InvalidRange { .. })
        ));
    }
}
