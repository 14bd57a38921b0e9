//! Span creation helpers for holdscan operations.
//!
//! This module keeps telemetry concerns separate from business logic. Instead of
//! using `#[instrument]` attributes directly on functions, each instrumented
//! operation has a corresponding span helper function in this module.
//!
//! Usage pattern:
//! ```rust,ignore
//! pub fn my_operation(&self, param: Type) -> Result<T> {
//!     let span = spans::my_operation(param_value);
//!     let _guard = span.enter();
//!     // Business logic here
//! }
//! ```
//!
//! Async operations attach the span with `tracing::Instrument` instead of holding
//! an `enter()` guard across `.await` points.

use alloy_chains::NamedChain;
use alloy_primitives::{Address, BlockNumber};
use tracing::Span;

use crate::BlockRange;

/// Create span for replaying a canonical sequence into a fresh ledger.
///
/// Parent: run_pipeline span, or None when called directly
/// Children: None
#[inline]
pub(crate) fn build_ledger(from_block: BlockNumber, through: BlockNumber, events: usize) -> Span {
    tracing::info_span!(
        "holdscan.build_ledger",
        from_block = from_block,
        through = through,
        events = events,
    )
}

/// Create span for extending an existing ledger past its built range.
///
/// Parent: run_pipeline span, or None when called directly
/// Children: None
#[inline]
pub(crate) fn extend_ledger(
    built_through: BlockNumber,
    through: BlockNumber,
    events: usize,
) -> Span {
    tracing::info_span!(
        "holdscan.extend_ledger",
        built_through = built_through,
        through = through,
        events = events,
    )
}

/// Create span for opening and verifying a file-backed event store.
///
/// Parent: Caller's span
/// Children: None
#[inline]
pub(crate) fn open_event_store(chain: NamedChain, token: Address, path: &str) -> Span {
    tracing::debug_span!(
        "holdscan.open_event_store",
        chain = %chain,
        token = %token,
        path = path,
    )
}

/// Create span for an ingestion run over a block range.
///
/// This is the main entry point for fetching and persisting transfer events.
///
/// Parent: run_pipeline span, or None when called directly
/// Children: fetch_window spans (one per window)
#[inline]
pub(crate) fn ingest(chain: NamedChain, token: Address, range: BlockRange) -> Span {
    tracing::info_span!(
        "holdscan.ingest",
        chain = %chain,
        token = %token,
        from_block = range.start(),
        to_block = range.end(),
        block_count = range.len(),
    )
}

/// Create span for fetching one ingestion window, across all its retry attempts.
///
/// Parent: ingest span
/// Children: RPC calls made by the event source
#[inline]
pub(crate) fn fetch_window(chain: NamedChain, range: BlockRange) -> Span {
    tracing::debug_span!(
        "holdscan.fetch_window",
        chain = %chain,
        from_block = range.start(),
        to_block = range.end(),
    )
}

/// Create span for fetching transfer logs over RPC.
///
/// Parent: fetch_window span
/// Children: None
#[inline]
pub(crate) fn fetch_transfer_logs(token: Address, range: BlockRange) -> Span {
    tracing::trace_span!(
        "holdscan.fetch_transfer_logs",
        token = %token,
        from_block = range.start(),
        to_block = range.end(),
    )
}

/// Create span for one pipeline run on a (chain, token) pair.
///
/// Parent: None (root span for this operation)
/// Children: ingest, build_ledger spans
#[inline]
pub(crate) fn run_pipeline(chain: NamedChain, token: Address, target_block: BlockNumber) -> Span {
    tracing::info_span!(
        "holdscan.run_pipeline",
        chain = %chain,
        token = %token,
        target_block = target_block,
    )
}
