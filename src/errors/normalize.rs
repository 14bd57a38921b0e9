// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for event normalization.
//!
//! Every variant is an integrity violation in the event source or in a persisted
//! log. None of them is ever repaired silently.

use alloy_primitives::BlockNumber;

use crate::TransferEvent;

/// Errors that can occur while sorting and deduplicating transfer events.
///
/// # Examples
///
/// ```rust,ignore
/// use holdscan::{normalize, NormalizationError};
///
/// match normalize(raw_events) {
///     Ok(canonical) => println!("{} canonical events", canonical.len()),
///     Err(NormalizationError::ConflictingDuplicate { first, second }) => {
///         eprintln!("source returned {first} and {second} under one identity");
///     }
///     Err(e) => eprintln!("corrupt source: {e}"),
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizationError {
    /// Two events share an identity key `(tx_hash, log_index)` but differ in payload.
    #[error("Conflicting duplicate events: {first} vs {second}")]
    ConflictingDuplicate {
        /// The event kept first in canonical order
        first: Box<TransferEvent>,
        /// The event that disagreed with it
        second: Box<TransferEvent>,
    },

    /// Two distinct events claim the same position `(block_number, log_index)`.
    #[error(
        "Log index collision at block {block_number} log {log_index}: {first} vs {second}"
    )]
    OrderCollision {
        /// Block number both events claim
        block_number: BlockNumber,
        /// Log index both events claim
        log_index: u64,
        /// The first of the colliding events
        first: Box<TransferEvent>,
        /// The second of the colliding events
        second: Box<TransferEvent>,
    },

    /// A sequence expected to be canonical is not strictly ordered.
    #[error("Events out of order: {previous} is followed by {next}")]
    OutOfOrder {
        /// The earlier event in the sequence
        previous: Box<TransferEvent>,
        /// The event that should have come before it
        next: Box<TransferEvent>,
    },
}

impl NormalizationError {
    /// Create a `ConflictingDuplicate` error.
    pub fn conflicting_duplicate(first: &TransferEvent, second: &TransferEvent) -> Self {
        NormalizationError::ConflictingDuplicate {
            first: Box::new(first.clone()),
            second: Box::new(second.clone()),
        }
    }

    /// Create an `OrderCollision` error.
    pub fn order_collision(first: &TransferEvent, second: &TransferEvent) -> Self {
        NormalizationError::OrderCollision {
            block_number: first.block_number,
            log_index: first.log_index,
            first: Box::new(first.clone()),
            second: Box::new(second.clone()),
        }
    }

    /// Create an `OutOfOrder` error.
    pub fn out_of_order(previous: &TransferEvent, next: &TransferEvent) -> Self {
        NormalizationError::OutOfOrder {
            previous: Box::new(previous.clone()),
            next: Box::new(next.clone()),
        }
    }
}
