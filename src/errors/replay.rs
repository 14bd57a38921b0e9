// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for ledger replay.

use alloy_primitives::{Address, BlockNumber, U256};

use super::NormalizationError;
use crate::TransferEvent;

/// Errors that abort a ledger build or extension.
///
/// Every variant carries the event (or block) that triggered it, so the failure can
/// be reproduced from the persisted log alone.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplayError {
    /// A sender would go below zero: an event is missing upstream or the log is corrupt.
    #[error("Insufficient balance for {address}: holds {balance}, event {event}")]
    InsufficientBalance {
        /// The under-funded sender
        address: Address,
        /// Its running balance before the event
        balance: U256,
        /// The event that could not be applied
        event: Box<TransferEvent>,
    },

    /// A credit would overflow 256 bits.
    #[error("Balance overflow for {address} at event {event}")]
    BalanceOverflow {
        /// The recipient
        address: Address,
        /// The event that could not be applied
        event: Box<TransferEvent>,
    },

    /// The input is not a canonical sequence.
    #[error("Replay input is not canonical: {0}")]
    NonCanonicalInput(#[from] NormalizationError),

    /// An event lies outside the blocks the ledger is being built over.
    #[error("Event outside ledger range {from_block}-{through}: {event}")]
    EventOutsideRange {
        /// First block the ledger covers
        from_block: BlockNumber,
        /// Last block the ledger covers
        through: BlockNumber,
        /// The offending event
        event: Box<TransferEvent>,
    },

    /// The requested ledger range is inverted.
    #[error("Invalid ledger range: through block {through} precedes start block {from_block}")]
    InvalidRange {
        /// First block the ledger covers
        from_block: BlockNumber,
        /// Requested last block
        through: BlockNumber,
    },

    /// An extension does not start strictly after the existing ledger.
    #[error("Extension overlaps ledger built through block {built_through}: {details}")]
    ExtensionOverlap {
        /// Upper bound of the existing ledger
        built_through: BlockNumber,
        /// What overlapped
        details: String,
    },
}

impl ReplayError {
    /// Create an `InsufficientBalance` error.
    pub fn insufficient_balance(address: Address, balance: U256, event: &TransferEvent) -> Self {
        ReplayError::InsufficientBalance {
            address,
            balance,
            event: Box::new(event.clone()),
        }
    }

    /// Create a `BalanceOverflow` error.
    pub fn balance_overflow(address: Address, event: &TransferEvent) -> Self {
        ReplayError::BalanceOverflow {
            address,
            event: Box::new(event.clone()),
        }
    }

    /// Create an `EventOutsideRange` error.
    pub fn event_outside_range(
        from_block: BlockNumber,
        through: BlockNumber,
        event: &TransferEvent,
    ) -> Self {
        ReplayError::EventOutsideRange {
            from_block,
            through,
            event: Box::new(event.clone()),
        }
    }

    /// Create an `ExtensionOverlap` error.
    pub fn extension_overlap(built_through: BlockNumber, details: impl Into<String>) -> Self {
        ReplayError::ExtensionOverlap {
            built_through,
            details: details.into(),
        }
    }
}
