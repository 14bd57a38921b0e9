// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for balance queries.

use alloy_primitives::BlockNumber;

/// Usage errors from [`BalanceQuery`](crate::BalanceQuery).
///
/// An address with no activity at or before the queried block is not an error: it
/// has a zero balance.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// The queried block lies past what the ledger was built through.
    #[error("Block {block} is beyond the ledger's built range (through block {built_through})")]
    BeyondBuiltRange {
        /// The requested block
        block: BlockNumber,
        /// Highest block the ledger answers for
        built_through: BlockNumber,
    },
}
