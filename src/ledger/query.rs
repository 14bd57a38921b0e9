// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Query surface used by reward-weighting code

use std::sync::Arc;

use alloy_primitives::{Address, BlockNumber, U256};

use crate::errors::QueryError;

/// As-of-block balance lookups against an immutable ledger snapshot
///
/// Implementations take `&self` and never mutate, so one snapshot can serve any
/// number of concurrent readers.
pub trait BalanceQuery: Send + Sync {
    /// Balance of `address` after every event at or before `block`
    ///
    /// An address with no activity at or before `block` has a zero balance; that is
    /// not an error.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::BeyondBuiltRange`] when `block` is past the last block
    /// the ledger was built through.
    fn balance_as_of(&self, address: Address, block: BlockNumber) -> Result<U256, QueryError>;

    /// Every address that was a party to at least one replayed event, sorted
    ///
    /// The mint/burn sentinel is never listed.
    fn addresses_with_activity(&self) -> Vec<Address>;
}

impl<T: BalanceQuery + ?Sized> BalanceQuery for Arc<T> {
    fn balance_as_of(&self, address: Address, block: BlockNumber) -> Result<U256, QueryError> {
        (**self).balance_as_of(address, block)
    }

    fn addresses_with_activity(&self) -> Vec<Address> {
        (**self).addresses_with_activity()
    }
}
