// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Per-address balance history

use alloy_primitives::{BlockNumber, U256};
use serde::{Deserialize, Serialize};

use super::event::decimal_u256;

/// Balance of one address immediately after every event at `block_number` applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub block_number: BlockNumber,
    #[serde(with = "decimal_u256")]
    pub balance: U256,
}

impl Checkpoint {
    pub const fn new(block_number: BlockNumber, balance: U256) -> Self {
        Self {
            block_number,
            balance,
        }
    }
}

/// Ordered checkpoints for one address
///
/// Block numbers are strictly increasing and consecutive checkpoints always carry
/// different balances. Only the ledger builder appends to a timeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BalanceTimeline {
    checkpoints: Vec<Checkpoint>,
}

impl BalanceTimeline {
    /// Appends a checkpoint if it changes the balance
    ///
    /// Returns `false` when the balance equals the latest checkpoint (or zero for an
    /// empty timeline) and nothing was recorded.
    pub(crate) fn record(&mut self, block_number: BlockNumber, balance: U256) -> bool {
        if let Some(last) = self.checkpoints.last() {
            debug_assert!(
                last.block_number < block_number,
                "checkpoint at block {block_number} does not follow block {}",
                last.block_number
            );
        }
        if self.latest_balance() == balance {
            return false;
        }
        self.checkpoints.push(Checkpoint::new(block_number, balance));
        true
    }

    /// Balance as of `block`: the last checkpoint at or before it, or zero
    pub fn balance_at(&self, block: BlockNumber) -> U256 {
        let idx = self
            .checkpoints
            .partition_point(|checkpoint| checkpoint.block_number <= block);
        if idx == 0 {
            U256::ZERO
        } else {
            self.checkpoints[idx - 1].balance
        }
    }

    /// Balance after the last recorded change
    pub fn latest_balance(&self) -> U256 {
        self.checkpoints
            .last()
            .map(|checkpoint| checkpoint.balance)
            .unwrap_or(U256::ZERO)
    }

    pub fn first(&self) -> Option<&Checkpoint> {
        self.checkpoints.first()
    }

    pub fn last(&self) -> Option<&Checkpoint> {
        self.checkpoints.last()
    }

    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    pub fn iter(&self) -> impl Iterator<Item = &Checkpoint> {
        self.checkpoints.iter()
    }

    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }
}
