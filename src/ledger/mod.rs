// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Point-in-time balance ledger
//!
//! A [`Ledger`] is the replay of a canonical transfer sequence for one
//! (chain, token) pair over `[from_block, built_through]`. It holds a
//! [`BalanceTimeline`] per address for as-of queries, plus the running state the
//! [`LedgerBuilder`] needs to continue replay past `built_through` without
//! starting over.
//!
//! Once built, a ledger is never mutated: extension produces a new ledger, and
//! [`SharedLedger`] swaps it in for readers.
//!
//! # Example
//!
//! ```rust,ignore
//! use holdscan::{BalanceQuery, LedgerBuilder};
//!
//! let ledger = LedgerBuilder::new(deployment_block).build(&canonical, target_block)?;
//!
//! for holder in ledger.addresses_with_activity() {
//!     let balance = ledger.balance_as_of(holder, snapshot_block)?;
//!     println!("{holder}: {balance}");
//! }
//! ```

use std::collections::{BTreeMap, HashMap};

use alloy_primitives::{Address, BlockNumber, U256};

use crate::errors::QueryError;
use crate::{BalanceTimeline, MINT_BURN_SENTINEL};

mod builder;
mod query;
mod shared;

pub use builder::LedgerBuilder;
pub use query::BalanceQuery;
pub use shared::SharedLedger;

/// Replay state for one address
#[derive(Debug, Clone)]
pub(crate) struct Account {
    /// Block of the first event naming this address
    pub(crate) first_seen: BlockNumber,
    /// Running balance after the last applied event
    pub(crate) balance: U256,
    pub(crate) timeline: BalanceTimeline,
}

impl Account {
    fn new(first_seen: BlockNumber) -> Self {
        Self {
            first_seen,
            balance: U256::ZERO,
            timeline: BalanceTimeline::default(),
        }
    }
}

/// Balance history of every address for one (chain, token) pair
///
/// The mint/burn sentinel never has an account; queries for it return zero.
#[derive(Debug, Clone)]
pub struct Ledger {
    pub(crate) from_block: BlockNumber,
    pub(crate) built_through: BlockNumber,
    pub(crate) accounts: HashMap<Address, Account>,
    pub(crate) minted: U256,
    pub(crate) burned: U256,
    pub(crate) events_applied: u64,
}

impl Ledger {
    pub(crate) fn empty(from_block: BlockNumber, built_through: BlockNumber) -> Self {
        Self {
            from_block,
            built_through,
            accounts: HashMap::new(),
            minted: U256::ZERO,
            burned: U256::ZERO,
            events_applied: 0,
        }
    }

    pub(crate) fn account_mut(&mut self, address: Address, block: BlockNumber) -> &mut Account {
        self.accounts
            .entry(address)
            .or_insert_with(|| Account::new(block))
    }

    /// First block the ledger covers
    pub fn from_block(&self) -> BlockNumber {
        self.from_block
    }

    /// Last block the ledger answers queries for
    pub fn built_through(&self) -> BlockNumber {
        self.built_through
    }

    /// Sum of all values minted from the sentinel
    pub fn total_minted(&self) -> U256 {
        self.minted
    }

    /// Sum of all values burned to the sentinel
    pub fn total_burned(&self) -> U256 {
        self.burned
    }

    /// Minted minus burned: equals the sum of all holder balances at `built_through`
    pub fn total_supply(&self) -> U256 {
        self.minted.saturating_sub(self.burned)
    }

    /// Number of events replayed into this ledger, self-transfers included
    pub fn events_applied(&self) -> u64 {
        self.events_applied
    }

    /// Full checkpoint history of `address`, if it ever appeared in an event
    pub fn timeline(&self, address: Address) -> Option<&BalanceTimeline> {
        self.accounts.get(&address).map(|account| &account.timeline)
    }

    /// Block of the first event naming `address`
    pub fn first_seen(&self, address: Address) -> Option<BlockNumber> {
        self.accounts.get(&address).map(|account| account.first_seen)
    }

    /// Balance of `address` at `built_through`
    pub fn final_balance(&self, address: Address) -> U256 {
        self.accounts
            .get(&address)
            .map(|account| account.balance)
            .unwrap_or(U256::ZERO)
    }

    /// Every non-zero balance as of `block`
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::BeyondBuiltRange`] if `block` is past `built_through`.
    pub fn balances_as_of(&self, block: BlockNumber) -> Result<BTreeMap<Address, U256>, QueryError> {
        self.holders_with_min_balance(block, U256::from(1))
    }

    /// Every balance of at least `min_balance` as of `block`
    ///
    /// Zero balances are never listed, even with `min_balance` of zero.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::BeyondBuiltRange`] if `block` is past `built_through`.
    pub fn holders_with_min_balance(
        &self,
        block: BlockNumber,
        min_balance: U256,
    ) -> Result<BTreeMap<Address, U256>, QueryError> {
        self.check_in_range(block)?;

        Ok(self
            .accounts
            .iter()
            .filter_map(|(address, account)| {
                let balance = account.timeline.balance_at(block);
                (!balance.is_zero() && balance >= min_balance).then_some((*address, balance))
            })
            .collect())
    }

    pub(crate) fn check_in_range(&self, block: BlockNumber) -> Result<(), QueryError> {
        if block > self.built_through {
            return Err(QueryError::BeyondBuiltRange {
                block,
                built_through: self.built_through,
            });
        }
        Ok(())
    }
}

impl BalanceQuery for Ledger {
    fn balance_as_of(&self, address: Address, block: BlockNumber) -> Result<U256, QueryError> {
        self.check_in_range(block)?;

        if address == MINT_BURN_SENTINEL {
            return Ok(U256::ZERO);
        }

        Ok(self
            .accounts
            .get(&address)
            .map(|account| account.timeline.balance_at(block))
            .unwrap_or(U256::ZERO))
    }

    fn addresses_with_activity(&self) -> Vec<Address> {
        let mut addresses: Vec<Address> = self.accounts.keys().copied().collect();
        addresses.sort_unstable();
        addresses
    }
}
