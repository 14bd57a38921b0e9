// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Replay of canonical transfer sequences into a [`Ledger`]

use std::collections::HashSet;

use alloy_primitives::{Address, BlockNumber};
use tracing::{debug, info};

use super::Ledger;
use crate::errors::ReplayError;
use crate::normalize::verify_canonical;
use crate::{spans, TransferEvent, MINT_BURN_SENTINEL};

/// Builds ledgers from canonical event sequences
///
/// Replay is single-threaded and strictly in `(block_number, log_index)` order.
/// Every event is applied to the running balances of its parties; once all events
/// of a block are applied, each address whose balance moved in that block gets one
/// checkpoint.
///
/// # Examples
///
/// ```
/// use alloy_primitives::{Address, TxHash, U256};
/// use holdscan::{BalanceQuery, LedgerBuilder, TransferEvent, MINT_BURN_SENTINEL};
///
/// let alice = Address::with_last_byte(0xaa);
/// let bob = Address::with_last_byte(0xbb);
/// let events = vec![
///     TransferEvent::new(100, 0, TxHash::with_last_byte(1), MINT_BURN_SENTINEL, alice, U256::from(1000)),
///     TransferEvent::new(105, 0, TxHash::with_last_byte(2), alice, bob, U256::from(400)),
/// ];
///
/// let ledger = LedgerBuilder::new(100).build(&events, 110).unwrap();
/// assert_eq!(ledger.balance_as_of(alice, 104).unwrap(), U256::from(1000));
/// assert_eq!(ledger.balance_as_of(alice, 105).unwrap(), U256::from(600));
/// assert_eq!(ledger.balance_as_of(bob, 104).unwrap(), U256::ZERO);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct LedgerBuilder {
    from_block: BlockNumber,
}

impl LedgerBuilder {
    /// Creates a builder for ledgers starting at `from_block` (usually the token's
    /// deployment block)
    pub fn new(from_block: BlockNumber) -> Self {
        Self { from_block }
    }

    /// Replays `events` into a new ledger covering `[from_block, through]`
    ///
    /// `through` may lie past the last event: blocks without events are still
    /// covered, and queries up to `through` are answered.
    ///
    /// # Errors
    ///
    /// - [`ReplayError::InvalidRange`] if `through < from_block`
    /// - [`ReplayError::NonCanonicalInput`] if `events` is not canonical
    /// - [`ReplayError::EventOutsideRange`] for an event outside `[from_block, through]`
    /// - [`ReplayError::InsufficientBalance`] if any sender would go negative
    /// - [`ReplayError::BalanceOverflow`] if any balance would exceed 256 bits
    pub fn build(&self, events: &[TransferEvent], through: BlockNumber) -> Result<Ledger, ReplayError> {
        let span = spans::build_ledger(self.from_block, through, events.len());
        let _guard = span.enter();

        if through < self.from_block {
            return Err(ReplayError::InvalidRange {
                from_block: self.from_block,
                through,
            });
        }
        verify_canonical(events)?;
        check_bounds(events, self.from_block, through)?;

        let mut ledger = Ledger::empty(self.from_block, through);
        replay(&mut ledger, events)?;

        info!(
            events = ledger.events_applied,
            accounts = ledger.accounts.len(),
            total_supply = %ledger.total_supply(),
            "Built ledger"
        );

        Ok(ledger)
    }

    /// Continues replay of `ledger` with `events` up to `through`
    ///
    /// Returns a new ledger; `ledger` itself is left untouched, so a failed
    /// extension never disturbs the snapshot readers are using. The result is
    /// identical to building from scratch over the concatenated sequence.
    ///
    /// # Errors
    ///
    /// - [`ReplayError::ExtensionOverlap`] if `through` or any event is at or before
    ///   the ledger's `built_through` (an empty extension to the same block is fine)
    /// - the replay errors of [`LedgerBuilder::build`]
    pub fn extend(
        ledger: &Ledger,
        events: &[TransferEvent],
        through: BlockNumber,
    ) -> Result<Ledger, ReplayError> {
        let span = spans::extend_ledger(ledger.built_through, through, events.len());
        let _guard = span.enter();

        if through < ledger.built_through {
            return Err(ReplayError::extension_overlap(
                ledger.built_through,
                format!("requested through block {through}"),
            ));
        }
        verify_canonical(events)?;
        if let Some(first) = events.first() {
            if first.block_number <= ledger.built_through {
                return Err(ReplayError::extension_overlap(
                    ledger.built_through,
                    format!("event {first}"),
                ));
            }
        }
        check_bounds(events, ledger.from_block, through)?;

        let mut next = ledger.clone();
        next.built_through = through;
        replay(&mut next, events)?;

        info!(
            events = events.len(),
            accounts = next.accounts.len(),
            built_through = next.built_through,
            "Extended ledger"
        );

        Ok(next)
    }
}

fn check_bounds(
    events: &[TransferEvent],
    from_block: BlockNumber,
    through: BlockNumber,
) -> Result<(), ReplayError> {
    // Canonical input: checking both ends is enough
    for event in [events.first(), events.last()].into_iter().flatten() {
        if event.block_number < from_block || event.block_number > through {
            return Err(ReplayError::event_outside_range(from_block, through, event));
        }
    }
    Ok(())
}

/// Applies a canonical, range-checked sequence to `ledger`
///
/// On error `ledger` is left partially updated; callers always replay into a
/// ledger they own and discard it on failure.
fn replay(ledger: &mut Ledger, events: &[TransferEvent]) -> Result<(), ReplayError> {
    let mut touched: HashSet<Address> = HashSet::new();
    let mut current_block: Option<BlockNumber> = None;

    for event in events {
        if current_block != Some(event.block_number) {
            if let Some(block) = current_block {
                checkpoint_block(ledger, block, &mut touched);
            }
            current_block = Some(event.block_number);
        }
        apply_event(ledger, event, &mut touched)?;
    }

    if let Some(block) = current_block {
        checkpoint_block(ledger, block, &mut touched);
    }

    Ok(())
}

fn apply_event(
    ledger: &mut Ledger,
    event: &TransferEvent,
    touched: &mut HashSet<Address>,
) -> Result<(), ReplayError> {
    ledger.events_applied += 1;

    if event.is_mint() {
        ledger.minted = ledger
            .minted
            .checked_add(event.value)
            .ok_or_else(|| ReplayError::balance_overflow(MINT_BURN_SENTINEL, event))?;
    }
    if event.is_burn() {
        ledger.burned = ledger
            .burned
            .checked_add(event.value)
            .ok_or_else(|| ReplayError::balance_overflow(MINT_BURN_SENTINEL, event))?;
    }

    for party in [event.from, event.to] {
        if party != MINT_BURN_SENTINEL {
            ledger.account_mut(party, event.block_number);
            touched.insert(party);
        }
    }

    if event.is_self_transfer() {
        debug!(event = %event, "Skipping self-transfer");
        return Ok(());
    }

    if !event.is_mint() {
        let sender = ledger.account_mut(event.from, event.block_number);
        sender.balance = sender
            .balance
            .checked_sub(event.value)
            .ok_or_else(|| ReplayError::insufficient_balance(event.from, sender.balance, event))?;
    }

    if !event.is_burn() {
        let recipient = ledger.account_mut(event.to, event.block_number);
        recipient.balance = recipient
            .balance
            .checked_add(event.value)
            .ok_or_else(|| ReplayError::balance_overflow(event.to, event))?;
    }

    Ok(())
}

fn checkpoint_block(ledger: &mut Ledger, block: BlockNumber, touched: &mut HashSet<Address>) {
    for address in touched.drain() {
        if let Some(account) = ledger.accounts.get_mut(&address) {
            account.timeline.record(block, account.balance);
        }
    }
}
