// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Property-based tests for normalization and ledger replay
//!
//! Histories are generated by simulating balances, so every generated history is
//! valid: transfers and burns never exceed the sender's balance.

mod helpers;

use alloy_primitives::{Address, BlockNumber, U256};
use holdscan::{
    normalize, BalanceQuery, LedgerBuilder, ReplayError, TransferEvent, MINT_BURN_SENTINEL,
};
use proptest::prelude::*;

use helpers::transfer;

const FROM_BLOCK: BlockNumber = 100;

fn holder(index: usize) -> Address {
    Address::with_last_byte(0x10 + index as u8)
}

/// (block gap, kind, sender, recipient, amount)
type Step = (u64, u8, usize, usize, u64);

fn arb_steps() -> impl Strategy<Value = Vec<Step>> {
    prop::collection::vec((0u64..3, 0u8..3, 0usize..4, 0usize..4, 1u64..1_000), 1..60)
}

/// Turns steps into a canonical, valid event history
fn history(steps: &[Step]) -> Vec<TransferEvent> {
    let mut balances = [0u64; 4];
    let mut block = FROM_BLOCK;
    let mut log_index = 0;
    let mut events = Vec::with_capacity(steps.len());

    for &(gap, kind, a, b, amount) in steps {
        if gap > 0 {
            block += gap;
            log_index = 0;
        }
        let event = match kind {
            0 => {
                balances[a] += amount;
                transfer(block, log_index, MINT_BURN_SENTINEL, holder(a), amount)
            }
            1 => {
                let value = amount % (balances[a] + 1);
                balances[a] -= value;
                balances[b] += value;
                transfer(block, log_index, holder(a), holder(b), value)
            }
            _ => {
                let value = amount % (balances[a] + 1);
                balances[a] -= value;
                transfer(block, log_index, holder(a), MINT_BURN_SENTINEL, value)
            }
        };
        events.push(event);
        log_index += 1;
    }
    events
}

fn arb_history() -> impl Strategy<Value = Vec<TransferEvent>> {
    arb_steps().prop_map(|steps| history(&steps))
}

fn last_block(events: &[TransferEvent]) -> BlockNumber {
    events.last().map_or(FROM_BLOCK, |e| e.block_number)
}

proptest! {
    /// Property: normalizing a canonical sequence again changes nothing
    #[test]
    fn prop_normalize_is_idempotent(events in arb_history()) {
        let once = normalize(events.clone()).unwrap();
        let twice = normalize(once.clone()).unwrap();
        prop_assert_eq!(&once, &events);
        prop_assert_eq!(once, twice);
    }

    /// Property: input order and exact duplicates do not affect the canonical sequence
    #[test]
    fn prop_normalize_ignores_order_and_duplicates(
        (events, shuffled) in arb_history()
            .prop_flat_map(|events| (Just(events.clone()), Just(events).prop_shuffle())),
    ) {
        let mut doubled = shuffled.clone();
        doubled.extend(shuffled.iter().rev().cloned());

        prop_assert_eq!(normalize(shuffled).unwrap(), events.clone());
        prop_assert_eq!(normalize(doubled).unwrap(), events);
    }

    /// Property: final balances sum to minted minus burned
    #[test]
    fn prop_conservation(events in arb_history()) {
        let through = last_block(&events);
        let ledger = LedgerBuilder::new(FROM_BLOCK).build(&events, through).unwrap();

        let held = ledger
            .addresses_with_activity()
            .into_iter()
            .fold(U256::ZERO, |acc, address| acc + ledger.final_balance(address));
        prop_assert_eq!(held, ledger.total_minted() - ledger.total_burned());
        prop_assert_eq!(held, ledger.total_supply());
    }

    /// Property: checkpoints are strictly increasing and only record changes
    #[test]
    fn prop_checkpoints_are_monotonic(events in arb_history()) {
        let through = last_block(&events);
        let ledger = LedgerBuilder::new(FROM_BLOCK).build(&events, through).unwrap();

        for address in ledger.addresses_with_activity() {
            let Some(timeline) = ledger.timeline(address) else { continue };
            let checkpoints = timeline.checkpoints();
            for pair in checkpoints.windows(2) {
                prop_assert!(pair[0].block_number < pair[1].block_number);
                prop_assert_ne!(pair[0].balance, pair[1].balance);
            }
            if let Some(first) = checkpoints.first() {
                prop_assert_ne!(first.balance, U256::ZERO);
            }
        }
    }

    /// Property: addresses that never appear hold zero at every built block
    #[test]
    fn prop_unseen_address_is_zero(events in arb_history(), offset in 0u64..200) {
        let through = last_block(&events);
        let ledger = LedgerBuilder::new(FROM_BLOCK).build(&events, through).unwrap();
        let block = FROM_BLOCK + offset % (through - FROM_BLOCK + 1);

        prop_assert_eq!(ledger.balance_as_of(Address::with_last_byte(0xfe), block).unwrap(), U256::ZERO);
        prop_assert_eq!(ledger.balance_as_of(MINT_BURN_SENTINEL, block).unwrap(), U256::ZERO);
    }

    /// Property: spending more than the balance fails the whole build
    #[test]
    fn prop_overspend_is_detected(events in arb_history(), index in 0usize..4) {
        let through = last_block(&events) + 1;
        let ledger = LedgerBuilder::new(FROM_BLOCK).build(&events, through - 1).unwrap();
        let overspend = ledger.final_balance(holder(index)) + U256::from(1);

        let mut invalid = events;
        invalid.push(TransferEvent::new(
            through,
            0,
            helpers::tx(through, 0),
            holder(index),
            Address::with_last_byte(0xfe),
            overspend,
        ));

        let result = LedgerBuilder::new(FROM_BLOCK).build(&invalid, through);
        let is_insufficient = matches!(result, Err(ReplayError::InsufficientBalance { .. }));
        prop_assert!(is_insufficient);
    }

    /// Property: extending at any split block equals a full rebuild
    #[test]
    fn prop_extend_equals_rebuild(events in arb_history(), split_offset in 0u64..200) {
        let through = last_block(&events) + 2;
        let split = FROM_BLOCK + split_offset % (through - FROM_BLOCK);
        let (head, tail): (Vec<_>, Vec<_>) =
            events.iter().cloned().partition(|e| e.block_number <= split);

        let full = LedgerBuilder::new(FROM_BLOCK).build(&events, through).unwrap();
        let base = LedgerBuilder::new(FROM_BLOCK).build(&head, split).unwrap();
        let extended = LedgerBuilder::extend(&base, &tail, through).unwrap();

        prop_assert_eq!(extended.addresses_with_activity(), full.addresses_with_activity());
        prop_assert_eq!(extended.total_minted(), full.total_minted());
        prop_assert_eq!(extended.total_burned(), full.total_burned());
        for block in FROM_BLOCK..=through {
            prop_assert_eq!(extended.balances_as_of(block).unwrap(), full.balances_as_of(block).unwrap());
        }
        for address in full.addresses_with_activity() {
            prop_assert_eq!(extended.timeline(address), full.timeline(address));
            prop_assert_eq!(extended.first_seen(address), full.first_seen(address));
        }
    }
}
