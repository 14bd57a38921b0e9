// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! End-to-end balance history scenarios
//!
//! Events go through the same path as production: normalize, append to a store,
//! read back, replay, query.

mod helpers;

use alloy_chains::NamedChain;
use alloy_primitives::{TxHash, U256};
use holdscan::{
    normalize, BalanceQuery, BlockRange, EventStore, LedgerBuilder, MemoryEventStore,
    NormalizationError, QueryError, StoreError, StoreKey, TransferEvent,
};

use helpers::{burn, mint, scenario_events, transfer, ALICE, BOB, CAROL, TOKEN};

fn store() -> MemoryEventStore {
    MemoryEventStore::new(StoreKey::new(NamedChain::Gnosis, TOKEN))
}

#[tokio::test]
async fn test_mint_then_transfer_balances() {
    let store = store();
    store
        .commit_window(BlockRange::new(100, 110).unwrap(), scenario_events())
        .await
        .unwrap();

    let events = store.read_range(100, 110).await.unwrap();
    let ledger = LedgerBuilder::new(100).build(&events, 110).unwrap();

    assert_eq!(ledger.balance_as_of(ALICE, 100).unwrap(), U256::from(1000));
    assert_eq!(ledger.balance_as_of(ALICE, 104).unwrap(), U256::from(1000));
    assert_eq!(ledger.balance_as_of(ALICE, 105).unwrap(), U256::from(600));
    assert_eq!(ledger.balance_as_of(BOB, 104).unwrap(), U256::ZERO);
    assert_eq!(ledger.balance_as_of(BOB, 105).unwrap(), U256::from(400));
    assert_eq!(ledger.balance_as_of(CAROL, 110).unwrap(), U256::ZERO);
    assert_eq!(ledger.addresses_with_activity(), vec![ALICE, BOB]);

    assert!(matches!(
        ledger.balance_as_of(ALICE, 111),
        Err(QueryError::BeyondBuiltRange { .. })
    ));
}

#[tokio::test]
async fn test_reingesting_same_events_leaves_ledger_unchanged() {
    let store = store();
    let window = BlockRange::new(100, 110).unwrap();
    store.commit_window(window, scenario_events()).await.unwrap();
    let before = LedgerBuilder::new(100)
        .build(&store.read_range(100, 110).await.unwrap(), 110)
        .unwrap();

    let added = store.append(scenario_events()).await.unwrap();
    assert_eq!(added, 0);
    assert_eq!(store.len().await, 2);

    let after = LedgerBuilder::new(100)
        .build(&store.read_range(100, 110).await.unwrap(), 110)
        .unwrap();
    assert_eq!(after.balances_as_of(110).unwrap(), before.balances_as_of(110).unwrap());
    assert_eq!(after.timeline(ALICE), before.timeline(ALICE));
    assert_eq!(after.events_applied(), before.events_applied());
}

#[tokio::test]
async fn test_recommitting_same_window_leaves_ledger_unchanged() {
    let store = store();
    let window = BlockRange::new(100, 110).unwrap();
    store.commit_window(window, scenario_events()).await.unwrap();
    let before = LedgerBuilder::new(100)
        .build(&store.read_range(100, 110).await.unwrap(), 110)
        .unwrap();

    assert_eq!(store.commit_window(window, scenario_events()).await.unwrap(), 0);
    assert_eq!(store.highest_stored_block().await, Some(110));

    let after = LedgerBuilder::new(100)
        .build(&store.read_range(100, 110).await.unwrap(), 110)
        .unwrap();
    assert_eq!(after.balances_as_of(110).unwrap(), before.balances_as_of(110).unwrap());

    // The same window with a changed payload is still fatal
    let mut changed = scenario_events();
    changed[1] = TransferEvent::new(105, 0, TxHash::with_last_byte(2), ALICE, BOB, U256::from(401));
    assert!(matches!(
        store.commit_window(window, changed).await,
        Err(StoreError::Integrity(NormalizationError::ConflictingDuplicate { .. }))
    ));
}

#[test]
fn test_conflicting_duplicate_is_fatal_before_replay() {
    let mut events = scenario_events();
    events.push(TransferEvent::new(
        105,
        0,
        TxHash::with_last_byte(2),
        ALICE,
        BOB,
        U256::from(401),
    ));

    assert!(matches!(
        normalize(events),
        Err(NormalizationError::ConflictingDuplicate { .. })
    ));
}

#[tokio::test]
async fn test_conflicting_duplicate_is_rejected_by_store() {
    let store = store();
    store
        .commit_window(BlockRange::new(100, 110).unwrap(), scenario_events())
        .await
        .unwrap();

    let conflicting = TransferEvent::new(
        105,
        0,
        TxHash::with_last_byte(2),
        ALICE,
        BOB,
        U256::from(401),
    );
    assert!(matches!(
        store.append(vec![conflicting]).await,
        Err(StoreError::Integrity(NormalizationError::ConflictingDuplicate { .. }))
    ));
    assert_eq!(store.len().await, 2);
}

#[test]
fn test_busy_block_keeps_only_end_of_block_balance() {
    // Alice receives and forwards within block 200; Bob ends with the difference
    let events = normalize(vec![
        transfer(200, 2, ALICE, CAROL, 300),
        mint(200, 0, ALICE, 500),
        transfer(200, 1, ALICE, BOB, 200),
        burn(201, 0, BOB, 50),
    ])
    .unwrap();
    let ledger = LedgerBuilder::new(200).build(&events, 205).unwrap();

    assert_eq!(ledger.balance_as_of(ALICE, 200).unwrap(), U256::ZERO);
    assert_eq!(ledger.balance_as_of(BOB, 200).unwrap(), U256::from(200));
    assert_eq!(ledger.balance_as_of(BOB, 201).unwrap(), U256::from(150));
    assert_eq!(ledger.balance_as_of(CAROL, 205).unwrap(), U256::from(300));

    // Alice's balance is zero at block 200 both before and after, so no checkpoint
    assert!(ledger.timeline(ALICE).is_none_or(|timeline| timeline.is_empty()));
    assert_eq!(ledger.total_minted(), U256::from(500));
    assert_eq!(ledger.total_burned(), U256::from(50));
    assert_eq!(ledger.total_supply(), U256::from(450));
}

#[test]
fn test_holders_at_snapshot_block() {
    let events = normalize(vec![
        mint(10, 0, ALICE, 100),
        mint(10, 1, BOB, 5),
        transfer(12, 0, BOB, CAROL, 5),
    ])
    .unwrap();
    let ledger = LedgerBuilder::new(10).build(&events, 12).unwrap();

    let at_11 = ledger.holders_with_min_balance(11, U256::from(1)).unwrap();
    assert_eq!(at_11.keys().copied().collect::<Vec<_>>(), vec![ALICE, BOB]);

    let at_12 = ledger.holders_with_min_balance(12, U256::from(10)).unwrap();
    assert_eq!(at_12.keys().copied().collect::<Vec<_>>(), vec![ALICE]);
}
