// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Canonical ordering and deduplication of transfer events
//!
//! Fetch windows may be retried, resumed, or overlap, so the same log can arrive
//! more than once and in any order. [`normalize`] turns such a batch into the
//! canonical sequence the ledger replays:
//!
//! 1. Sort ascending by `(block_number, log_index)`
//! 2. Keep one copy of each identity `(tx_hash, log_index)`; copies must agree on
//!    every field
//! 3. Reject two distinct events claiming the same `(block_number, log_index)`
//!
//! The result depends only on the set of input events, never on their order, and
//! normalizing a canonical sequence returns it unchanged.
//!
//! # Example
//!
//! ```rust,ignore
//! use holdscan::normalize;
//!
//! let mut raw = fetch_window(a).await?;
//! raw.extend(fetch_window(b).await?); // `b` overlaps `a`
//!
//! let canonical = normalize(raw)?;
//! ```

use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::debug;

use crate::errors::NormalizationError;
use crate::{EventKey, TransferEvent};

/// Sort and deduplicate `events` into canonical replay order
///
/// # Errors
///
/// - [`NormalizationError::ConflictingDuplicate`] when two events share an identity
///   key but differ in any other field
/// - [`NormalizationError::OrderCollision`] when two distinct events share
///   `(block_number, log_index)`
pub fn normalize<I>(events: I) -> Result<Vec<TransferEvent>, NormalizationError>
where
    I: IntoIterator<Item = TransferEvent>,
{
    let mut events: Vec<TransferEvent> = events.into_iter().collect();
    let input_len = events.len();

    // Full-field order so the kept copy and error reports never depend on input order
    events.sort_unstable_by(canonical_cmp);

    let mut canonical: Vec<TransferEvent> = Vec::with_capacity(events.len());
    let mut seen: HashMap<EventKey, usize> = HashMap::with_capacity(events.len());

    for event in events {
        match seen.get(&event.key()) {
            Some(&idx) if canonical[idx] == event => continue,
            Some(&idx) => {
                return Err(NormalizationError::conflicting_duplicate(
                    &canonical[idx],
                    &event,
                ))
            }
            None => {
                seen.insert(event.key(), canonical.len());
                canonical.push(event);
            }
        }
    }

    if let Some(pair) = canonical
        .windows(2)
        .find(|pair| pair[0].order_key() == pair[1].order_key())
    {
        return Err(NormalizationError::order_collision(&pair[0], &pair[1]));
    }

    debug!(
        input = input_len,
        canonical = canonical.len(),
        duplicates = input_len - canonical.len(),
        "Normalized transfer events"
    );

    Ok(canonical)
}

/// Check that `events` is already canonical without copying it
///
/// Used on data that claims to be canonical: a persisted log on load, or the input
/// handed to the ledger builder.
///
/// # Errors
///
/// - [`NormalizationError::OrderCollision`] for two events at the same position
///   (including an exact duplicate)
/// - [`NormalizationError::OutOfOrder`] for a decreasing order key
/// - [`NormalizationError::ConflictingDuplicate`] for an identity key repeated at
///   different positions
pub fn verify_canonical(events: &[TransferEvent]) -> Result<(), NormalizationError> {
    for pair in events.windows(2) {
        match pair[0].order_key().cmp(&pair[1].order_key()) {
            Ordering::Less => {}
            Ordering::Equal => {
                return Err(NormalizationError::order_collision(&pair[0], &pair[1]))
            }
            Ordering::Greater => return Err(NormalizationError::out_of_order(&pair[0], &pair[1])),
        }
    }

    let mut first_by_key: HashMap<EventKey, usize> = HashMap::with_capacity(events.len());
    for (idx, event) in events.iter().enumerate() {
        if let Some(&first) = first_by_key.get(&event.key()) {
            return Err(NormalizationError::conflicting_duplicate(
                &events[first],
                event,
            ));
        }
        first_by_key.insert(event.key(), idx);
    }

    Ok(())
}

fn canonical_cmp(a: &TransferEvent, b: &TransferEvent) -> Ordering {
    a.order_key()
        .cmp(&b.order_key())
        .then_with(|| a.tx_hash.cmp(&b.tx_hash))
        .then_with(|| a.from.cmp(&b.from))
        .then_with(|| a.to.cmp(&b.to))
        .then_with(|| a.value.cmp(&b.value))
}
