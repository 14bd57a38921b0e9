// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Where transfer events come from
//!
//! A [`ChainEventSource`] answers one question: which `Transfer` events did the
//! token emit in a block range. Chains differ only in the settings passed to a
//! source, never in code. [`RpcEventSource`] is the JSON-RPC implementation; tests
//! substitute scripted sources.

use std::sync::Arc;

use alloy_chains::NamedChain;
use alloy_primitives::Address;
use async_trait::async_trait;

use crate::errors::SourceError;
use crate::{BlockRange, TransferEvent};

mod definitions;
mod rpc;

pub use definitions::Transfer;
pub use rpc::RpcEventSource;

/// Fetches the `Transfer` events one token emitted on one chain
///
/// Returned events may come in any order and may repeat; callers normalize them.
/// Errors for which [`SourceError::is_transient`] holds are retried by the
/// [`Ingestor`](crate::Ingestor).
#[async_trait]
pub trait ChainEventSource: Send + Sync {
    /// All transfer events with a block number in `range`
    async fn fetch_logs(&self, range: BlockRange) -> Result<Vec<TransferEvent>, SourceError>;

    fn chain(&self) -> NamedChain;

    fn token(&self) -> Address;
}

#[async_trait]
impl<T: ChainEventSource + ?Sized> ChainEventSource for Arc<T> {
    async fn fetch_logs(&self, range: BlockRange) -> Result<Vec<TransferEvent>, SourceError> {
        (**self).fetch_logs(range).await
    }

    fn chain(&self) -> NamedChain {
        (**self).chain()
    }

    fn token(&self) -> Address {
        (**self).token()
    }
}
