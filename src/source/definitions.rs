// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! ERC-20 `Transfer` event definition used to filter and decode logs
//!
//! The `sol!` macro generates `SIGNATURE` and `SIGNATURE_HASH` constants, so the
//! log filter never hashes the signature at runtime:
//!
//! ```rust,ignore
//! use alloy_rpc_types::Filter;
//! use alloy_sol_types::SolEvent;
//! use holdscan::Transfer;
//!
//! let filter = Filter::new()
//!     .address(token)
//!     .event_signature(Transfer::SIGNATURE_HASH);
//! ```

use std::fmt::Debug;

use alloy_sol_types::sol;

sol! {
    /// ERC-20 Transfer event
    ///
    /// Mints carry `from = 0x0`, burns carry `to = 0x0`. `value` is in base units.
    event Transfer(address indexed from, address indexed to, uint256 value);
}

impl Debug for Transfer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Transfer(from: {}, to: {}, value: {})",
            self.from, self.to, self.value
        )
    }
}
