// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Strong types shared across holdscan.
//!
//! - Transfer events and their identity/order keys
//! - Inclusive block ranges and RPC chunk limits
//! - Checkpoints and per-address balance timelines

pub mod event;
pub mod range;
pub mod timeline;

// Note: Public types are re-exported from lib.rs, not here
