// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tabber-storage: Persistent job state, run log and lock protocol
//!
//! Everything lives in one SQLite database: the `crontabber` state table
//! (one row per job), the append-only `crontabber_log` and the singleton
//! `crontabber_gate` row backing the process-level lock. Column names in
//! the first two tables are kept compatible with prior deployments.

mod gate;
mod store;

pub use gate::ProcessGate;
pub use store::{StateStore, StoreError};
