// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the runner

use tabber_core::ConfigError;
use tabber_storage::StoreError;
use thiserror::Error;

/// Errors that abort an invocation
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A backfill job cannot be run out of sequence from the admin surface
    #[error("{0:?} is a backfill app and cannot be run with --job")]
    BackfillFilter(String),
    #[error("no configured job matches {0:?}")]
    UnknownJobFilter(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RunnerError {
    /// Process exit code for this error, per the locking protocol:
    /// 2 when a row claim was lost, 3 when the process gate is held,
    /// 1 for everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunnerError::Store(StoreError::RowLocked(_))
            | RunnerError::Store(StoreError::AlreadyOngoing { .. }) => 2,
            RunnerError::Store(StoreError::GateHeld { .. }) => 3,
            _ => 1,
        }
    }
}
