// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The process-level gate: at most one invocation inside the runner
//!
//! A singleton row records whether any invocation is currently walking the
//! job list. A claim younger than `max_ongoing_age` turns new invocations
//! away (exit 3); an older claim belongs to a crashed invocation and is
//! reclaimed, so a wedged run can never block the system forever.

use crate::store::{StateStore, StoreError};
use chrono::{DateTime, Duration, Utc};
use rusqlite::TransactionBehavior;
use tracing::{debug, warn};

/// Proof that this invocation holds the gate
#[must_use = "the gate stays claimed until released"]
#[derive(Debug)]
pub struct ProcessGate {
    claimed_at: DateTime<Utc>,
}

impl ProcessGate {
    /// Claim the gate, reclaiming a stale holder if necessary.
    pub fn acquire(
        store: &mut StateStore,
        now: DateTime<Utc>,
        max_ongoing_age: Duration,
    ) -> Result<Self, StoreError> {
        let tx = store
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(busy_means_held)?;

        let claimed: Option<String> = tx.query_row(
            "SELECT ongoing FROM crontabber_gate WHERE id = 0",
            [],
            |row| row.get(0),
        )?;
        if let Some(text) = claimed {
            let since = DateTime::parse_from_rfc3339(&text)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| StoreError::Corrupt {
                    app: "<gate>".to_string(),
                    reason: format!("bad gate timestamp {:?}: {}", text, e),
                })?;
            if now - since < max_ongoing_age {
                return Err(StoreError::GateHeld { since: Some(since) });
            }
            warn!(%since, "reclaiming stale process gate");
        }

        tx.execute(
            "UPDATE crontabber_gate SET ongoing = ?1 WHERE id = 0",
            [now.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)],
        )?;
        tx.commit().map_err(busy_means_held)?;
        debug!("process gate acquired");
        Ok(Self { claimed_at: now })
    }

    pub fn claimed_at(&self) -> DateTime<Utc> {
        self.claimed_at
    }

    /// Release the gate. A crash before this point is recovered by the
    /// stale-claim rule on a later invocation.
    pub fn release(self, store: &StateStore) -> Result<(), StoreError> {
        store
            .conn
            .execute("UPDATE crontabber_gate SET ongoing = NULL WHERE id = 0", [])?;
        debug!("process gate released");
        Ok(())
    }
}

/// A busy database at gate time means another invocation is mid-claim.
fn busy_means_held(err: rusqlite::Error) -> StoreError {
    match err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::DatabaseBusy => {
            StoreError::GateHeld { since: None }
        }
        other => StoreError::Sqlite(other),
    }
}

#[cfg(test)]
#[path = "gate_tests.rs"]
mod tests;
