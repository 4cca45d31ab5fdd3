// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The persistent job state store over SQLite
//!
//! Five mutating operations, each a single transaction: `upsert_pre_run`,
//! `commit_success`, `commit_failure`, `reset`, and log pruning. Row-level
//! exclusivity comes from immediate transactions with a zero busy timeout:
//! a racing invocation gets `SQLITE_BUSY` at once and loses the claim
//! instead of blocking.
//!
//! Timestamps are stored as RFC 3339 text, always UTC, so anchor times and
//! comparisons are evaluated in the store's session time zone regardless
//! of the host's.

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use tabber_core::{JobError, JobState, RunLogEntry};

const SCHEMA: &str = "
    PRAGMA journal_mode = WAL;

    CREATE TABLE IF NOT EXISTS crontabber (
        app_name TEXT PRIMARY KEY,
        next_run TEXT,
        first_run TEXT,
        last_run TEXT,
        last_success TEXT,
        error_count INTEGER NOT NULL DEFAULT 0,
        depends_on TEXT,
        last_error TEXT,
        ongoing TEXT
    );

    CREATE TABLE IF NOT EXISTS crontabber_log (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        app_name TEXT NOT NULL,
        log_time TEXT NOT NULL,
        duration REAL,
        success INTEGER NOT NULL,
        exc_type TEXT,
        exc_value TEXT,
        exc_traceback TEXT
    );

    CREATE TABLE IF NOT EXISTS crontabber_gate (
        id INTEGER PRIMARY KEY CHECK (id = 0),
        ongoing TEXT
    );
    INSERT OR IGNORE INTO crontabber_gate (id, ongoing) VALUES (0, NULL);
";

/// Errors from the state store and lock protocol
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another invocation holds the row's write lock right now
    #[error("row for {0:?} is locked by another invocation")]
    RowLocked(String),
    /// The row carries a fresh ongoing claim
    #[error("{app:?} is already ongoing (since {since})")]
    AlreadyOngoing { app: String, since: DateTime<Utc> },
    /// Another invocation holds the process-level gate
    #[error("another invocation holds the process gate")]
    GateHeld { since: Option<DateTime<Utc>> },
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("corrupt state for {app:?}: {reason}")]
    Corrupt { app: String, reason: String },
}

/// Handle to the SQLite database holding job state, run log and gate
pub struct StateStore {
    pub(crate) conn: Connection,
}

impl StateStore {
    /// Open the database, creating the schema on first use.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// In-memory store, used by tests
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(std::time::Duration::ZERO)?;
        conn.execute_batch(SCHEMA)?;
        debug!("state store ready");
        Ok(Self { conn })
    }

    /// Fetch one job's state row.
    pub fn get(&self, app_name: &str) -> Result<Option<JobState>, StoreError> {
        let raw = self
            .conn
            .query_row(
                "SELECT next_run, first_run, last_run, last_success,
                        error_count, depends_on, last_error, ongoing
                 FROM crontabber WHERE app_name = ?1",
                [app_name],
                RawState::from_row,
            )
            .optional()?;
        raw.map(|r| r.into_state(app_name)).transpose()
    }

    /// All state rows, ordered by app name.
    pub fn items(&self) -> Result<Vec<(String, JobState)>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT app_name, next_run, first_run, last_run, last_success,
                    error_count, depends_on, last_error, ongoing
             FROM crontabber ORDER BY app_name",
        )?;
        let rows = stmt
            .query_map([], |row| {
                let app: String = row.get(0)?;
                let raw = RawState::from_row_offset(row, 1)?;
                Ok((app, raw))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|(app, raw)| {
                let state = raw.into_state(&app)?;
                Ok((app, state))
            })
            .collect()
    }

    /// Claim the row for execution: compare-and-set on `ongoing`.
    ///
    /// Succeeds iff the row is absent, `ongoing` is null, or the claim is
    /// older than `max_ongoing_age`. Sets `ongoing` and `last_run` to
    /// `started_at`; `first_run` is initialized to `origin` on the first
    /// attempt (the frequency-aligned floor for backfill jobs, otherwise
    /// `started_at`). Losing the race reports `RowLocked`; a fresh claim
    /// reports `AlreadyOngoing`. Both make the runner exit with code 2.
    pub fn upsert_pre_run(
        &mut self,
        app_name: &str,
        started_at: DateTime<Utc>,
        origin: DateTime<Utc>,
        depends_on: &[String],
        max_ongoing_age: Duration,
    ) -> Result<(), StoreError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| row_lock_err(app_name, e))?;

        let ongoing: Option<Option<String>> = tx
            .query_row(
                "SELECT ongoing FROM crontabber WHERE app_name = ?1",
                [app_name],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(Some(claimed)) = ongoing {
            let since = parse_ts(app_name, &claimed)?;
            if started_at - since < max_ongoing_age {
                return Err(StoreError::AlreadyOngoing {
                    app: app_name.to_string(),
                    since,
                });
            }
            debug!(app = app_name, %since, "overriding stale ongoing claim");
        }

        tx.execute(
            "INSERT INTO crontabber
                 (app_name, next_run, first_run, last_run, last_success,
                  error_count, depends_on, last_error, ongoing)
             VALUES (?1, NULL, ?2, ?3, NULL, 0, ?4, NULL, ?3)
             ON CONFLICT(app_name) DO UPDATE SET
                 first_run = COALESCE(first_run, excluded.first_run),
                 last_run = excluded.last_run,
                 depends_on = excluded.depends_on,
                 ongoing = excluded.ongoing",
            params![
                app_name,
                ts(origin),
                ts(started_at),
                serde_json::to_string(depends_on).unwrap_or_default(),
            ],
        )?;
        tx.commit().map_err(|e| row_lock_err(app_name, e))?;
        Ok(())
    }

    /// Record a successful attempt and release the ongoing claim.
    ///
    /// `succeeded_at` becomes `last_success` (for backfill jobs this is the
    /// processed date); `logged_at` stamps the run-log row.
    pub fn commit_success(
        &mut self,
        app_name: &str,
        succeeded_at: DateTime<Utc>,
        next_due: DateTime<Utc>,
        logged_at: DateTime<Utc>,
        duration: f64,
    ) -> Result<(), StoreError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "UPDATE crontabber SET
                 last_success = ?2, next_run = ?3,
                 error_count = 0, last_error = NULL, ongoing = NULL
             WHERE app_name = ?1",
            params![app_name, ts(succeeded_at), ts(next_due)],
        )?;
        tx.execute(
            "INSERT INTO crontabber_log (app_name, log_time, duration, success)
             VALUES (?1, ?2, ?3, 1)",
            params![app_name, ts(logged_at), duration],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Record a failed attempt and release the ongoing claim.
    pub fn commit_failure(
        &mut self,
        app_name: &str,
        failed_at: DateTime<Utc>,
        next_due: DateTime<Utc>,
        error: &JobError,
        duration: f64,
    ) -> Result<(), StoreError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "UPDATE crontabber SET
                 next_run = ?2, error_count = error_count + 1,
                 last_error = ?3, ongoing = NULL
             WHERE app_name = ?1",
            params![
                app_name,
                ts(next_due),
                serde_json::to_string(error).unwrap_or_default(),
            ],
        )?;
        tx.execute(
            "INSERT INTO crontabber_log
                 (app_name, log_time, duration, success, exc_type, exc_value, exc_traceback)
             VALUES (?1, ?2, ?3, 0, ?4, ?5, ?6)",
            params![
                app_name,
                ts(failed_at),
                duration,
                error.kind,
                error.message,
                error.traceback,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Forget a job's state so it starts over from scratch. The run log is
    /// left intact. Returns whether a row existed.
    pub fn reset(&mut self, app_name: &str) -> Result<bool, StoreError> {
        let deleted = self
            .conn
            .execute("DELETE FROM crontabber WHERE app_name = ?1", [app_name])?;
        Ok(deleted > 0)
    }

    /// The most recent run-log row for a job, if any.
    pub fn latest_log(&self, app_name: &str) -> Result<Option<RunLogEntry>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, app_name, log_time, duration, success,
                    exc_type, exc_value, exc_traceback
             FROM crontabber_log WHERE app_name = ?1
             ORDER BY id DESC LIMIT 1",
        )?;
        let raw = stmt
            .query_row([app_name], RawLog::from_row)
            .optional()?;
        raw.map(RawLog::into_entry).transpose()
    }

    /// All run-log rows for a job, oldest first.
    pub fn logs(&self, app_name: &str) -> Result<Vec<RunLogEntry>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, app_name, log_time, duration, success,
                    exc_type, exc_value, exc_traceback
             FROM crontabber_log WHERE app_name = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map([app_name], RawLog::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(RawLog::into_entry).collect()
    }

    /// Delete run-log rows older than `before`. Returns the count removed.
    pub fn prune_log(&mut self, before: DateTime<Utc>) -> Result<usize, StoreError> {
        let removed = self.conn.execute(
            "DELETE FROM crontabber_log WHERE log_time < ?1",
            [ts(before)],
        )?;
        Ok(removed)
    }
}

fn ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

fn parse_ts(app: &str, text: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt {
            app: app.to_string(),
            reason: format!("bad timestamp {:?}: {}", text, e),
        })
}

fn row_lock_err(app: &str, err: rusqlite::Error) -> StoreError {
    match err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::DatabaseBusy => {
            StoreError::RowLocked(app.to_string())
        }
        other => StoreError::Sqlite(other),
    }
}

/// Raw text columns of a `crontabber` row, before parsing
struct RawState {
    next_run: Option<String>,
    first_run: Option<String>,
    last_run: Option<String>,
    last_success: Option<String>,
    error_count: u32,
    depends_on: Option<String>,
    last_error: Option<String>,
    ongoing: Option<String>,
}

impl RawState {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Self::from_row_offset(row, 0)
    }

    fn from_row_offset(row: &rusqlite::Row<'_>, base: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            next_run: row.get(base)?,
            first_run: row.get(base + 1)?,
            last_run: row.get(base + 2)?,
            last_success: row.get(base + 3)?,
            error_count: row.get(base + 4)?,
            depends_on: row.get(base + 5)?,
            last_error: row.get(base + 6)?,
            ongoing: row.get(base + 7)?,
        })
    }

    fn into_state(self, app: &str) -> Result<JobState, StoreError> {
        let parse = |text: Option<String>| text.map(|t| parse_ts(app, &t)).transpose();
        Ok(JobState {
            next_run: parse(self.next_run)?,
            first_run: parse(self.first_run)?,
            last_run: parse(self.last_run)?,
            last_success: parse(self.last_success)?,
            error_count: self.error_count,
            depends_on: self
                .depends_on
                .map(|text| {
                    serde_json::from_str(&text).map_err(|e| StoreError::Corrupt {
                        app: app.to_string(),
                        reason: format!("bad depends_on: {}", e),
                    })
                })
                .transpose()?
                .unwrap_or_default(),
            last_error: self
                .last_error
                .map(|text| {
                    serde_json::from_str(&text).map_err(|e| StoreError::Corrupt {
                        app: app.to_string(),
                        reason: format!("bad last_error: {}", e),
                    })
                })
                .transpose()?,
            ongoing: parse(self.ongoing)?,
        })
    }
}

/// Raw columns of a `crontabber_log` row
struct RawLog {
    id: i64,
    app_name: String,
    log_time: String,
    duration: Option<f64>,
    success: bool,
    exc_type: Option<String>,
    exc_value: Option<String>,
    exc_traceback: Option<String>,
}

impl RawLog {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            app_name: row.get(1)?,
            log_time: row.get(2)?,
            duration: row.get(3)?,
            success: row.get::<_, i64>(4)? != 0,
            exc_type: row.get(5)?,
            exc_value: row.get(6)?,
            exc_traceback: row.get(7)?,
        })
    }

    fn into_entry(self) -> Result<RunLogEntry, StoreError> {
        let log_time = parse_ts(&self.app_name, &self.log_time)?;
        let error = self.exc_type.map(|kind| JobError {
            kind,
            message: self.exc_value.unwrap_or_default(),
            traceback: self.exc_traceback.unwrap_or_default(),
        });
        Ok(RunLogEntry {
            id: self.id,
            app_name: self.app_name,
            log_time,
            duration: self.duration.unwrap_or_default(),
            success: self.success,
            error,
        })
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
