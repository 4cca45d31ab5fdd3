// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted per-job state and run-log records
//!
//! These are the in-memory shapes of the `crontabber` and `crontabber_log`
//! rows. The store is the only writer; the runner mutates a row only while
//! holding its `ongoing` claim.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Structured failure captured from a job's execute call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobError {
    /// Short kind label (`Error`, `Panic`, or a job-supplied fault kind)
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "value")]
    pub message: String,
    /// Multi-line diagnostic: the full error chain, or the panic payload
    pub traceback: String,
}

impl JobError {
    /// Capture an error returned from a job, preferring a job-supplied
    /// [`crate::Fault`] kind over the generic label.
    pub fn from_fault(err: &anyhow::Error) -> Self {
        let kind = err
            .downcast_ref::<crate::Fault>()
            .map(|f| f.kind.clone())
            .unwrap_or_else(|| "Error".to_string());
        Self {
            kind,
            message: err.to_string(),
            traceback: format!("{:?}", err),
        }
    }

    /// Capture a panic payload that escaped a job's execute call
    pub fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "job panicked".to_string());
        Self {
            kind: "Panic".to_string(),
            traceback: message.clone(),
            message,
        }
    }
}

/// Mutable persisted state for one job, keyed by app name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobState {
    /// Earliest instant at which the job becomes due
    pub next_run: Option<DateTime<Utc>>,
    /// First-ever attempt; the backfill calendar origin
    pub first_run: Option<DateTime<Utc>>,
    /// Most recent attempt
    pub last_run: Option<DateTime<Utc>>,
    /// Most recent successful attempt
    pub last_success: Option<DateTime<Utc>>,
    /// Consecutive failures; reset to zero on success
    pub error_count: u32,
    pub last_error: Option<JobError>,
    /// Set while some invocation is executing this job
    pub ongoing: Option<DateTime<Utc>>,
    /// Snapshot of declared dependencies, for diagnostics
    pub depends_on: Vec<String>,
}

/// One append-only run-log row: a single attempt and its outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunLogEntry {
    pub id: i64,
    pub app_name: String,
    pub log_time: DateTime<Utc>,
    /// Wall-clock seconds the attempt took
    pub duration: f64,
    pub success: bool,
    pub error: Option<JobError>,
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
