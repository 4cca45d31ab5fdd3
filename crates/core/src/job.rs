// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The job-app contract and per-invocation job descriptors
//!
//! A job app is the unit of user code the runner schedules. The scheduler
//! identifies jobs by their stable `AppName`; the class path that produced
//! the app is an opaque loader key kept only for diagnostics.

use crate::scheduling::Frequency;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stable scheduler-level key for a job, distinct from its class path
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AppName(pub String);

impl AppName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AppName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AppName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AppName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A labeled failure a job can return so the run log records a meaningful
/// error kind instead of the generic `Error`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct Fault {
    pub kind: String,
    pub message: String,
}

impl Fault {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// The contract a job implementation exposes to the scheduler.
///
/// Non-backfill jobs implement [`JobApp::execute`]; backfill jobs implement
/// [`JobApp::execute_backfill`] and are called exactly once per owed
/// calendar date, in order. A job signals failure by returning any error;
/// the runner captures it into a structured [`crate::JobError`] and never
/// lets it cross the per-job boundary.
pub trait JobApp: Send + Sync {
    /// Stable identifier used for state rows and dependency references
    fn app_name(&self) -> &str;

    /// Identifiers of jobs that must have succeeded recently before this
    /// one may run
    fn depends_on(&self) -> Vec<String> {
        Vec::new()
    }

    /// Whether this job is owed one call per calendar period
    fn is_backfill(&self) -> bool {
        false
    }

    /// Run a due non-backfill job
    fn execute(&self) -> anyhow::Result<()> {
        Err(Fault::new("NotImplemented", format!("{} has no execute", self.app_name())).into())
    }

    /// Run a backfill job for one owed date (day granularity, UTC)
    fn execute_backfill(&self, _date: DateTime<Utc>) -> anyhow::Result<()> {
        Err(Fault::new(
            "NotImplemented",
            format!("{} is not a backfill app", self.app_name()),
        )
        .into())
    }
}

/// Immutable description of one configured job, valid for a single
/// invocation
#[derive(Debug, Clone)]
pub struct JobDescriptor {
    pub app_name: AppName,
    /// Opaque loader key from the configuration line
    pub class_path: String,
    pub frequency: Frequency,
    pub depends_on: Vec<AppName>,
    pub is_backfill: bool,
}
