// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration error taxonomy
//!
//! Every variant here is fatal at startup: no state is touched and the
//! process exits non-zero before the runner walk begins.

use thiserror::Error;

/// Errors raised while turning the job list into a runnable registry
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("bad frequency {0:?}: expected a positive integer followed by m, h or d")]
    BadFrequency(String),
    #[error("anchor time {anchor:?} requires a whole-day frequency, got {frequency:?}")]
    TimeOnSubdailyFrequency { anchor: String, frequency: String },
    #[error("invalid anchor time {0:?}: expected HH:MM")]
    BadAnchorTime(String),
    #[error("malformed job line {0:?}: expected class_path|frequency[|HH:MM]")]
    BadJobLine(String),
    #[error("unknown job class {0:?}")]
    UnknownJob(String),
    #[error("duplicate job identifier {0:?}")]
    DuplicateIdentifier(String),
    #[error("job {job:?} depends on unknown job {dependency:?}")]
    UnknownDependency { job: String, dependency: String },
    #[error("dependency cycle involving {0:?}")]
    DependencyCycle(String),
}
