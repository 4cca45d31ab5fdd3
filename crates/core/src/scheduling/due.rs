// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Due-time engine: decides whether a job is runnable right now
//!
//! A job is runnable iff (a) its due-at instant has passed, (b) every
//! dependency succeeded at its most recent attempt and is not overdue
//! itself, and (c) no other invocation holds a fresh ongoing claim on it.
//! `force` overrides (a) and (b), never (c), and never applies to
//! backfill jobs.

use crate::job::{AppName, JobDescriptor};
use crate::scheduling::backfill::owed_dates;
use crate::scheduling::Frequency;
use crate::state::JobState;
use chrono::{DateTime, Duration, NaiveTime, Utc};
use std::fmt;

/// Tunables shared by the due-time checks
#[derive(Debug, Clone, Copy)]
pub struct DuePolicy {
    /// Initial retry delay after a failure; doubles per consecutive failure
    pub base_backoff: Duration,
    /// Age past which an ongoing claim is treated as abandoned
    pub max_ongoing_age: Duration,
}

impl Default for DuePolicy {
    fn default() -> Self {
        Self {
            base_backoff: Duration::seconds(1800),
            max_ongoing_age: Duration::hours(12),
        }
    }
}

/// Why a job was passed over in this invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Not yet due; `due_at` is absent when a backfill job owes no dates
    NotDue { due_at: Option<DateTime<Utc>> },
    /// The dependency's most recent attempt failed
    BlockedByFailure { dependency: AppName },
    /// The dependency has never succeeded
    DependencyNotRun { dependency: AppName },
    /// The dependency is overdue itself, so its output is stale
    DependencyNotFresh { dependency: AppName },
    /// Another invocation holds a fresh ongoing claim
    Ongoing { since: DateTime<Utc> },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotDue { due_at: Some(at) } => write!(f, "not due until {}", at),
            SkipReason::NotDue { due_at: None } => write!(f, "no dates owed"),
            SkipReason::BlockedByFailure { dependency } => {
                write!(f, "{} errored last time it ran", dependency)
            }
            SkipReason::DependencyNotRun { dependency } => {
                write!(f, "{} hasn't been run yet", dependency)
            }
            SkipReason::DependencyNotFresh { dependency } => {
                write!(f, "{} hasn't recently run", dependency)
            }
            SkipReason::Ongoing { since } => write!(f, "ongoing since {}", since),
        }
    }
}

/// A dependency's descriptor and current state, as read at the start of
/// the dependent's step
#[derive(Debug, Clone, Copy)]
pub struct DependencyView<'a> {
    pub descriptor: &'a JobDescriptor,
    pub state: Option<&'a JobState>,
}

/// Retry delay after `error_count` consecutive failures, capped at one
/// full period so a flapping job never falls behind its own schedule.
pub fn backoff(policy: &DuePolicy, frequency: &Frequency, error_count: u32) -> Duration {
    let exponent = error_count.saturating_sub(1).min(30);
    let seconds = policy
        .base_backoff
        .num_seconds()
        .saturating_mul(1_i64 << exponent);
    Duration::seconds(seconds.min(frequency.seconds()))
}

/// The earliest instant the job becomes due, or `None` when it is due
/// immediately.
pub fn due_at(
    descriptor: &JobDescriptor,
    state: Option<&JobState>,
    policy: &DuePolicy,
) -> Option<DateTime<Utc>> {
    let state = state?;
    if state.last_error.is_some() {
        let last_run = state.last_run?;
        return Some(last_run + backoff(policy, &descriptor.frequency, state.error_count));
    }
    let last_success = state.last_success?;
    Some(schedule_after(&descriptor.frequency, last_success))
}

/// The next due instant one period after `from`, advanced to the anchor
/// time of day when one is set.
pub fn schedule_after(frequency: &Frequency, from: DateTime<Utc>) -> DateTime<Utc> {
    let base = from + frequency.interval();
    match frequency.anchor() {
        Some(anchor) => next_anchor_occurrence(base, anchor),
        None => base,
    }
}

/// Decide whether the job may run now; `Err` carries the skip reason.
pub fn runnable(
    descriptor: &JobDescriptor,
    state: Option<&JobState>,
    dependencies: &[DependencyView<'_>],
    now: DateTime<Utc>,
    policy: &DuePolicy,
    force: bool,
) -> Result<(), SkipReason> {
    // (c) a fresh ongoing claim blocks even --force
    if let Some(since) = state.and_then(|s| s.ongoing) {
        if now - since < policy.max_ongoing_age {
            return Err(SkipReason::Ongoing { since });
        }
    }

    if force && !descriptor.is_backfill {
        return Ok(());
    }

    // (b) dependencies must have succeeded at their most recent attempt
    for dep in dependencies {
        let name = || dep.descriptor.app_name.clone();
        let Some(dep_state) = dep.state else {
            return Err(SkipReason::DependencyNotRun { dependency: name() });
        };
        if dep_state.last_error.is_some() {
            return Err(SkipReason::BlockedByFailure { dependency: name() });
        }
        if dep_state.last_success.is_none() {
            return Err(SkipReason::DependencyNotRun { dependency: name() });
        }
        match dep_state.next_run {
            Some(next_run) if next_run >= now => {}
            _ => return Err(SkipReason::DependencyNotFresh { dependency: name() }),
        }
    }

    // (a) due-at has passed
    if descriptor.is_backfill {
        if owed_dates(descriptor, state, now).is_empty() {
            return Err(SkipReason::NotDue {
                due_at: state.and_then(|s| s.next_run),
            });
        }
    } else if let Some(at) = due_at(descriptor, state, policy) {
        if at > now {
            return Err(SkipReason::NotDue { due_at: Some(at) });
        }
    }

    Ok(())
}

/// First occurrence of `anchor` at or after `at`, in UTC
fn next_anchor_occurrence(at: DateTime<Utc>, anchor: NaiveTime) -> DateTime<Utc> {
    let candidate = at.date_naive().and_time(anchor).and_utc();
    if candidate >= at {
        candidate
    } else {
        candidate + Duration::days(1)
    }
}
