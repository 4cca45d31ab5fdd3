// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Owed-date enumeration for backfill jobs
//!
//! A backfill job is called exactly once per whole-period boundary from
//! its first run to now, in strictly increasing order. The date cursor is
//! the persisted `next_run`; each successful date commits before the next
//! date is attempted, so a crash or failure resumes at the same date.

use crate::job::JobDescriptor;
use crate::scheduling::Frequency;
use crate::state::JobState;
use chrono::{DateTime, NaiveTime, Utc};

/// Floor `now` to the frequency-aligned period boundary: midnight for
/// whole-day frequencies, else the last whole period since midnight.
pub fn aligned_floor(now: DateTime<Utc>, frequency: &Frequency) -> DateTime<Utc> {
    let midnight = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    if frequency.is_whole_days() {
        return midnight;
    }
    let elapsed = (now - midnight).num_seconds();
    let whole_periods = elapsed / frequency.seconds();
    midnight + chrono::Duration::seconds(whole_periods * frequency.seconds())
}

/// The ordered list of dates this backfill job still owes, up to and
/// including the largest boundary at or before `now`.
///
/// With no prior state the origin is the aligned floor of `now`, so a
/// brand-new job owes exactly the current period.
pub fn owed_dates(
    descriptor: &JobDescriptor,
    state: Option<&JobState>,
    now: DateTime<Utc>,
) -> Vec<DateTime<Utc>> {
    let cursor = state
        .and_then(|s| s.next_run.or(s.first_run))
        .unwrap_or_else(|| aligned_floor(now, &descriptor.frequency));

    let step = descriptor.frequency.interval();
    let mut owed = Vec::new();
    let mut date = cursor;
    while date <= now {
        owed.push(date);
        date += step;
    }
    owed
}
