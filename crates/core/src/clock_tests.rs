// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;

#[test]
fn system_clock_advances() {
    let clock = SystemClock;
    let a = clock.now();
    let b = clock.now();
    assert!(b >= a);
}

#[test]
fn fake_clock_is_pinned() {
    let start = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
    let clock = FakeClock::at(start);
    assert_eq!(clock.now(), start);
    assert_eq!(clock.now(), start);
}

#[test]
fn fake_clock_advance() {
    let start = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
    let clock = FakeClock::at(start);
    clock.advance(Duration::minutes(5));
    assert_eq!(clock.now(), start + Duration::minutes(5));
}

#[test]
fn fake_clock_set() {
    let clock = FakeClock::new();
    let target = Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap();
    clock.set(target);
    assert_eq!(clock.now(), target);
}

#[test]
fn fake_clock_clones_share_time() {
    let start = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
    let clock = FakeClock::at(start);
    let other = clock.clone();
    clock.advance(Duration::hours(1));
    assert_eq!(other.now(), start + Duration::hours(1));
}
