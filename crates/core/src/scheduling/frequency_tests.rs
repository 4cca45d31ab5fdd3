// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::frequency::Frequency;
use crate::error::ConfigError;
use chrono::NaiveTime;
use yare::parameterized;

#[parameterized(
    one_minute = { "1m", 60 },
    thirty_minutes = { "30m", 1800 },
    two_hours = { "2h", 7200 },
    one_day = { "1d", 86_400 },
    one_week = { "7d", 7 * 86_400 },
)]
fn parses_magnitude_and_unit(input: &str, expected: i64) {
    let freq = Frequency::parse(input, None).unwrap();
    assert_eq!(freq.seconds(), expected);
    assert!(freq.anchor().is_none());
}

#[parameterized(
    empty = { "" },
    bare_number = { "30" },
    bare_unit = { "d" },
    zero = { "0m" },
    negative = { "-1d" },
    fractional = { "1.5d" },
    seconds_unit = { "30s" },
    weeks_unit = { "2w" },
    spaced = { "1 d" },
)]
fn rejects_bad_frequencies(input: &str) {
    assert!(matches!(
        Frequency::parse(input, None),
        Err(ConfigError::BadFrequency(_))
    ));
}

#[test]
fn parses_daily_anchor() {
    let freq = Frequency::parse("1d", Some("03:30")).unwrap();
    assert_eq!(freq.anchor(), NaiveTime::from_hms_opt(3, 30, 0));
    assert!(freq.is_whole_days());
}

#[test]
fn anchor_allows_unpadded_fields() {
    let freq = Frequency::parse("2d", Some("9:5")).unwrap();
    assert_eq!(freq.anchor(), NaiveTime::from_hms_opt(9, 5, 0));
}

#[parameterized(
    minutes = { "30m" },
    hours = { "23h" },
    day_and_a_half = { "36h" },
)]
fn anchor_on_subdaily_frequency_is_rejected(freq: &str) {
    assert!(matches!(
        Frequency::parse(freq, Some("03:30")),
        Err(ConfigError::TimeOnSubdailyFrequency { .. })
    ));
}

#[parameterized(
    no_colon = { "0330" },
    hour_out_of_range = { "24:00" },
    minute_out_of_range = { "12:60" },
    words = { "noon" },
)]
fn rejects_bad_anchor_times(anchor: &str) {
    assert!(matches!(
        Frequency::parse("1d", Some(anchor)),
        Err(ConfigError::BadAnchorTime(_))
    ));
}

#[test]
fn display_includes_anchor() {
    let freq = Frequency::parse("2d", Some("02:00")).unwrap();
    assert_eq!(freq.to_string(), "2d @ 02:00");
    let freq = Frequency::parse("90m", None).unwrap();
    assert_eq!(freq.to_string(), "90m");
    let freq = Frequency::parse("6h", None).unwrap();
    assert_eq!(freq.to_string(), "6h");
}
