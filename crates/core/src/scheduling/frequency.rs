// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Frequency parsing: `30m`, `2h`, `3d`, with an optional `HH:MM` anchor
//!
//! The anchor pins a whole-day frequency to a wall-clock time of day in
//! the store's session time zone (UTC). Anchors on sub-daily frequencies
//! are a configuration error.

use crate::error::ConfigError;
use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

const DAY_SECONDS: i64 = 24 * 60 * 60;

/// A run period plus optional wall-clock anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frequency {
    seconds: i64,
    anchor: Option<NaiveTime>,
}

impl Frequency {
    /// Parse a frequency string and optional `HH:MM` anchor field.
    pub fn parse(freq: &str, anchor: Option<&str>) -> Result<Self, ConfigError> {
        let seconds = parse_seconds(freq)?;
        let anchor = match anchor {
            Some(text) => {
                if seconds % DAY_SECONDS != 0 {
                    return Err(ConfigError::TimeOnSubdailyFrequency {
                        anchor: text.to_string(),
                        frequency: freq.to_string(),
                    });
                }
                Some(parse_anchor(text)?)
            }
            None => None,
        };
        Ok(Self { seconds, anchor })
    }

    /// Period between scheduled runs
    pub fn interval(&self) -> Duration {
        Duration::seconds(self.seconds)
    }

    pub fn seconds(&self) -> i64 {
        self.seconds
    }

    /// Wall-clock time of day the run is pinned to, if any
    pub fn anchor(&self) -> Option<NaiveTime> {
        self.anchor
    }

    pub fn is_whole_days(&self) -> bool {
        self.seconds % DAY_SECONDS == 0
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.seconds % DAY_SECONDS == 0 {
            write!(f, "{}d", self.seconds / DAY_SECONDS)?;
        } else if self.seconds % 3600 == 0 {
            write!(f, "{}h", self.seconds / 3600)?;
        } else {
            write!(f, "{}m", self.seconds / 60)?;
        }
        if let Some(anchor) = self.anchor {
            write!(f, " @ {}", anchor.format("%H:%M"))?;
        }
        Ok(())
    }
}

fn parse_seconds(input: &str) -> Result<i64, ConfigError> {
    let bad = || ConfigError::BadFrequency(input.to_string());
    let trimmed = input.trim();
    let unit = trimmed.chars().last().ok_or_else(bad)?;
    let magnitude = &trimmed[..trimmed.len() - unit.len_utf8()];
    if magnitude.is_empty() {
        return Err(bad());
    }
    let n: i64 = magnitude.parse().map_err(|_| bad())?;
    if n <= 0 {
        return Err(bad());
    }
    let per_unit = match unit {
        'm' => 60,
        'h' => 60 * 60,
        'd' => DAY_SECONDS,
        _ => return Err(bad()),
    };
    Ok(n * per_unit)
}

fn parse_anchor(input: &str) -> Result<NaiveTime, ConfigError> {
    let bad = || ConfigError::BadAnchorTime(input.to_string());
    let (h, m) = input.trim().split_once(':').ok_or_else(bad)?;
    let h: u32 = h.parse().map_err(|_| bad())?;
    let m: u32 = m.parse().map_err(|_| bad())?;
    NaiveTime::from_hms_opt(h, m, 0).ok_or_else(bad)
}
