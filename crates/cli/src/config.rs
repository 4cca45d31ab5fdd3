// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TOML configuration file loading
//!
//! The jobs themselves live in one multi-line string so the file reads
//! like a crontab: one `class_path|frequency[|HH:MM]` entry per line.

use anyhow::{Context, Result};
use chrono::Duration;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tabber_core::DuePolicy;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    pub crontabber: CrontabberConfig,
    pub database: DatabaseConfig,
    pub builtin: BuiltinConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CrontabberConfig {
    /// Job lines, one `class_path|frequency[|HH:MM]` per line
    pub jobs: String,
    /// Age past which a stale ongoing claim may be reclaimed
    pub max_ongoing_age_hours: f64,
    /// Initial retry delay after a failure
    pub base_backoff_seconds: u64,
}

impl Default for CrontabberConfig {
    fn default() -> Self {
        Self {
            jobs: String::new(),
            max_ongoing_age_hours: 12.0,
            base_backoff_seconds: 1800,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database holding job state, run log and the gate
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BuiltinConfig {
    /// File the heartbeat demo job appends to
    pub heartbeat_file: PathBuf,
    /// Run-log rows older than this are pruned by builtin.log-prune
    pub log_retention_days: u32,
}

impl Default for BuiltinConfig {
    fn default() -> Self {
        Self {
            heartbeat_file: PathBuf::from("tabber-heartbeat.log"),
            log_retention_days: 90,
        }
    }
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("failed to parse config file {:?}", path))
    }

    pub fn database_path(&self) -> Result<&Path> {
        self.database
            .path
            .as_deref()
            .context("database.path is not configured")
    }

    pub fn policy(&self) -> DuePolicy {
        DuePolicy {
            base_backoff: Duration::seconds(self.crontabber.base_backoff_seconds as i64),
            max_ongoing_age: Duration::seconds(
                (self.crontabber.max_ongoing_age_hours * 3600.0) as i64,
            ),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
