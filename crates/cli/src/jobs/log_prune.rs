// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Maintenance job: prunes old run-log rows from the state database

use anyhow::Context;
use chrono::{Duration, Utc};
use std::path::PathBuf;
use tabber_core::JobApp;
use tabber_storage::StateStore;
use tracing::info;

pub struct LogPruneJob {
    db_path: Option<PathBuf>,
    retention_days: u32,
}

impl LogPruneJob {
    pub fn new(db_path: Option<PathBuf>, retention_days: u32) -> Self {
        Self {
            db_path,
            retention_days,
        }
    }
}

impl JobApp for LogPruneJob {
    fn app_name(&self) -> &str {
        "log-prune"
    }

    fn execute(&self) -> anyhow::Result<()> {
        let path = self
            .db_path
            .as_deref()
            .context("database.path is not configured")?;
        let mut store = StateStore::open(path)?;
        let cutoff = Utc::now() - Duration::days(i64::from(self.retention_days));
        let removed = store.prune_log(cutoff)?;
        info!(removed, "pruned old run-log rows");
        Ok(())
    }
}
