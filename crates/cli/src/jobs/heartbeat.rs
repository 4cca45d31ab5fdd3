// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Demo job: appends a timestamp line to a file on every run

use anyhow::Context;
use std::io::Write;
use std::path::PathBuf;
use tabber_core::JobApp;

pub struct HeartbeatJob {
    path: PathBuf,
}

impl HeartbeatJob {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl JobApp for HeartbeatJob {
    fn app_name(&self) -> &str {
        "heartbeat"
    }

    fn execute(&self) -> anyhow::Result<()> {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening heartbeat file {:?}", self.path))?;
        writeln!(file, "Now is {}", chrono::Utc::now().to_rfc3339())
            .with_context(|| format!("writing heartbeat file {:?}", self.path))?;
        Ok(())
    }
}
