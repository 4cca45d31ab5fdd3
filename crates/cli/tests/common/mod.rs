// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test utilities for CLI integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A scratch directory with a config file pointing at its own state
/// database and heartbeat file.
pub struct TestEnv {
    pub dir: TempDir,
    pub config_path: PathBuf,
}

impl TestEnv {
    pub fn with_jobs(jobs: &str) -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let config_path = dir.path().join("admin.toml");
        let config = format!(
            r#"
[crontabber]
jobs = """
{jobs}
"""

[database]
path = {db:?}

[builtin]
heartbeat_file = {heartbeat:?}
"#,
            jobs = jobs,
            db = dir.path().join("state.db"),
            heartbeat = dir.path().join("heartbeat.log"),
        );
        fs::write(&config_path, config).expect("write config");
        Self { dir, config_path }
    }

    pub fn conf(&self) -> &str {
        self.config_path.to_str().expect("utf-8 path")
    }

    pub fn heartbeat_path(&self) -> PathBuf {
        self.dir.path().join("heartbeat.log")
    }

    pub fn heartbeat_lines(&self) -> usize {
        read_lines(&self.heartbeat_path())
    }
}

pub fn read_lines(path: &Path) -> usize {
    fs::read_to_string(path)
        .map(|text| text.lines().count())
        .unwrap_or(0)
}
