// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in job apps shipped with the binary
//!
//! Users normally link the engine crates and register their own apps; the
//! binary ships a demo job and the store's own maintenance job so a fresh
//! install has something real to schedule.

mod heartbeat;
mod log_prune;

use crate::config::FileConfig;
use std::sync::Arc;
use tabber_engine::StaticLoader;

pub use heartbeat::HeartbeatJob;
pub use log_prune::LogPruneJob;

/// Loader over the compiled-in job catalog
pub fn builtin_loader(config: &FileConfig) -> StaticLoader {
    let mut loader = StaticLoader::new();
    loader.register(
        "builtin.heartbeat",
        Arc::new(HeartbeatJob::new(config.builtin.heartbeat_file.clone())),
    );
    loader.register(
        "builtin.log-prune",
        Arc::new(LogPruneJob::new(
            config.database.path.clone(),
            config.builtin.log_retention_days,
        )),
    );
    loader
}
