// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Admin reports over the registry and state store
//!
//! These back the `--list`, `--nagios`, `--configtest` and
//! `--audit-ghosts` surfaces. They only read; the runner is the sole
//! writer of job state.

use chrono::{DateTime, Duration, Utc};
use std::fmt::Write as _;

use tabber_core::ConfigError;
use tabber_storage::{StateStore, StoreError};

use crate::registry::{JobLoader, Registry};

const TIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

/// Health summary severity, ordered worst-last
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NagiosStatus {
    Ok,
    Warning,
    Critical,
}

impl NagiosStatus {
    pub fn exit_code(self) -> i32 {
        match self {
            NagiosStatus::Ok => 0,
            NagiosStatus::Warning => 1,
            NagiosStatus::Critical => 2,
        }
    }
}

/// Single-line machine-checkable health summary from the run log.
///
/// A failing backfill job that has failed exactly once is a warning (it
/// retries the same date next invocation); any other failure is critical.
pub fn nagios_report(
    registry: &Registry,
    store: &StateStore,
) -> Result<(NagiosStatus, String), StoreError> {
    let mut warnings = Vec::new();
    let mut criticals = Vec::new();

    for job in registry.jobs() {
        let name = job.descriptor.app_name.as_str();
        let Some(latest) = store.latest_log(name)? else {
            continue;
        };
        if latest.success {
            continue;
        }
        let error_count = store.get(name)?.map(|s| s.error_count).unwrap_or(0);
        let error = latest.error.unwrap_or_else(|| tabber_core::JobError {
            kind: "Error".to_string(),
            message: String::new(),
            traceback: String::new(),
        });
        let item = format!(
            "{} ({}) | {} | {}",
            name, job.descriptor.class_path, error.kind, error.message
        );
        if job.descriptor.is_backfill && error_count == 1 {
            warnings.push(item);
        } else {
            criticals.push(item);
        }
    }

    Ok(if !criticals.is_empty() {
        (
            NagiosStatus::Critical,
            format!("CRITICAL - {}", criticals.join("; ")),
        )
    } else if !warnings.is_empty() {
        (
            NagiosStatus::Warning,
            format!("WARNING - {}", warnings.join("; ")),
        )
    } else {
        (NagiosStatus::Ok, "OK - All systems nominal".to_string())
    })
}

/// Human-readable dump of every configured job and its state, followed by
/// any configuration errors (bad lines, duplicates, dependency cycles)
pub fn list_report(
    registry: &Registry,
    store: &StateStore,
    errors: &[ConfigError],
    now: DateTime<Utc>,
) -> Result<String, StoreError> {
    const PAD: usize = 15;
    let mut out = String::new();

    for job in registry.jobs() {
        let descriptor = &job.descriptor;
        let _ = writeln!(out, "=== JOB {}", "=".repeat(72));
        let _ = writeln!(out, "{:<PAD$} {}", "Class:", descriptor.class_path);
        let _ = writeln!(out, "{:<PAD$} {}", "App name:", descriptor.app_name);
        let _ = writeln!(out, "{:<PAD$} {}", "Frequency:", descriptor.frequency);

        let Some(state) = store.get(descriptor.app_name.as_str())? else {
            let _ = writeln!(out, "*NO PREVIOUS RUN INFO*");
            let _ = writeln!(out);
            continue;
        };

        if let Some(ongoing) = state.ongoing {
            let _ = writeln!(
                out,
                "{:<PAD$} Started {} ago",
                "Ongoing now!",
                ago(now - ongoing)
            );
        }
        match state.last_run {
            Some(at) => {
                let _ = writeln!(
                    out,
                    "{:<PAD$} {:<20} ({} ago)",
                    "Last run:",
                    at.format(TIME_FMT),
                    ago(now - at)
                );
            }
            None => {
                let _ = writeln!(out, "{:<PAD$} none", "Last run:");
            }
        }
        match state.last_success {
            Some(at) => {
                let _ = writeln!(
                    out,
                    "{:<PAD$} {:<20} ({} ago)",
                    "Last success:",
                    at.format(TIME_FMT),
                    ago(now - at)
                );
            }
            None => {
                let _ = writeln!(out, "{:<PAD$} no previous successful run", "Last success:");
            }
        }
        match state.next_run {
            Some(at) if at <= now => {
                let _ = writeln!(
                    out,
                    "{:<PAD$} {:<20} (was {} ago)",
                    "Next run:",
                    at.format(TIME_FMT),
                    ago(now - at)
                );
            }
            Some(at) => {
                let _ = writeln!(
                    out,
                    "{:<PAD$} {:<20} (in {})",
                    "Next run:",
                    at.format(TIME_FMT),
                    ago(at - now)
                );
            }
            None => {
                let _ = writeln!(out, "{:<PAD$} none", "Next run:");
            }
        }
        if let Some(error) = &state.last_error {
            let _ = writeln!(out, "{:<PAD$} ({} times)", "Error!!", state.error_count);
            let _ = writeln!(out, "{}", error.traceback.trim_end());
            let _ = writeln!(out, "{}: {}", error.kind, error.message);
        }
        let _ = writeln!(out);
    }

    if !errors.is_empty() {
        let _ = writeln!(out, "=== CONFIG ERRORS {}", "=".repeat(62));
        for error in errors {
            let _ = writeln!(out, "{}", error);
        }
        let _ = writeln!(out);
    }
    Ok(out)
}

/// Validate every configured job without running anything. One error is
/// collected per misconfigured job, so the number of errors returned is
/// the process exit code.
pub fn configtest(jobs_spec: &str, loader: &dyn JobLoader) -> Vec<ConfigError> {
    let (_, errors) = Registry::diagnose(jobs_spec, loader);
    errors
}

/// State-table rows whose app name no longer maps to a configured job
pub fn ghost_apps(registry: &Registry, store: &StateStore) -> Result<Vec<String>, StoreError> {
    Ok(store
        .items()?
        .into_iter()
        .map(|(name, _)| name)
        .filter(|name| registry.get(name).is_none())
        .collect())
}

/// Coarse humanized duration, largest unit only
fn ago(delta: Duration) -> String {
    let seconds = delta.num_seconds().max(0);
    if seconds >= 86_400 {
        plural(seconds / 86_400, "day")
    } else if seconds >= 3_600 {
        plural(seconds / 3_600, "hour")
    } else if seconds >= 60 {
        plural(seconds / 60, "minute")
    } else {
        plural(seconds, "second")
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", n, unit)
    }
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
