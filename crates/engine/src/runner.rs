// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One invocation's walk over the configured jobs
//!
//! The runner acquires the process gate, visits jobs in dependency order,
//! executes whatever is due, commits each outcome in its own transaction
//! and releases the gate. A job failure is recorded and the walk moves on
//! to independent subtrees; only lock conflicts and store faults abort
//! the invocation.

use std::panic::{catch_unwind, AssertUnwindSafe};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use tabber_core::{
    aligned_floor, backoff, owed_dates, runnable, schedule_after, Clock, DependencyView,
    DuePolicy, JobError, JobState, SkipReason,
};
use tabber_storage::{ProcessGate, StateStore};

use crate::error::RunnerError;
use crate::registry::{RegisteredJob, Registry};

/// Per-invocation options from the CLI surface
#[derive(Debug, Clone, Default)]
pub struct RunnerOptions {
    /// Restrict the walk to one job (`--job`), by app name or class path
    pub only_job: Option<String>,
    /// Bypass due-time and dependency checks (`--force`)
    pub force: bool,
    pub policy: DuePolicy,
}

/// What one invocation did, job by job
#[derive(Debug, Default)]
pub struct RunOutcome {
    /// Jobs whose row claim was taken and whose execute ran
    pub attempted: Vec<String>,
    /// Attempted jobs whose execute failed
    pub failed: Vec<(String, JobError)>,
    /// Jobs passed over, with the reason
    pub skipped: Vec<(String, SkipReason)>,
}

impl RunOutcome {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    /// 0 when every attempted job succeeded, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        if self.all_succeeded() {
            0
        } else {
            1
        }
    }
}

enum StepOutcome {
    Succeeded,
    Failed(JobError),
    Skipped(SkipReason),
}

/// Executes one invocation against the registry and state store
pub struct Runner<'a, C: Clock> {
    registry: &'a Registry,
    store: &'a mut StateStore,
    clock: C,
    options: RunnerOptions,
}

impl<'a, C: Clock> Runner<'a, C> {
    pub fn new(
        registry: &'a Registry,
        store: &'a mut StateStore,
        clock: C,
        options: RunnerOptions,
    ) -> Self {
        Self {
            registry,
            store,
            clock,
            options,
        }
    }

    /// Run the invocation: gate, walk, release.
    pub fn run(mut self) -> Result<RunOutcome, RunnerError> {
        if let Some(filter) = &self.options.only_job {
            let job = self
                .registry
                .get(filter)
                .ok_or_else(|| RunnerError::UnknownJobFilter(filter.clone()))?;
            if job.descriptor.is_backfill {
                return Err(RunnerError::BackfillFilter(
                    job.descriptor.app_name.to_string(),
                ));
            }
        }
        let order = self.registry.topo_order()?;

        let gate = ProcessGate::acquire(
            self.store,
            self.clock.now(),
            self.options.policy.max_ongoing_age,
        )?;
        let walked = self.walk(&order);
        // release the gate on the failure paths too; a crash in between is
        // recovered by the stale-claim rule
        let released = gate.release(self.store);
        let outcome = walked?;
        released?;
        Ok(outcome)
    }

    fn walk(&mut self, order: &[&RegisteredJob]) -> Result<RunOutcome, RunnerError> {
        let mut outcome = RunOutcome::default();
        for job in order {
            let name = job.descriptor.app_name.to_string();
            if let Some(filter) = &self.options.only_job {
                if *filter != name && *filter != job.descriptor.class_path {
                    continue;
                }
            }
            match self.step(job)? {
                StepOutcome::Succeeded => outcome.attempted.push(name),
                StepOutcome::Failed(error) => {
                    outcome.attempted.push(name.clone());
                    outcome.failed.push((name, error));
                }
                StepOutcome::Skipped(reason) => {
                    debug!(app = %name, %reason, "skipping");
                    outcome.skipped.push((name, reason));
                }
            }
        }
        Ok(outcome)
    }

    /// One job's step. Scheduling reads happen here, at the start of the
    /// step, so earlier jobs in the same walk are observed.
    fn step(&mut self, job: &RegisteredJob) -> Result<StepOutcome, RunnerError> {
        let descriptor = &job.descriptor;
        let name = descriptor.app_name.as_str();
        let now = self.clock.now();

        let state = self.store.get(name)?;
        let dep_pairs: Vec<(&RegisteredJob, Option<JobState>)> = descriptor
            .depends_on
            .iter()
            .filter_map(|dep| self.registry.get(dep.as_str()))
            .map(|dep| {
                let dep_state = self.store.get(dep.descriptor.app_name.as_str())?;
                Ok((dep, dep_state))
            })
            .collect::<Result<_, RunnerError>>()?;
        let deps: Vec<DependencyView<'_>> = dep_pairs
            .iter()
            .map(|(dep, dep_state)| DependencyView {
                descriptor: &dep.descriptor,
                state: dep_state.as_ref(),
            })
            .collect();

        if let Err(reason) = runnable(
            descriptor,
            state.as_ref(),
            &deps,
            now,
            &self.options.policy,
            self.options.force,
        ) {
            return Ok(StepOutcome::Skipped(reason));
        }

        // claim the row; a lost claim aborts the invocation with exit 2
        let origin = if descriptor.is_backfill {
            aligned_floor(now, &descriptor.frequency)
        } else {
            now
        };
        let declared: Vec<String> = descriptor
            .depends_on
            .iter()
            .map(|d| d.to_string())
            .collect();
        self.store.upsert_pre_run(
            name,
            now,
            origin,
            &declared,
            self.options.policy.max_ongoing_age,
        )?;

        debug!(app = name, "about to run");
        if descriptor.is_backfill {
            self.run_backfill(job, state.as_ref(), now)
        } else {
            self.run_once(job, state.as_ref(), now)
        }
    }

    fn run_once(
        &mut self,
        job: &RegisteredJob,
        state: Option<&JobState>,
        started_at: DateTime<Utc>,
    ) -> Result<StepOutcome, RunnerError> {
        let descriptor = &job.descriptor;
        let name = descriptor.app_name.as_str();
        let timer = std::time::Instant::now();
        let result = guarded(|| job.app.execute());
        let elapsed = timer.elapsed().as_secs_f64();

        match result {
            Ok(()) => {
                let next_due = schedule_after(&descriptor.frequency, started_at);
                self.store
                    .commit_success(name, started_at, next_due, started_at, elapsed)?;
                info!(app = name, "ran successfully");
                Ok(StepOutcome::Succeeded)
            }
            Err(error) => {
                let failures = state.map(|s| s.error_count).unwrap_or(0) + 1;
                let next_due = started_at
                    + backoff(&self.options.policy, &descriptor.frequency, failures);
                self.store
                    .commit_failure(name, started_at, next_due, &error, elapsed)?;
                warn!(app = name, error = %error.message, "run failed");
                Ok(StepOutcome::Failed(error))
            }
        }
    }

    fn run_backfill(
        &mut self,
        job: &RegisteredJob,
        state: Option<&JobState>,
        started_at: DateTime<Utc>,
    ) -> Result<StepOutcome, RunnerError> {
        let descriptor = &job.descriptor;
        let name = descriptor.app_name.as_str();
        let dates = owed_dates(descriptor, state, started_at);

        for date in dates {
            let timer = std::time::Instant::now();
            let result = guarded(|| job.app.execute_backfill(date));
            let elapsed = timer.elapsed().as_secs_f64();

            match result {
                Ok(()) => {
                    // advance the date cursor before the next date runs
                    let next_due = date + descriptor.frequency.interval();
                    self.store
                        .commit_success(name, date, next_due, started_at, elapsed)?;
                    info!(app = name, date = %date.date_naive(), "backfilled");
                }
                Err(error) => {
                    // the same date is retried on the next invocation
                    self.store
                        .commit_failure(name, started_at, date, &error, elapsed)?;
                    warn!(
                        app = name,
                        date = %date.date_naive(),
                        error = %error.message,
                        "backfill halted"
                    );
                    return Ok(StepOutcome::Failed(error));
                }
            }
        }
        Ok(StepOutcome::Succeeded)
    }
}

/// Run a job's execute without letting a panic cross the per-job boundary.
fn guarded<F: FnOnce() -> anyhow::Result<()>>(f: F) -> Result<(), JobError> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(error)) => Err(JobError::from_fault(&error)),
        Err(payload) => Err(JobError::from_panic(payload.as_ref())),
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
