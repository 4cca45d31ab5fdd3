// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job registry: from configuration lines to loaded job apps
//!
//! Each non-empty line of the jobs string is `class_path|frequency[|HH:MM]`.
//! Class paths are opaque keys resolved through a [`JobLoader`]; the
//! registry itself never touches the state store, so it is a pure function
//! of the configuration string and the loader.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tabber_core::{AppName, ConfigError, Frequency, JobApp, JobDescriptor};

/// Materializes a job app from an opaque class path
pub trait JobLoader {
    fn load(&self, class_path: &str) -> Option<Arc<dyn JobApp>>;
}

/// Map-based loader populated at program start
#[derive(Default)]
pub struct StaticLoader {
    apps: HashMap<String, Arc<dyn JobApp>>,
}

impl StaticLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, class_path: impl Into<String>, app: Arc<dyn JobApp>) {
        self.apps.insert(class_path.into(), app);
    }
}

impl JobLoader for StaticLoader {
    fn load(&self, class_path: &str) -> Option<Arc<dyn JobApp>> {
        self.apps.get(class_path).cloned()
    }
}

/// One configured job: its descriptor plus the loaded app
#[derive(Clone)]
pub struct RegisteredJob {
    pub descriptor: JobDescriptor,
    pub app: Arc<dyn JobApp>,
}

/// All configured jobs, in configuration order
pub struct Registry {
    jobs: Vec<RegisteredJob>,
}

/// A parsed `class_path|frequency[|HH:MM]` line, before loading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobLine<'a> {
    pub class_path: &'a str,
    pub frequency: Frequency,
}

/// Split the multi-line jobs string into job lines. Lines are separated
/// by newlines, commas or semicolons; blanks and `#` comments are skipped.
pub fn split_lines(spec: &str) -> Vec<&str> {
    spec.split(['\n', ',', ';'])
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect()
}

/// Parse a single job line.
///
/// A lone extra field containing `:` is shorthand for a daily run at that
/// time: `jobs.foo|03:30` means `jobs.foo|1d|03:30`.
pub fn parse_line(line: &str) -> Result<JobLine<'_>, ConfigError> {
    let mut fields = line.split('|').map(str::trim);
    let class_path = fields.next().unwrap_or_default();
    let fields: Vec<&str> = fields.collect();
    let (freq, anchor) = match fields.as_slice() {
        [] => return Err(ConfigError::BadJobLine(line.to_string())),
        [single] if single.contains(':') => ("1d", Some(*single)),
        [freq] => (*freq, None),
        [freq, anchor] => (*freq, Some(*anchor)),
        _ => return Err(ConfigError::BadJobLine(line.to_string())),
    };
    Ok(JobLine {
        class_path,
        frequency: Frequency::parse(freq, anchor)?,
    })
}

impl Registry {
    /// Build the registry from the jobs string, resolving every class path
    /// through `loader` and validating identifiers and dependencies.
    pub fn from_config(jobs_spec: &str, loader: &dyn JobLoader) -> Result<Self, ConfigError> {
        let mut jobs: Vec<RegisteredJob> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for line in split_lines(jobs_spec) {
            let parsed = parse_line(line)?;
            let app = loader
                .load(parsed.class_path)
                .ok_or_else(|| ConfigError::UnknownJob(parsed.class_path.to_string()))?;
            let app_name = app.app_name().to_string();
            if !seen.insert(app_name.clone()) {
                return Err(ConfigError::DuplicateIdentifier(app_name));
            }
            let descriptor = JobDescriptor {
                app_name: AppName::new(&app_name),
                class_path: parsed.class_path.to_string(),
                frequency: parsed.frequency,
                depends_on: app.depends_on().into_iter().map(AppName::from).collect(),
                is_backfill: app.is_backfill(),
            };
            jobs.push(RegisteredJob { descriptor, app });
        }

        for job in &jobs {
            for dep in &job.descriptor.depends_on {
                if !seen.contains(dep.as_str()) {
                    return Err(ConfigError::UnknownDependency {
                        job: job.descriptor.app_name.to_string(),
                        dependency: dep.to_string(),
                    });
                }
            }
        }

        Ok(Self { jobs })
    }

    /// Build as much of the registry as the configuration allows,
    /// collecting one error per misconfigured job instead of stopping at
    /// the first. Bad lines, unresolvable class paths, every duplicate
    /// occurrence past the first, every job with an unknown dependency and
    /// every dependency-cycle participant each contribute one error, so
    /// the error count is the count of misconfigured jobs.
    ///
    /// The returned registry holds the jobs that did load; it is meant for
    /// reporting surfaces and is not guaranteed to be orderable.
    pub fn diagnose(jobs_spec: &str, loader: &dyn JobLoader) -> (Self, Vec<ConfigError>) {
        let mut jobs: Vec<RegisteredJob> = Vec::new();
        let mut errors: Vec<ConfigError> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for line in split_lines(jobs_spec) {
            let parsed = match parse_line(line) {
                Ok(parsed) => parsed,
                Err(error) => {
                    errors.push(error);
                    continue;
                }
            };
            let Some(app) = loader.load(parsed.class_path) else {
                errors.push(ConfigError::UnknownJob(parsed.class_path.to_string()));
                continue;
            };
            let app_name = app.app_name().to_string();
            if !seen.insert(app_name.clone()) {
                errors.push(ConfigError::DuplicateIdentifier(app_name));
                continue;
            }
            let descriptor = JobDescriptor {
                app_name: AppName::new(&app_name),
                class_path: parsed.class_path.to_string(),
                frequency: parsed.frequency,
                depends_on: app.depends_on().into_iter().map(AppName::from).collect(),
                is_backfill: app.is_backfill(),
            };
            jobs.push(RegisteredJob { descriptor, app });
        }

        for job in &jobs {
            if let Some(dep) = job
                .descriptor
                .depends_on
                .iter()
                .find(|dep| !seen.contains(dep.as_str()))
            {
                errors.push(ConfigError::UnknownDependency {
                    job: job.descriptor.app_name.to_string(),
                    dependency: dep.to_string(),
                });
            }
        }

        let descriptors: Vec<JobDescriptor> =
            jobs.iter().map(|job| job.descriptor.clone()).collect();
        for member in tabber_core::cycle_members(&descriptors) {
            errors.push(ConfigError::DependencyCycle(
                descriptors[member].app_name.to_string(),
            ));
        }

        (Self { jobs }, errors)
    }

    /// Jobs in configuration order
    pub fn jobs(&self) -> &[RegisteredJob] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Look a job up by app name or by class path
    pub fn get(&self, key: &str) -> Option<&RegisteredJob> {
        self.jobs
            .iter()
            .find(|job| job.descriptor.app_name.as_str() == key || job.descriptor.class_path == key)
    }

    /// Jobs in dependency order, deterministic on configuration-order ties
    pub fn topo_order(&self) -> Result<Vec<&RegisteredJob>, ConfigError> {
        let descriptors: Vec<JobDescriptor> =
            self.jobs.iter().map(|job| job.descriptor.clone()).collect();
        let order = tabber_core::topo_order(&descriptors)?;
        Ok(order.into_iter().map(|i| &self.jobs[i]).collect())
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
