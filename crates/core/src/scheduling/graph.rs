// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dependency ordering over job descriptors
//!
//! Edges run dependency -> dependent. The produced order is deterministic:
//! whenever the DAG permits a choice, the job that appears earlier in the
//! configuration list runs first, so user ordering is preserved.

use crate::error::ConfigError;
use crate::job::JobDescriptor;
use std::collections::HashMap;

/// Compute a topological visit order over `jobs`, returned as indices into
/// the input slice.
///
/// Dependencies must already be validated against the descriptor set;
/// unknown names are reported here as well so the function stands alone.
pub fn topo_order(jobs: &[JobDescriptor]) -> Result<Vec<usize>, ConfigError> {
    let index_by_name: HashMap<&str, usize> = jobs
        .iter()
        .enumerate()
        .map(|(i, job)| (job.app_name.as_str(), i))
        .collect();

    // indegree = number of unvisited dependencies
    let mut indegree = vec![0usize; jobs.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); jobs.len()];
    for (i, job) in jobs.iter().enumerate() {
        for dep in &job.depends_on {
            let d = *index_by_name.get(dep.as_str()).ok_or_else(|| {
                ConfigError::UnknownDependency {
                    job: job.app_name.to_string(),
                    dependency: dep.to_string(),
                }
            })?;
            dependents[d].push(i);
            indegree[i] += 1;
        }
    }

    let mut order = Vec::with_capacity(jobs.len());
    let mut visited = vec![false; jobs.len()];
    while order.len() < jobs.len() {
        // lowest configuration index among the ready jobs
        let next = (0..jobs.len()).find(|&i| !visited[i] && indegree[i] == 0);
        let Some(next) = next else {
            // everything left is on a cycle; name the earliest participant
            let stuck = (0..jobs.len())
                .find(|&i| !visited[i])
                .map(|i| jobs[i].app_name.to_string())
                .unwrap_or_default();
            return Err(ConfigError::DependencyCycle(stuck));
        };
        visited[next] = true;
        order.push(next);
        for &dependent in &dependents[next] {
            indegree[dependent] -= 1;
        }
    }
    Ok(order)
}

/// Indices of every job that sits on a dependency cycle, in configuration
/// order. Jobs upstream or downstream of a cycle are not members; unknown
/// dependency names are ignored here ([`topo_order`] reports those).
pub fn cycle_members(jobs: &[JobDescriptor]) -> Vec<usize> {
    let index_by_name: HashMap<&str, usize> = jobs
        .iter()
        .enumerate()
        .map(|(i, job)| (job.app_name.as_str(), i))
        .collect();

    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); jobs.len()];
    for (i, job) in jobs.iter().enumerate() {
        for dep in &job.depends_on {
            if let Some(&d) = index_by_name.get(dep.as_str()) {
                dependents[d].push(i);
            }
        }
    }

    // a job is on a cycle iff it can reach itself through its dependents
    (0..jobs.len())
        .filter(|&start| {
            let mut stack = dependents[start].clone();
            let mut visited = vec![false; jobs.len()];
            while let Some(node) = stack.pop() {
                if node == start {
                    return true;
                }
                if !visited[node] {
                    visited[node] = true;
                    stack.extend(&dependents[node]);
                }
            }
            false
        })
        .collect()
}
