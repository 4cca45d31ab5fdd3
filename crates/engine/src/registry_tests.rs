// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::Arc;
use tabber_core::{ConfigError, JobApp};

struct PlainJob {
    name: String,
    deps: Vec<String>,
    backfill: bool,
}

impl PlainJob {
    fn app(name: &str) -> Arc<dyn JobApp> {
        Arc::new(Self {
            name: name.to_string(),
            deps: Vec::new(),
            backfill: false,
        })
    }

    fn with_deps(name: &str, deps: &[&str]) -> Arc<dyn JobApp> {
        Arc::new(Self {
            name: name.to_string(),
            deps: deps.iter().map(|d| d.to_string()).collect(),
            backfill: false,
        })
    }
}

impl JobApp for PlainJob {
    fn app_name(&self) -> &str {
        &self.name
    }

    fn depends_on(&self) -> Vec<String> {
        self.deps.clone()
    }

    fn is_backfill(&self) -> bool {
        self.backfill
    }

    fn execute(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

fn loader() -> StaticLoader {
    let mut loader = StaticLoader::new();
    loader.register("jobs.alpha", PlainJob::app("alpha"));
    loader.register("jobs.beta", PlainJob::with_deps("beta", &["alpha"]));
    loader.register("jobs.gamma", PlainJob::app("gamma"));
    loader
}

#[test]
fn split_lines_handles_all_separators_and_comments() {
    let spec = "
        jobs.a|5m, jobs.b|1h; jobs.c|1d
        # a comment line
        jobs.d|2d|03:00
    ";
    assert_eq!(
        split_lines(spec),
        ["jobs.a|5m", "jobs.b|1h", "jobs.c|1d", "jobs.d|2d|03:00"]
    );
}

#[test]
fn parse_line_variants() {
    assert_eq!(parse_line("jobs.a|5m").unwrap().class_path, "jobs.a");
    let anchored = parse_line("jobs.a|2d|03:00").unwrap();
    assert_eq!(anchored.frequency.to_string(), "2d @ 03:00");

    // a lone HH:MM field is shorthand for daily at that time
    let shorthand = parse_line("jobs.a|03:30").unwrap();
    assert_eq!(shorthand.frequency.to_string(), "1d @ 03:30");
}

#[test]
fn parse_line_rejects_missing_and_excess_fields() {
    assert!(matches!(
        parse_line("jobs.a"),
        Err(ConfigError::BadJobLine(_))
    ));
    assert!(matches!(
        parse_line("jobs.a|1d|02:00|extra"),
        Err(ConfigError::BadJobLine(_))
    ));
}

#[test]
fn registry_preserves_config_order() {
    let registry =
        Registry::from_config("jobs.gamma|5m\njobs.alpha|1h", &loader()).unwrap();
    let names: Vec<&str> = registry
        .jobs()
        .iter()
        .map(|job| job.descriptor.app_name.as_str())
        .collect();
    assert_eq!(names, ["gamma", "alpha"]);
}

#[test]
fn registry_reads_identity_from_the_app_not_the_path() {
    let registry = Registry::from_config("jobs.beta|5m\njobs.alpha|5m", &loader()).unwrap();
    let beta = registry.get("beta").unwrap();
    assert_eq!(beta.descriptor.class_path, "jobs.beta");
    assert_eq!(beta.descriptor.depends_on, ["alpha".into()]);
}

#[test]
fn lookup_works_by_name_or_class_path() {
    let registry = Registry::from_config("jobs.alpha|5m", &loader()).unwrap();
    assert!(registry.get("alpha").is_some());
    assert!(registry.get("jobs.alpha").is_some());
    assert!(registry.get("ghost").is_none());
}

#[test]
fn unknown_class_path_is_rejected() {
    assert!(matches!(
        Registry::from_config("jobs.ghost|5m", &loader()),
        Err(ConfigError::UnknownJob(_))
    ));
}

#[test]
fn duplicate_identifier_is_rejected() {
    let mut loader = loader();
    // a second path resolving to the same app name
    loader.register("jobs.alpha2", PlainJob::app("alpha"));
    assert!(matches!(
        Registry::from_config("jobs.alpha|5m\njobs.alpha2|5m", &loader),
        Err(ConfigError::DuplicateIdentifier(_))
    ));
}

#[test]
fn unknown_dependency_is_rejected() {
    // beta depends on alpha, which is not configured
    assert!(matches!(
        Registry::from_config("jobs.beta|5m", &loader()),
        Err(ConfigError::UnknownDependency { .. })
    ));
}

#[test]
fn topo_order_respects_dependencies() {
    let registry =
        Registry::from_config("jobs.beta|5m\njobs.alpha|5m", &loader()).unwrap();
    let names: Vec<&str> = registry
        .topo_order()
        .unwrap()
        .iter()
        .map(|job| job.descriptor.app_name.as_str())
        .collect();
    assert_eq!(names, ["alpha", "beta"]);
}

#[test]
fn dependency_cycle_is_reported() {
    let mut loader = StaticLoader::new();
    loader.register("jobs.x", PlainJob::with_deps("x", &["y"]));
    loader.register("jobs.y", PlainJob::with_deps("y", &["x"]));
    let registry = Registry::from_config("jobs.x|5m\njobs.y|5m", &loader).unwrap();
    assert!(matches!(
        registry.topo_order(),
        Err(ConfigError::DependencyCycle(_))
    ));
}

#[test]
fn empty_spec_builds_an_empty_registry() {
    let registry = Registry::from_config("", &loader()).unwrap();
    assert!(registry.is_empty());
    assert_eq!(registry.len(), 0);
}

#[test]
fn diagnose_collects_one_error_per_bad_job() {
    let spec = "jobs.alpha|99x\njobs.ghost|5m\njobs.gamma|5m\njobs.gamma|1h";
    let (registry, errors) = Registry::diagnose(spec, &loader());

    // gamma loaded once; the rest are individually reported
    assert_eq!(registry.len(), 1);
    assert!(registry.get("gamma").is_some());
    assert_eq!(errors.len(), 3);
    assert!(matches!(errors[0], ConfigError::BadFrequency(_)));
    assert!(matches!(errors[1], ConfigError::UnknownJob(_)));
    assert!(matches!(errors[2], ConfigError::DuplicateIdentifier(_)));
}

#[test]
fn diagnose_keeps_the_first_of_a_duplicate_pair() {
    let mut loader = loader();
    loader.register("jobs.alpha2", PlainJob::app("alpha"));
    let (registry, errors) = Registry::diagnose("jobs.alpha|5m\njobs.alpha2|1h", &loader);

    assert_eq!(registry.len(), 1);
    assert_eq!(registry.get("alpha").unwrap().descriptor.class_path, "jobs.alpha");
    assert_eq!(
        errors,
        [ConfigError::DuplicateIdentifier("alpha".to_string())]
    );
}

#[test]
fn diagnose_flags_each_job_with_an_unknown_dependency() {
    // beta depends on alpha, which is not configured
    let (registry, errors) = Registry::diagnose("jobs.beta|5m", &loader());
    assert_eq!(registry.len(), 1);
    assert_eq!(
        errors,
        [ConfigError::UnknownDependency {
            job: "beta".to_string(),
            dependency: "alpha".to_string(),
        }]
    );
}

#[test]
fn diagnose_reports_every_cycle_participant() {
    struct Cyclic(String, String);
    impl JobApp for Cyclic {
        fn app_name(&self) -> &str {
            &self.0
        }
        fn depends_on(&self) -> Vec<String> {
            vec![self.1.clone()]
        }
        fn execute(&self) -> anyhow::Result<()> {
            Ok(())
        }
    }
    let mut loader = StaticLoader::new();
    loader.register("jobs.x", Arc::new(Cyclic("x".into(), "y".into())));
    loader.register("jobs.y", Arc::new(Cyclic("y".into(), "z".into())));
    loader.register("jobs.z", Arc::new(Cyclic("z".into(), "x".into())));

    let (_, errors) = Registry::diagnose("jobs.x|5m\njobs.y|5m\njobs.z|5m", &loader);
    assert_eq!(
        errors,
        [
            ConfigError::DependencyCycle("x".to_string()),
            ConfigError::DependencyCycle("y".to_string()),
            ConfigError::DependencyCycle("z".to_string()),
        ]
    );
}

#[test]
fn diagnose_on_a_clean_config_matches_from_config() {
    let (registry, errors) = Registry::diagnose("jobs.alpha|5m\njobs.gamma|1h", &loader());
    assert!(errors.is_empty());
    assert_eq!(registry.len(), 2);
}
