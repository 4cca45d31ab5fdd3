//! tabber - cron-style job runner
//!
//! Invoked periodically by the operating system's timer; each invocation
//! decides which configured jobs are due, runs them in dependency order,
//! records the outcome and exits. Exit codes: 0 success, 1 failure,
//! 2 row claim lost, 3 another invocation is running.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};

use tabber_core::SystemClock;
use tabber_engine::{configtest, ghost_apps, list_report, nagios_report, Registry, Runner,
    RunnerOptions};
use tabber_storage::StateStore;

mod config;
mod jobs;

use config::FileConfig;

#[derive(Parser)]
#[command(name = "tabber")]
#[command(about = "Cron-style job runner with persisted state and dependencies")]
#[command(version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long = "admin.conf", value_name = "PATH")]
    admin_conf: PathBuf,

    /// Print every configured job and its state
    #[arg(long)]
    list: bool,

    /// Pretend a job has never been run
    #[arg(long, value_name = "ID")]
    reset_job: Option<String>,

    /// Run a specific job (refused for backfill jobs)
    #[arg(long, value_name = "ID")]
    job: Option<String>,

    /// Run despite due times and failed dependencies
    #[arg(long)]
    force: bool,

    /// Check that all configured jobs are OK; exit code is the error count
    #[arg(long)]
    configtest: bool,

    /// Emit a one-line health summary with nagios exit semantics
    #[arg(long)]
    nagios: bool,

    /// List state rows that no longer map to a configured job
    #[arg(long)]
    audit_ghosts: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => ExitCode::from(code.min(255) as u8),
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    let config = FileConfig::load(&cli.admin_conf)?;
    let loader = jobs::builtin_loader(&config);

    if cli.configtest {
        let errors = configtest(&config.crontabber.jobs, &loader);
        for err in &errors {
            error!("{}", err);
        }
        return Ok(errors.len() as i32);
    }

    if cli.list {
        // listing tolerates a broken job list and shows what is wrong
        let (registry, errors) = Registry::diagnose(&config.crontabber.jobs, &loader);
        let store = StateStore::open(config.database_path()?)?;
        print!(
            "{}",
            list_report(&registry, &store, &errors, chrono::Utc::now())?
        );
        return Ok(0);
    }

    let registry = Registry::from_config(&config.crontabber.jobs, &loader)?;
    let mut store = StateStore::open(config.database_path()?)?;

    if cli.nagios {
        let (status, line) = nagios_report(&registry, &store)?;
        println!("{}", line);
        return Ok(status.exit_code());
    }

    if cli.audit_ghosts {
        let ghosts = ghost_apps(&registry, &store)?;
        if !ghosts.is_empty() {
            println!(
                "Found the following in the state database but not available as a configured job:"
            );
            for app in ghosts {
                println!("\t{}", app);
            }
        }
        return Ok(0);
    }

    if let Some(target) = cli.reset_job {
        let job = registry
            .get(&target)
            .ok_or_else(|| anyhow::anyhow!("no configured job matches {:?}", target))?;
        if store.reset(job.descriptor.app_name.as_str())? {
            info!(app = %job.descriptor.app_name, "app reset");
        } else {
            warn!(app = %job.descriptor.app_name, "app already reset");
        }
        return Ok(0);
    }

    let options = RunnerOptions {
        only_job: cli.job,
        force: cli.force,
        policy: config.policy(),
    };
    match Runner::new(&registry, &mut store, SystemClock, options).run() {
        Ok(outcome) => {
            for (app, err) in &outcome.failed {
                error!(app = %app, kind = %err.kind, "{}", err.message);
            }
            Ok(outcome.exit_code())
        }
        Err(err) => {
            error!("{}", err);
            Ok(err.exit_code())
        }
    }
}
