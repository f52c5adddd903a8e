//! Build command

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use rtpack_core::pipeline::parse_targets;
use rtpack_core::{BuildContext, BuildPlan, Config, Orchestrator, SigningCredentials};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::ui::{ConsoleReporter, table};

/// Which artifacts were asked for on the command line.
#[derive(Debug, Clone)]
pub enum Selection {
    Universal,
    Configured,
    Targets(Vec<String>),
}

/// Turn the selection into a plan. Unknown identifiers are rejected here,
/// before anything is cleaned or fetched.
pub fn plan(selection: &Selection, config: &Config) -> Result<BuildPlan> {
    Ok(match selection {
        Selection::Universal => BuildPlan::universal(),
        Selection::Configured => BuildPlan::platforms(config.build.targets.clone()),
        Selection::Targets(requested) => BuildPlan::platforms(parse_targets(requested)?),
    })
}

/// Run a build and print the per-target table. Returns the exit code the
/// report calls for.
pub async fn build(
    mut config: Config,
    working_dir: &Path,
    selection: &Selection,
    jobs: Option<usize>,
    cancel: CancellationToken,
) -> Result<i32> {
    let plan = plan(selection, &config)?;
    if let Some(jobs) = jobs {
        config.build.jobs = jobs;
    }
    let credentials = SigningCredentials::from_env(&config.signing)
        .context("failed to load signing credentials")?;
    debug!(?plan, signing = credentials.is_some(), "starting build");

    let ctx = BuildContext::new(config, working_dir, Arc::new(ConsoleReporter::new()), cancel)
        .with_credentials(credentials);
    let report = Orchestrator::new(ctx)
        .run(&plan)
        .await
        .context("build could not start")?;

    println!("{}", table::build_summary(&report));
    Ok(report.exit_code())
}
