//! Optional external steps around the core pipeline.
//!
//! SBOM generation, version bumping and deployment are owned by other
//! tools; each is an argv from `[hooks]`. An unset hook is skipped.

use std::path::PathBuf;

use thiserror::Error;
use tracing::info;

use crate::command::{CommandError, CommandLine, expand};
use crate::config::HooksConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalStep {
    BumpVersion,
    Sbom,
    DeployBuildInfo,
    Deploy,
}

impl ExternalStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BumpVersion => "bump-version",
            Self::Sbom => "sbom",
            Self::DeployBuildInfo => "deploy-build-info",
            Self::Deploy => "deploy",
        }
    }
}

impl std::fmt::Display for ExternalStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
#[error("{step} hook failed: {source}")]
pub struct HookError {
    pub step: ExternalStep,
    #[source]
    pub source: CommandError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOutcome {
    Ran,
    NotConfigured,
}

/// Runs configured hooks from a fixed working directory.
///
/// Placeholders: `{version}`, `{output}` (the output directory) and
/// `{build_info}` (path of `build-info.json`).
#[derive(Debug, Clone)]
pub struct HookRunner {
    hooks: HooksConfig,
    working_dir: PathBuf,
    output_dir: PathBuf,
}

impl HookRunner {
    pub fn new(hooks: HooksConfig, working_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            hooks,
            working_dir: working_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    fn command(&self, step: ExternalStep) -> Option<&Vec<String>> {
        match step {
            ExternalStep::BumpVersion => self.hooks.bump_version.as_ref(),
            ExternalStep::Sbom => self.hooks.sbom.as_ref(),
            ExternalStep::DeployBuildInfo => self.hooks.deploy_build_info.as_ref(),
            ExternalStep::Deploy => self.hooks.deploy.as_ref(),
        }
    }

    pub async fn run(&self, step: ExternalStep, version: &str) -> Result<HookOutcome, HookError> {
        let Some(template) = self.command(step).filter(|argv| !argv.is_empty()) else {
            info!(%step, "hook not configured, skipping");
            return Ok(HookOutcome::NotConfigured);
        };

        let output = self.output_dir.to_string_lossy();
        let build_info = self
            .output_dir
            .join(crate::layout::BUILD_INFO_FILE)
            .to_string_lossy()
            .into_owned();
        let argv = expand(
            template,
            &[
                ("version", version),
                ("output", output.as_ref()),
                ("build_info", build_info.as_str()),
            ],
        );

        info!(%step, "running hook");
        CommandLine::new(argv)
            .env("RTPACK_VERSION", version)
            .env("RTPACK_OUTPUT_DIR", self.output_dir.as_os_str())
            .run(&self.working_dir)
            .await
            .map_err(|source| HookError { step, source })?;
        Ok(HookOutcome::Ran)
    }
}
