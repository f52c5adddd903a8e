//! Packager collaborator: turns a runtime tree into an installable package.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rtpack_schema::ArtifactTarget;
use thiserror::Error;

use crate::command::{CommandError, CommandLine, expand};

/// Environment variable carrying the runtime tree path (empty for universal builds).
pub const ENV_RUNTIME_DIR: &str = "RTPACK_RUNTIME_DIR";
/// Environment variable carrying the target label.
pub const ENV_TARGET: &str = "RTPACK_TARGET";

#[derive(Error, Debug)]
pub enum PackagerError {
    #[error("packager failed for {target}: {source}")]
    Command {
        target: ArtifactTarget,
        #[source]
        source: CommandError,
    },
}

/// What to package and where the package should land.
#[derive(Debug, Clone)]
pub struct PackageRequest {
    pub target: ArtifactTarget,
    /// Extracted runtime to embed; `None` for the universal package.
    pub runtime_dir: Option<PathBuf>,
    /// Expected package path.
    pub output: PathBuf,
    pub version: String,
}

#[async_trait]
pub trait Packager: Send + Sync {
    /// Produce the package and return the path it was written to.
    async fn package(&self, request: &PackageRequest) -> Result<PathBuf, PackagerError>;
}

/// Runs the configured packaging command.
///
/// Placeholders: `{output}`, `{runtime}`, `{version}`, and `{platform}` in the
/// per-target arguments appended for platform builds.
#[derive(Debug, Clone)]
pub struct CommandPackager {
    command: Vec<String>,
    target_args: Vec<String>,
    working_dir: PathBuf,
}

impl CommandPackager {
    pub fn new(command: Vec<String>, target_args: Vec<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            command,
            target_args,
            working_dir: working_dir.into(),
        }
    }

    /// The argv that would be run for `request`.
    pub fn command_line(&self, request: &PackageRequest) -> CommandLine {
        let output = request.output.to_string_lossy();
        let runtime = request
            .runtime_dir
            .as_deref()
            .map(Path::to_string_lossy)
            .unwrap_or_default();
        let label = request.target.label();
        let vars = [
            ("output", output.as_ref()),
            ("runtime", runtime.as_ref()),
            ("version", request.version.as_str()),
            ("platform", label),
        ];

        let mut argv = expand(&self.command, &vars);
        if request.target.platform().is_some() {
            argv.extend(expand(&self.target_args, &vars));
        }

        CommandLine::new(argv)
            .env(ENV_RUNTIME_DIR, runtime.as_ref())
            .env(ENV_TARGET, label)
    }
}

#[async_trait]
impl Packager for CommandPackager {
    async fn package(&self, request: &PackageRequest) -> Result<PathBuf, PackagerError> {
        self.command_line(request)
            .run(&self.working_dir)
            .await
            .map_err(|source| PackagerError::Command {
                target: request.target,
                source,
            })?;
        Ok(request.output.clone())
    }
}
