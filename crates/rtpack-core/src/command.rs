//! External command execution for the packager and hooks.
//!
//! Commands are argv vectors from configuration. `{name}` placeholders in any
//! argument are substituted before spawning; no shell is involved.

use std::ffi::OsString;
use std::path::Path;
use std::process::ExitStatus;

use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Number of trailing stderr lines kept for error messages.
const STDERR_TAIL: usize = 20;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("command is empty")]
    Empty,

    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' exited with {status}{}", format_stderr(.stderr))]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
}

fn format_stderr(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(":\n{stderr}")
    }
}

/// Replace every `{key}` in `template` with its value.
pub fn expand(template: &[String], vars: &[(&str, &str)]) -> Vec<String> {
    template
        .iter()
        .map(|arg| {
            vars.iter().fold(arg.clone(), |acc, (key, value)| {
                acc.replace(&format!("{{{key}}}"), value)
            })
        })
        .collect()
}

/// A command ready to run: argv plus extra environment.
#[derive(Debug, Clone)]
pub struct CommandLine {
    argv: Vec<String>,
    envs: Vec<(String, OsString)>,
}

impl CommandLine {
    pub fn new(argv: Vec<String>) -> Self {
        Self {
            argv,
            envs: Vec::new(),
        }
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<OsString>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// Run to completion in `cwd`. Stdout is logged at debug level; the tail
    /// of stderr is carried in the error on a non-zero exit.
    pub async fn run(&self, cwd: &Path) -> Result<(), CommandError> {
        let (program, args) = self.argv.split_first().ok_or(CommandError::Empty)?;
        debug!(program = %program, ?args, cwd = %cwd.display(), "running command");

        let output = Command::new(program)
            .args(args)
            .envs(self.envs.iter().map(|(k, v)| (k, v)))
            .current_dir(cwd)
            .stdin(std::process::Stdio::null())
            .output()
            .await
            .map_err(|source| CommandError::Spawn {
                program: program.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines() {
            debug!(program = %program, "{line}");
        }

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let lines: Vec<&str> = stderr.lines().collect();
        let tail = lines[lines.len().saturating_sub(STDERR_TAIL)..].join("\n");
        Err(CommandError::Failed {
            program: program.clone(),
            status: output.status,
            stderr: tail,
        })
    }
}
