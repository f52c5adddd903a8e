//! What a build run produced.

use std::path::PathBuf;
use std::time::Duration;

use rtpack_schema::{ArtifactTarget, BuildInfo, SignatureRecord};

use super::error::{ErrorKind, StepFailure, TargetFailure};

#[derive(Debug)]
pub enum Outcome {
    Built(PathBuf),
    Failed(TargetFailure),
    /// Not attempted; carries the reason.
    Skipped(String),
}

#[derive(Debug)]
pub struct TargetOutcome {
    pub target: ArtifactTarget,
    pub outcome: Outcome,
}

#[derive(Debug)]
pub struct BuildReport {
    /// One entry per requested target, in request order.
    pub outcomes: Vec<TargetOutcome>,
    pub step_failures: Vec<StepFailure>,
    pub build_info: BuildInfo,
    pub signatures: Vec<SignatureRecord>,
    pub elapsed: Duration,
}

impl BuildReport {
    pub fn new(outcomes: Vec<TargetOutcome>, build_info: BuildInfo) -> Self {
        Self {
            outcomes,
            step_failures: Vec::new(),
            build_info,
            signatures: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn built(&self) -> impl Iterator<Item = (ArtifactTarget, &PathBuf)> {
        self.outcomes.iter().filter_map(|o| match &o.outcome {
            Outcome::Built(path) => Some((o.target, path)),
            _ => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = &TargetFailure> {
        self.outcomes.iter().filter_map(|o| match &o.outcome {
            Outcome::Failed(f) => Some(f),
            _ => None,
        })
    }

    pub fn skipped(&self) -> impl Iterator<Item = (ArtifactTarget, &str)> {
        self.outcomes.iter().filter_map(|o| match &o.outcome {
            Outcome::Skipped(reason) => Some((o.target, reason.as_str())),
            _ => None,
        })
    }

    /// Every requested artifact was produced and every post step succeeded.
    pub fn is_success(&self) -> bool {
        self.built().count() == self.outcomes.len() && self.step_failures.is_empty()
    }

    /// Process exit code: the class of the first target failure, else of the
    /// first failed step. Skips without any failure only happen on
    /// cancellation.
    pub fn exit_code(&self) -> i32 {
        if let Some(failure) = self.failures().next() {
            return failure.error.kind().exit_code();
        }
        if let Some(step) = self.step_failures.first() {
            return step.error.kind().exit_code();
        }
        if self.skipped().next().is_some() {
            return ErrorKind::Cancelled.exit_code();
        }
        0
    }
}
