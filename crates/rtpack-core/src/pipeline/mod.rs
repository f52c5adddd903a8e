//! The release pipeline: per-target flow, shared context, orchestration.

pub mod context;
pub mod error;
pub mod flow;
pub mod orchestrator;
pub mod report;

pub use context::BuildContext;
pub use error::{BuildError, ErrorKind, Stage, StepFailure, TargetFailure};
pub use orchestrator::{BuildPlan, Orchestrator, parse_targets};
pub use report::{BuildReport, Outcome, TargetOutcome};
