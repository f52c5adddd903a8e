//! Reporter trait for dependency injection
//!
//! Pipeline stages report progress and status through this trait so the core
//! is not coupled to a particular terminal UI.

use rtpack_schema::{ArtifactTarget, PlatformTarget};

use crate::pipeline::Stage;

pub trait Reporter: Send + Sync {
    /// Indicates a new section or phase has started (e.g. "Building", "Signing").
    fn section(&self, title: &str);

    /// Reserve display rows for the targets about to be built.
    fn prepare_pipeline(&self, targets: &[ArtifactTarget]);

    /// A target's manifest entry is being resolved.
    fn resolving(&self, target: PlatformTarget);

    /// Updates the progress of a runtime bundle download.
    fn downloading(&self, target: PlatformTarget, current: u64, total: Option<u64>);

    /// Updates the number of archive entries unpacked so far.
    fn extracting(&self, target: PlatformTarget, entries: u64);

    /// The packager has been handed the target.
    fn packaging(&self, target: ArtifactTarget);

    /// Marks a target as successfully built.
    fn done(&self, target: ArtifactTarget, detail: &str);

    /// Marks a target as failed at `stage` with a specific reason.
    fn failed(&self, target: ArtifactTarget, stage: Stage, reason: &str);

    /// Marks a target as not attempted.
    fn skipped(&self, target: ArtifactTarget, reason: &str);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a success message.
    fn success(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);

    /// Log an error message.
    fn error(&self, msg: &str);

    /// Display a final summary of the run.
    fn summary(&self, succeeded: usize, failed: usize, elapsed_secs: f64);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn section(&self, title: &str) {
        (**self).section(title)
    }
    fn prepare_pipeline(&self, targets: &[ArtifactTarget]) {
        (**self).prepare_pipeline(targets)
    }
    fn resolving(&self, target: PlatformTarget) {
        (**self).resolving(target)
    }
    fn downloading(&self, target: PlatformTarget, current: u64, total: Option<u64>) {
        (**self).downloading(target, current, total)
    }
    fn extracting(&self, target: PlatformTarget, entries: u64) {
        (**self).extracting(target, entries)
    }
    fn packaging(&self, target: ArtifactTarget) {
        (**self).packaging(target)
    }
    fn done(&self, target: ArtifactTarget, detail: &str) {
        (**self).done(target, detail)
    }
    fn failed(&self, target: ArtifactTarget, stage: Stage, reason: &str) {
        (**self).failed(target, stage, reason)
    }
    fn skipped(&self, target: ArtifactTarget, reason: &str) {
        (**self).skipped(target, reason)
    }
    fn info(&self, msg: &str) {
        (**self).info(msg)
    }
    fn success(&self, msg: &str) {
        (**self).success(msg)
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg)
    }
    fn error(&self, msg: &str) {
        (**self).error(msg)
    }
    fn summary(&self, succeeded: usize, failed: usize, elapsed_secs: f64) {
        (**self).summary(succeeded, failed, elapsed_secs)
    }
}

/// A no-op reporter for silent operations (e.g., verification, testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn section(&self, _: &str) {}
    fn prepare_pipeline(&self, _: &[ArtifactTarget]) {}
    fn resolving(&self, _: PlatformTarget) {}
    fn downloading(&self, _: PlatformTarget, _: u64, _: Option<u64>) {}
    fn extracting(&self, _: PlatformTarget, _: u64) {}
    fn packaging(&self, _: ArtifactTarget) {}
    fn done(&self, _: ArtifactTarget, _: &str) {}
    fn failed(&self, _: ArtifactTarget, _: Stage, _: &str) {}
    fn skipped(&self, _: ArtifactTarget, _: &str) {}
    fn info(&self, _: &str) {}
    fn success(&self, _: &str) {}
    fn warning(&self, _: &str) {}
    fn error(&self, _: &str) {}
    fn summary(&self, _: usize, _: usize, _: f64) {}
}
