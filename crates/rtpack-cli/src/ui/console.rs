//! Terminal reporter.
//!
//! Writes one line per state change to stderr so stdout stays free for
//! command output. Download progress is throttled to one line per tenth.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossterm::style::Stylize;
use rtpack_core::{Reporter, Stage};
use rtpack_schema::{ArtifactTarget, PlatformTarget};

use super::progress::{format_transfer, progress_bucket};

pub const ICON_PENDING: &str = "○";
pub const ICON_ACTIVE: &str = "●";
pub const ICON_SUCCESS: &str = "✓";
pub const ICON_ERROR: &str = "✗";
pub const ICON_WARNING: &str = "⚠";
pub const ICON_INFO: &str = "ℹ";

#[derive(Debug)]
pub struct ConsoleReporter {
    label_width: AtomicUsize,
    last_bucket: Mutex<HashMap<PlatformTarget, u64>>,
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self {
            label_width: AtomicUsize::new(12),
            last_bucket: Mutex::new(HashMap::new()),
        }
    }

    fn label(&self, target: ArtifactTarget) -> String {
        let width = self.label_width.load(Ordering::Relaxed);
        format!("{:<width$}", target.label())
    }

    /// Record `bucket` for `target`; true when it differs from the last one.
    fn advance(&self, target: PlatformTarget, bucket: u64) -> bool {
        let Ok(mut last) = self.last_bucket.lock() else {
            return true;
        };
        last.insert(target, bucket) != Some(bucket)
    }
}

impl Reporter for ConsoleReporter {
    fn section(&self, title: &str) {
        eprintln!();
        eprintln!("{} {}", title.bold(), "─".repeat(40).dark_grey());
    }

    fn prepare_pipeline(&self, targets: &[ArtifactTarget]) {
        let width = targets.iter().map(|t| t.label().len()).max().unwrap_or(0);
        self.label_width.store(width.max(9), Ordering::Relaxed);
        if let Ok(mut last) = self.last_bucket.lock() {
            last.clear();
        }
        for target in targets {
            eprintln!("  {} {}", ICON_PENDING.dark_grey(), self.label(*target));
        }
    }

    fn resolving(&self, target: PlatformTarget) {
        eprintln!(
            "  {} {}  {}",
            ICON_ACTIVE.cyan(),
            self.label(target.into()),
            "resolving".dark_grey()
        );
    }

    fn downloading(&self, target: PlatformTarget, current: u64, total: Option<u64>) {
        if !self.advance(target, progress_bucket(current, total)) {
            return;
        }
        eprintln!(
            "  {} {}  {}  {}",
            ICON_ACTIVE.cyan(),
            self.label(target.into()),
            "fetching".dark_grey(),
            format_transfer(current, total)
        );
    }

    fn extracting(&self, target: PlatformTarget, entries: u64) {
        if entries == 0 {
            eprintln!(
                "  {} {}  {}",
                ICON_ACTIVE.cyan(),
                self.label(target.into()),
                "extracting".dark_grey()
            );
        }
    }

    fn packaging(&self, target: ArtifactTarget) {
        eprintln!(
            "  {} {}  {}",
            ICON_ACTIVE.cyan(),
            self.label(target),
            "packaging".dark_grey()
        );
    }

    fn done(&self, target: ArtifactTarget, detail: &str) {
        eprintln!("  {} {}  {}", ICON_SUCCESS.green(), self.label(target), detail);
    }

    fn failed(&self, target: ArtifactTarget, stage: Stage, reason: &str) {
        eprintln!(
            "  {} {}  {}",
            ICON_ERROR.red(),
            self.label(target),
            format!("{stage}: {reason}").red()
        );
    }

    fn skipped(&self, target: ArtifactTarget, reason: &str) {
        eprintln!(
            "  {} {}  {}",
            ICON_PENDING.dark_grey(),
            self.label(target),
            format!("skipped ({reason})").dark_grey()
        );
    }

    fn info(&self, msg: &str) {
        eprintln!("  {ICON_INFO} {msg}");
    }

    fn success(&self, msg: &str) {
        eprintln!("{} {}", ICON_SUCCESS.green(), msg.green());
    }

    fn warning(&self, msg: &str) {
        eprintln!("{} {}", ICON_WARNING.yellow(), msg.yellow());
    }

    fn error(&self, msg: &str) {
        eprintln!("{} {}", ICON_ERROR.red(), msg.red());
    }

    fn summary(&self, succeeded: usize, failed: usize, elapsed_secs: f64) {
        eprintln!();
        let built = format!(
            "{succeeded} artifact{} built in {elapsed_secs:.1}s",
            if succeeded == 1 { "" } else { "s" }
        );
        if failed == 0 {
            self.success(&built);
        } else {
            self.error(&format!("{built}, {failed} not produced"));
        }
    }
}
