//! Tables printed at the end of a command.

use comfy_table::presets::UTF8_HORIZONTAL_ONLY;
use comfy_table::{Cell, Color, ContentArrangement, Table};
use rtpack_core::BuildReport;
use rtpack_core::pipeline::Outcome;
use rtpack_schema::{DigestKind, PlatformTarget};

fn table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_HORIZONTAL_ONLY)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.to_vec());
    table
}

/// One row per requested target: status, file or reason, and md5.
pub fn build_summary(report: &BuildReport) -> Table {
    let mut t = table(&["Target", "Status", "Artifact", "md5"]);
    for outcome in &report.outcomes {
        let md5 = report
            .build_info
            .get(outcome.target)
            .map(|r| r.digest(DigestKind::Md5).to_string())
            .unwrap_or_default();
        let (status, detail) = match &outcome.outcome {
            Outcome::Built(path) => (
                Cell::new("built").fg(Color::Green),
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            ),
            Outcome::Failed(failure) => (
                Cell::new(format!("failed ({})", failure.stage)).fg(Color::Red),
                failure.error.to_string(),
            ),
            Outcome::Skipped(reason) => (
                Cell::new("skipped").fg(Color::DarkGrey),
                reason.clone(),
            ),
        };
        t.add_row(vec![
            Cell::new(outcome.target.label()),
            status,
            Cell::new(detail),
            Cell::new(md5),
        ]);
    }
    t
}

/// Supported identifiers, their manifest codes and whether `--all` builds
/// them by default.
pub fn platforms(configured: &[PlatformTarget]) -> Table {
    let mut t = table(&["Platform", "Runtime code", "Built by --all"]);
    for platform in PlatformTarget::ALL {
        let marker = if configured.contains(&platform) { "yes" } else { "" };
        t.add_row(vec![platform.as_str(), platform.runtime_code(), marker]);
    }
    t
}
