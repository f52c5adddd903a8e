//! Clean command

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use rtpack_core::product::ProductInfo;
use rtpack_core::{BuildContext, Config, Orchestrator, Reporter};
use tokio_util::sync::CancellationToken;

use crate::ui::ConsoleReporter;

/// Remove the scratch directory and the product's previous artifacts.
pub async fn clean(config: Config, working_dir: &Path) -> Result<()> {
    let product = ProductInfo::load(&config.product, working_dir)?;
    let reporter = Arc::new(ConsoleReporter::new());
    let ctx = BuildContext::new(config, working_dir, reporter.clone(), CancellationToken::new());

    let removed = Orchestrator::new(ctx)
        .clean(&product.name)
        .await
        .context("clean failed")?;
    reporter.success(&format!(
        "removed scratch directory and {removed} artifact{}",
        if removed == 1 { "" } else { "s" }
    ));
    Ok(())
}
