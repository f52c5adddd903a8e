//! Sign command

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rtpack_core::integrity::{self, IntegrityError};
use rtpack_core::{Config, Reporter, SigningCredentials};

use crate::ui::ConsoleReporter;

/// Sign `files`, or every file in the output directory matching the
/// configured patterns when none are given.
pub async fn sign(config: &Config, working_dir: &Path, files: Vec<PathBuf>) -> Result<()> {
    let reporter = ConsoleReporter::new();
    let credentials = SigningCredentials::from_env(&config.signing)
        .context("failed to load signing credentials")?
        .ok_or_else(|| {
            IntegrityError::SigningKey(
                "no key configured, set RTPACK_SIGNING_KEY or RTPACK_SIGNING_KEY_FILE".to_string(),
            )
        })?;
    let key = integrity::unlock_key(&credentials.armored_key, &credentials.passphrase)?;
    reporter.info(&format!("signing with key {}", integrity::fingerprint(&key)));

    let files = if files.is_empty() {
        let output_dir = working_dir.join(&config.build.output_dir);
        integrity::find_signable(&output_dir, &config.signing.patterns)?
    } else {
        files
    };
    if files.is_empty() {
        reporter.warning("nothing to sign");
        return Ok(());
    }

    let total = files.len();
    let mut first_error = None;
    let mut failed = 0;
    for (path, result) in integrity::sign_all(files, &credentials).await {
        match result {
            Ok(record) => reporter.info(&format!("wrote {}", record.signature_path.display())),
            Err(e) => {
                reporter.error(&format!("{}: {e}", path.display()));
                failed += 1;
                first_error.get_or_insert(e);
            }
        }
    }

    if let Some(e) = first_error {
        return Err(anyhow::Error::new(e).context(format!("{failed} of {total} file(s) not signed")));
    }
    reporter.success(&format!("signed {total} file(s)"));
    Ok(())
}
