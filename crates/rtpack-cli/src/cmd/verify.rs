//! Verify command

use std::path::Path;

use anyhow::{Context, Result};
use rtpack_core::integrity;
use rtpack_core::Reporter;
use rtpack_schema::signature_path_for;

use crate::ui::ConsoleReporter;

pub async fn verify(file: &Path, public_key: &Path, signature: Option<&Path>) -> Result<()> {
    let armored = tokio::fs::read_to_string(public_key)
        .await
        .with_context(|| format!("cannot read public key {}", public_key.display()))?;
    let key = integrity::parse_public_key(&armored)?;
    let signature = signature.map_or_else(|| signature_path_for(file), Path::to_path_buf);
    integrity::verify(file, &signature, &key)
        .await
        .with_context(|| format!("{} does not verify", file.display()))?;
    ConsoleReporter::new().success(&format!(
        "{} is signed by {}",
        file.display(),
        public_key.display()
    ));
    Ok(())
}
