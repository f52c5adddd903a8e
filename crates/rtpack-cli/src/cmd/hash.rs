//! Hash command

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use rtpack_core::integrity::compute_hashes;
use tracing::warn;

/// Print a JSON object mapping each path to its md5/sha1 record. Missing
/// files get empty digests.
pub async fn hash(files: &[PathBuf]) -> Result<()> {
    let mut records = BTreeMap::new();
    for file in files {
        let record = compute_hashes(file)
            .await
            .with_context(|| format!("failed to hash {}", file.display()))?;
        if !record.is_present() {
            warn!(path = %file.display(), "file not found, digests left empty");
        }
        records.insert(file.display().to_string(), record);
    }
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}
