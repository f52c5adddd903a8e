//! Resolve command: which bundle a platform would get.

use anyhow::{Context, Result};
use rtpack_core::{Config, ManifestResolver};

pub async fn resolve(config: &Config, platform: &str) -> Result<()> {
    let resolver = ManifestResolver::new(reqwest::Client::new(), config.runtime.clone());
    let entry = resolver
        .resolve(platform)
        .await
        .with_context(|| format!("failed to resolve {platform}"))?;

    println!("platform       {} ({})", entry.platform, entry.platform.runtime_code());
    println!("runtime        {}", entry.runtime_version);
    println!("entry          {}", entry.path);
    println!("download-url   {}", resolver.download_url(&entry));
    println!("version-label  {}", entry.version_label());
    Ok(())
}
