//! Per-platform build flow as a typestate.
//!
//! ```text
//! PendingTarget --[resolve()]--> ResolvedTarget --[fetch()]--> FetchedArchive
//!     --[extract()]--> ExtractedRuntime --[package()]--> PackagedArtifact
//! ```
//!
//! An archive cannot be extracted before it is fetched, and nothing is
//! packaged before its runtime tree exists.

use std::path::PathBuf;

use rtpack_schema::{
    ArtifactTarget, ManifestEntry, PlatformTarget, VersionLabel, artifact_file_name,
};
use tracing::{debug, warn};

use super::context::BuildContext;
use super::error::BuildError;
use crate::integrity::IntegrityError;
use crate::io::{ExtractError, ExtractRequest, FetchError, FetchRequest};
use crate::manifest::ResolveError;
use crate::packager::PackageRequest;
use crate::product::ProductInfo;

/// State 1: a validated platform, nothing fetched yet.
#[derive(Debug, Clone, Copy)]
pub struct PendingTarget {
    pub platform: PlatformTarget,
}

/// State 2: the manifest entry and every path derived from it are known.
#[derive(Debug, Clone)]
pub struct ResolvedTarget {
    pub platform: PlatformTarget,
    pub entry: ManifestEntry,
    pub url: String,
    pub label: VersionLabel,
    pub archive_path: PathBuf,
    pub tree_dir: PathBuf,
}

/// State 3: the archive is on disk, flushed and synced.
#[derive(Debug)]
pub struct FetchedArchive {
    pub resolved: ResolvedTarget,
    pub bytes: u64,
}

/// State 4: the runtime tree is unpacked and the archive removed.
#[derive(Debug)]
pub struct ExtractedRuntime {
    pub platform: PlatformTarget,
    pub tree_dir: PathBuf,
    pub entries: u64,
}

/// State 5: the package exists under its expected name.
#[derive(Debug, Clone)]
pub struct PackagedArtifact {
    pub target: ArtifactTarget,
    pub path: PathBuf,
}

impl PendingTarget {
    pub fn new(platform: PlatformTarget) -> Self {
        Self { platform }
    }

    pub async fn resolve(self, ctx: &BuildContext) -> Result<ResolvedTarget, ResolveError> {
        ctx.reporter.resolving(self.platform);
        let entry = ctx.resolver.resolve_target(self.platform).await?;
        let label = entry.version_label();
        let resolved = ResolvedTarget {
            platform: self.platform,
            url: ctx.resolver.download_url(&entry),
            archive_path: ctx.layout.archive_path(&entry),
            tree_dir: ctx.layout.tree_dir(&label),
            label,
            entry,
        };
        debug!(platform = %self.platform, url = %resolved.url, label = %resolved.label, "resolved");
        Ok(resolved)
    }
}

impl ResolvedTarget {
    pub async fn fetch(self, ctx: &BuildContext) -> Result<FetchedArchive, FetchError> {
        let bytes = FetchRequest::new(
            &ctx.client,
            &self.url,
            &self.archive_path,
            self.platform,
            ctx.reporter.as_ref(),
            &ctx.cancel,
        )
        .execute()
        .await?;
        Ok(FetchedArchive {
            resolved: self,
            bytes,
        })
    }
}

impl FetchedArchive {
    pub async fn extract(self, ctx: &BuildContext) -> Result<ExtractedRuntime, ExtractError> {
        let resolved = self.resolved;
        let entries = ExtractRequest::new(
            &resolved.archive_path,
            &resolved.tree_dir,
            resolved.platform,
            ctx.reporter.as_ref(),
            &ctx.cancel,
        )
        .execute()
        .await?;
        debug!(platform = %resolved.platform, bytes = self.bytes, entries, "runtime ready");
        Ok(ExtractedRuntime {
            platform: resolved.platform,
            tree_dir: resolved.tree_dir,
            entries,
        })
    }
}

impl ExtractedRuntime {
    pub async fn package(
        self,
        ctx: &BuildContext,
        product: &ProductInfo,
    ) -> Result<PackagedArtifact, BuildError> {
        let packaged = package_target(
            ctx,
            product,
            ArtifactTarget::Platform(self.platform),
            Some(self.tree_dir.clone()),
        )
        .await;

        // The scratch root is shared by every target; a tree left behind
        // would be swept into the next platform's package.
        match tokio::fs::remove_dir_all(&self.tree_dir).await {
            Ok(()) => debug!(platform = %self.platform, "runtime tree removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                platform = %self.platform,
                dir = %self.tree_dir.display(),
                error = %e,
                "failed to remove runtime tree"
            ),
        }
        packaged
    }
}

/// Run the packager for `target` and check the produced name.
pub(crate) async fn package_target(
    ctx: &BuildContext,
    product: &ProductInfo,
    target: ArtifactTarget,
    runtime_dir: Option<PathBuf>,
) -> Result<PackagedArtifact, BuildError> {
    let expected = artifact_file_name(
        &product.name,
        target,
        &product.version,
        &ctx.config.product.extension,
    );
    let request = PackageRequest {
        target,
        runtime_dir,
        output: ctx.output_path(&expected),
        version: product.version.clone(),
    };

    ctx.reporter.packaging(target);
    let path = ctx.packager.package(&request).await?;

    let produced = path.file_name().map(|n| n.to_string_lossy().into_owned());
    if produced.as_deref() != Some(expected.as_str()) {
        return Err(IntegrityError::NamingMismatch {
            expected,
            dir: ctx.output_dir.clone(),
        }
        .into());
    }

    Ok(PackagedArtifact { target, path })
}
