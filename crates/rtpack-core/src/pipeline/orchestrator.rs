//! Runs a whole build: pre-tasks, the universal and per-platform builds, then
//! hashing, `build-info.json`, signing and deployment hooks.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use futures::stream::{self, StreamExt};
use rtpack_schema::{
    ArtifactRecord, ArtifactTarget, BuildInfo, PlatformTarget, SIGNATURE_SUFFIX,
    UnsupportedPlatform, artifact_file_name,
};
use tracing::{debug, info, warn};

use super::context::BuildContext;
use super::error::{BuildError, Stage, StepFailure, TargetFailure};
use super::flow::{PackagedArtifact, PendingTarget, package_target};
use super::report::{BuildReport, Outcome, TargetOutcome};
use crate::hooks::{ExternalStep, HookOutcome};
use crate::integrity::{self, IntegrityError};
use crate::layout::BUILD_INFO_FILE;
use crate::product::ProductInfo;

/// Which artifacts a run should produce.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildPlan {
    pub universal: bool,
    pub targets: Vec<PlatformTarget>,
}

impl BuildPlan {
    pub fn universal() -> Self {
        Self {
            universal: true,
            targets: Vec::new(),
        }
    }

    pub fn platforms(targets: Vec<PlatformTarget>) -> Self {
        Self {
            universal: false,
            targets,
        }
    }

    pub fn artifact_targets(&self) -> Vec<ArtifactTarget> {
        let universal = self.universal.then_some(ArtifactTarget::Universal);
        universal
            .into_iter()
            .chain(self.targets.iter().copied().map(ArtifactTarget::Platform))
            .collect()
    }
}

/// Validate every requested identifier before anything touches the network.
///
/// Duplicates are dropped, first occurrence wins.
pub fn parse_targets<S: AsRef<str>>(
    requested: &[S],
) -> Result<Vec<PlatformTarget>, UnsupportedPlatform> {
    let mut targets: Vec<PlatformTarget> = Vec::with_capacity(requested.len());
    for raw in requested {
        let target: PlatformTarget = raw.as_ref().parse()?;
        if !targets.contains(&target) {
            targets.push(target);
        }
    }
    Ok(targets)
}

#[derive(Debug)]
pub struct Orchestrator {
    ctx: BuildContext,
}

impl Orchestrator {
    pub fn new(ctx: BuildContext) -> Self {
        Self { ctx }
    }

    /// Execute `plan`. Errors returned here abort the run before any target
    /// is built; everything after that is recorded in the report.
    pub async fn run(&self, plan: &BuildPlan) -> Result<BuildReport, BuildError> {
        let start = Instant::now();
        let product = self.pre_tasks(!plan.targets.is_empty()).await?;

        let reporter = &self.ctx.reporter;
        reporter.section("Building");
        reporter.prepare_pipeline(&plan.artifact_targets());

        let mut outcomes = Vec::new();
        if plan.universal {
            outcomes.push(self.build_universal(&product).await);
        }
        if !plan.targets.is_empty() {
            outcomes.extend(self.build_all(&plan.targets, &product).await);
        }

        let mut report = BuildReport::new(outcomes, BuildInfo::new(&product.version));
        self.finalize(&product, &mut report).await;
        report.elapsed = start.elapsed();

        let built = report.built().count();
        reporter.summary(
            built,
            report.outcomes.len() - built,
            report.elapsed.as_secs_f64(),
        );
        Ok(report)
    }

    /// Clean, then run the SBOM and version hooks. Returns the product as
    /// it stands after the version bump.
    async fn pre_tasks(&self, needs_scratch: bool) -> Result<ProductInfo, BuildError> {
        let reporter = &self.ctx.reporter;
        reporter.section("Preparing");

        let product = ProductInfo::load(&self.ctx.config.product, &self.ctx.working_dir)?;
        let removed = self.clean(&product.name).await?;
        if removed > 0 {
            reporter.info(&format!("removed {removed} previous artifact(s)"));
        }

        for step in [ExternalStep::Sbom, ExternalStep::BumpVersion] {
            if self.ctx.hooks.run(step, &product.version).await? == HookOutcome::Ran {
                reporter.info(&format!("{step} hook finished"));
            }
        }

        // the version hook may have rewritten package.json
        let product = ProductInfo::load(&self.ctx.config.product, &self.ctx.working_dir)?;
        info!(name = %product.name, version = %product.version, "building");

        tokio::fs::create_dir_all(&self.ctx.output_dir)
            .await
            .map_err(BuildError::io(&self.ctx.output_dir))?;
        if needs_scratch {
            self.ctx
                .layout
                .ensure()
                .await
                .map_err(BuildError::io(self.ctx.layout.root()))?;
        }
        Ok(product)
    }

    /// Remove the scratch directory and every artifact a previous run of
    /// `product_name` left in the output directory. Returns how many output
    /// files were removed.
    pub async fn clean(&self, product_name: &str) -> Result<usize, BuildError> {
        let layout = &self.ctx.layout;
        layout
            .clear()
            .await
            .map_err(BuildError::io(layout.root()))?;

        let ext = &self.ctx.config.product.extension;
        let dir = glob::Pattern::escape(&self.ctx.output_dir.to_string_lossy());
        let patterns = [
            format!("{product_name}-*.{ext}"),
            format!("{product_name}-*.{ext}{SIGNATURE_SUFFIX}"),
            BUILD_INFO_FILE.to_string(),
        ];

        let mut removed = 0;
        for pattern in patterns {
            let full = format!("{dir}/{pattern}");
            let paths = glob::glob(&full).map_err(|e| BuildError::context("invalid clean pattern", e))?;
            for path in paths.flatten().filter(|p| p.is_file()) {
                tokio::fs::remove_file(&path)
                    .await
                    .map_err(BuildError::io(&path))?;
                debug!(path = %path.display(), "removed");
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Package once without a runtime.
    pub async fn build_universal(&self, product: &ProductInfo) -> TargetOutcome {
        match package_target(&self.ctx, product, ArtifactTarget::Universal, None).await {
            Ok(artifact) => self.built(artifact),
            Err(e) => self.failed(TargetFailure::new(ArtifactTarget::Universal, Stage::Package, e)),
        }
    }

    /// Build every platform target, at most `build.jobs` at a time.
    ///
    /// A failing target never stops its siblings, except that an unreachable
    /// manifest marks every not-yet-started target as skipped. The scratch
    /// directory is cleared once all targets are done.
    pub async fn build_all(
        &self,
        targets: &[PlatformTarget],
        product: &ProductInfo,
    ) -> Vec<TargetOutcome> {
        let halted = AtomicBool::new(false);
        let jobs = self.ctx.config.build.effective_jobs();
        debug!(jobs, count = targets.len(), "building platform targets");

        let outcomes = stream::iter(targets.iter().copied())
            .map(|platform| {
                let halted = &halted;
                async move {
                    let target = ArtifactTarget::Platform(platform);
                    if halted.load(Ordering::SeqCst) {
                        return self.skipped(target, "manifest unavailable");
                    }
                    if self.ctx.cancel.is_cancelled() {
                        return self.skipped(target, "cancelled");
                    }
                    match self.build_target(platform, product).await {
                        Ok(artifact) => self.built(artifact),
                        Err(failure) => {
                            if failure.error.is_manifest_unavailable() {
                                halted.store(true, Ordering::SeqCst);
                            }
                            self.failed(failure)
                        }
                    }
                }
            })
            .buffered(jobs)
            .collect::<Vec<_>>()
            .await;

        if let Err(e) = self.ctx.layout.clear().await {
            warn!(path = %self.ctx.layout.root().display(), "could not clear scratch directory: {e}");
            self.ctx
                .reporter
                .warning(&format!("could not clear scratch directory: {e}"));
        }
        outcomes
    }

    /// resolve, fetch, extract, package
    pub async fn build_target(
        &self,
        platform: PlatformTarget,
        product: &ProductInfo,
    ) -> Result<PackagedArtifact, TargetFailure> {
        let target = ArtifactTarget::Platform(platform);
        let ctx = &self.ctx;

        let resolved = PendingTarget::new(platform)
            .resolve(ctx)
            .await
            .map_err(|e| TargetFailure::new(target, Stage::Resolve, e))?;
        let fetched = resolved
            .fetch(ctx)
            .await
            .map_err(|e| TargetFailure::new(target, Stage::Fetch, e))?;
        let extracted = fetched
            .extract(ctx)
            .await
            .map_err(|e| TargetFailure::new(target, Stage::Extract, e))?;
        extracted
            .package(ctx, product)
            .await
            .map_err(|e| TargetFailure::new(target, Stage::Package, e))
    }

    fn built(&self, artifact: PackagedArtifact) -> TargetOutcome {
        let name = artifact
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.ctx.reporter.done(artifact.target, &name);
        TargetOutcome {
            target: artifact.target,
            outcome: Outcome::Built(artifact.path),
        }
    }

    fn failed(&self, failure: TargetFailure) -> TargetOutcome {
        warn!(artifact = %failure.target, stage = %failure.stage, "{}", failure.error);
        self.ctx
            .reporter
            .failed(failure.target, failure.stage, &failure.error.to_string());
        TargetOutcome {
            target: failure.target,
            outcome: Outcome::Failed(failure),
        }
    }

    fn skipped(&self, target: ArtifactTarget, reason: &str) -> TargetOutcome {
        self.ctx.reporter.skipped(target, reason);
        TargetOutcome {
            target,
            outcome: Outcome::Skipped(reason.to_string()),
        }
    }

    /// Post-tasks. Failures are recorded in the report, never returned.
    async fn finalize(&self, product: &ProductInfo, report: &mut BuildReport) {
        self.ctx.reporter.section("Finalizing");
        self.record_hashes(product, report).await;

        if let Err(error) = self.write_build_info(&report.build_info).await {
            self.step_failed(report, Stage::Hash, error);
        }

        self.sign(report).await;

        let complete = report.is_success();
        if !complete {
            self.ctx
                .reporter
                .warning("not every artifact was produced, skipping deployment");
            return;
        }
        for step in [ExternalStep::DeployBuildInfo, ExternalStep::Deploy] {
            match self.ctx.hooks.run(step, &product.version).await {
                Ok(HookOutcome::Ran) => self.ctx.reporter.info(&format!("{step} hook finished")),
                Ok(HookOutcome::NotConfigured) => {}
                Err(e) => {
                    self.step_failed(report, Stage::Hook, e.into());
                    break;
                }
            }
        }
    }

    /// Hash every requested artifact. A built target whose package is not
    /// where it should be turns into a naming mismatch.
    async fn record_hashes(&self, product: &ProductInfo, report: &mut BuildReport) {
        let ext = &self.ctx.config.product.extension;
        for entry in &mut report.outcomes {
            let expected = artifact_file_name(&product.name, entry.target, &product.version, ext);
            let hashed = match &entry.outcome {
                Outcome::Built(path) => Some(integrity::compute_hashes(path).await),
                _ => None,
            };

            let record = match hashed {
                Some(Ok(record)) if record.is_present() => {
                    debug!(artifact = %entry.target, md5 = record.digest(rtpack_schema::DigestKind::Md5), "hashed");
                    record
                }
                Some(result) => {
                    let error: BuildError = match result {
                        Err(e) => e.into(),
                        Ok(_) => IntegrityError::NamingMismatch {
                            expected: expected.clone(),
                            dir: self.ctx.output_dir.clone(),
                        }
                        .into(),
                    };
                    let TargetOutcome { outcome, .. } =
                        self.failed(TargetFailure::new(entry.target, Stage::Hash, error));
                    entry.outcome = outcome;
                    ArtifactRecord::absent(expected)
                }
                None => ArtifactRecord::absent(expected),
            };
            report.build_info.insert(entry.target, record);
        }
    }

    async fn write_build_info(&self, info: &BuildInfo) -> Result<PathBuf, BuildError> {
        let path = self.ctx.output_path(BUILD_INFO_FILE);
        let json = serde_json::to_string_pretty(info)
            .map_err(|e| BuildError::context("failed to serialize build info", e))?;
        tokio::fs::write(&path, json)
            .await
            .map_err(BuildError::io(&path))?;
        debug!(path = %path.display(), "wrote build info");
        Ok(path)
    }

    /// Sign every signable file in the output directory, if a key is configured.
    async fn sign(&self, report: &mut BuildReport) {
        let reporter = &self.ctx.reporter;
        let Some(credentials) = &self.ctx.credentials else {
            reporter.warning("no signing key configured, artifacts are unsigned");
            return;
        };

        reporter.section("Signing");
        // one upfront check so a bad passphrase is reported once, not per file
        if let Err(e) = integrity::unlock_key(&credentials.armored_key, &credentials.passphrase) {
            self.step_failed(report, Stage::Sign, e.into());
            return;
        }

        let files = match integrity::find_signable(
            &self.ctx.output_dir,
            &self.ctx.config.signing.patterns,
        ) {
            Ok(files) => files,
            Err(e) => {
                self.step_failed(report, Stage::Sign, e.into());
                return;
            }
        };

        for (path, result) in integrity::sign_all(files, credentials).await {
            match result {
                Ok(record) => {
                    reporter.info(&format!("signed {}", path.display()));
                    report.signatures.push(record);
                }
                Err(e) => self.step_failed(report, Stage::Sign, e.into()),
            }
        }
    }

    fn step_failed(&self, report: &mut BuildReport, stage: Stage, error: BuildError) {
        warn!(%stage, "{error}");
        self.ctx.reporter.error(&format!("{stage} failed: {error}"));
        report.step_failures.push(StepFailure { stage, error });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, SigningCredentials};
    use crate::packager::{PackageRequest, Packager, PackagerError};
    use crate::reporter::NullReporter;
    use async_trait::async_trait;
    use mockito::{Matcher, Server, ServerGuard};
    use rtpack_schema::DigestKind;
    use std::io::Write;
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use tokio_util::sync::CancellationToken;

    const MARKER: &str = "org.eclipse.justj.openjdk.hotspot.jre.full.stripped";

    /// Writes a small package and remembers what it was asked for.
    #[derive(Default)]
    struct FakePackager {
        calls: Mutex<Vec<(ArtifactTarget, bool)>>,
        /// Entries of the scratch root at the moment each platform is packaged.
        scratch_seen: Mutex<Vec<(ArtifactTarget, Vec<String>)>>,
        rename_to: Option<String>,
        write_nothing: bool,
    }

    #[async_trait]
    impl Packager for FakePackager {
        async fn package(&self, request: &PackageRequest) -> Result<PathBuf, PackagerError> {
            let has_runtime = request
                .runtime_dir
                .as_ref()
                .is_some_and(|dir| dir.join("jre/release").is_file());
            self.calls
                .lock()
                .unwrap()
                .push((request.target, has_runtime));
            if let Some(scratch) = request.runtime_dir.as_ref().and_then(|d| d.parent()) {
                let mut entries: Vec<String> = std::fs::read_dir(scratch)
                    .unwrap()
                    .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                    .collect();
                entries.sort();
                self.scratch_seen
                    .lock()
                    .unwrap()
                    .push((request.target, entries));
            }

            let path = match &self.rename_to {
                Some(name) => request.output.with_file_name(name),
                None => request.output.clone(),
            };
            if !self.write_nothing {
                std::fs::write(&path, request.target.label()).unwrap();
            }
            Ok(path)
        }
    }

    fn runtime_archive() -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        let data = b"JAVA_VERSION=\"17\"";
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "jre/release", &data[..])
            .unwrap();
        let tar = builder.into_inner().unwrap();
        let mut enc = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        enc.write_all(&tar).unwrap();
        enc.finish().unwrap()
    }

    fn manifest(targets: &[PlatformTarget]) -> String {
        targets
            .iter()
            .map(|t| format!("../20211012_0921/{MARKER}-17-{}.tar.gz\n", t.runtime_code()))
            .collect()
    }

    fn archive_path(target: PlatformTarget) -> String {
        format!(
            "/jres/17/downloads/20211012_0921/{MARKER}-17-{}.tar.gz",
            target.runtime_code()
        )
    }

    fn orchestrator(
        server: &ServerGuard,
        dir: &Path,
        packager: Arc<FakePackager>,
        credentials: Option<SigningCredentials>,
    ) -> Orchestrator {
        orchestrator_with_jobs(server, dir, packager, credentials, 1)
    }

    fn orchestrator_with_jobs(
        server: &ServerGuard,
        dir: &Path,
        packager: Arc<FakePackager>,
        credentials: Option<SigningCredentials>,
        jobs: usize,
    ) -> Orchestrator {
        let mut config = Config::default();
        config.product.name = Some("ext".to_string());
        config.product.version = Some("1.0.0".to_string());
        config.runtime.base_url = format!("{}/jres", server.url());
        config.build.output_dir = PathBuf::from("dist");
        config.build.jobs = jobs;

        let ctx = BuildContext::new(config, dir, Arc::new(NullReporter), CancellationToken::new())
            .with_packager(packager)
            .with_credentials(credentials);
        Orchestrator::new(ctx)
    }

    #[test]
    fn targets_validated_and_deduplicated() {
        assert_eq!(
            parse_targets(&["linux-x64", "win32-x64", "linux-x64"]).unwrap(),
            vec![PlatformTarget::LinuxX64, PlatformTarget::Win32X64]
        );
        let err = parse_targets(&["linux-x64", "solaris-sparc"]).unwrap_err();
        assert_eq!(err.requested, "solaris-sparc");
    }

    #[tokio::test]
    async fn builds_linux_x64_end_to_end() {
        let mut server = Server::new_async().await;
        let manifest_mock = server
            .mock("GET", "/jres/17/downloads/latest/justj.manifest")
            .with_status(200)
            .with_body(manifest(&PlatformTarget::ALL))
            .create_async()
            .await;
        let archive_mock = server
            .mock("GET", archive_path(PlatformTarget::LinuxX64).as_str())
            .with_status(200)
            .with_body(runtime_archive())
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let packager = Arc::new(FakePackager::default());
        let orch = orchestrator(&server, dir.path(), packager.clone(), None);

        let report = orch
            .run(&BuildPlan::platforms(vec![PlatformTarget::LinuxX64]))
            .await
            .unwrap();

        manifest_mock.assert_async().await;
        archive_mock.assert_async().await;
        assert!(report.is_success(), "{report:?}");
        assert_eq!(report.exit_code(), 0);

        let package = dir.path().join("dist/ext-linux-x64-1.0.0.vsix");
        assert!(package.is_file());
        assert_eq!(
            *packager.calls.lock().unwrap(),
            vec![(ArtifactTarget::Platform(PlatformTarget::LinuxX64), true)]
        );

        let record = report
            .build_info
            .get(ArtifactTarget::Platform(PlatformTarget::LinuxX64))
            .unwrap();
        assert_eq!(record.file_name, "ext-linux-x64-1.0.0.vsix");
        assert_eq!(record.digest(DigestKind::Md5).len(), 32);

        let written: BuildInfo = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("dist/build-info.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(written, report.build_info);

        assert!(!dir.path().join("jre").exists(), "scratch is cleared");
    }

    #[tokio::test]
    async fn unreachable_manifest_skips_remaining_targets() {
        let mut server = Server::new_async().await;
        let manifest_mock = server
            .mock("GET", "/jres/17/downloads/latest/justj.manifest")
            .with_status(503)
            .expect(1)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let packager = Arc::new(FakePackager::default());
        let orch = orchestrator(&server, dir.path(), packager.clone(), None);

        let report = orch
            .run(&BuildPlan::platforms(vec![
                PlatformTarget::Win32X64,
                PlatformTarget::LinuxX64,
                PlatformTarget::DarwinX64,
            ]))
            .await
            .unwrap();

        manifest_mock.assert_async().await;
        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].stage, Stage::Resolve);
        assert_eq!(report.skipped().count(), 2);
        assert_eq!(report.exit_code(), 3);
        assert!(packager.calls.lock().unwrap().is_empty());
        // every requested target still has a record
        assert_eq!(report.build_info.artifacts.len(), 3);
    }

    #[tokio::test]
    async fn missing_entry_downloads_nothing() {
        let mut server = Server::new_async().await;
        let _manifest = server
            .mock("GET", "/jres/17/downloads/latest/justj.manifest")
            .with_status(200)
            .with_body(manifest(&[PlatformTarget::LinuxX64]))
            .create_async()
            .await;
        let archives = server
            .mock("GET", Matcher::Regex(r"\.tar\.gz$".to_string()))
            .expect(0)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(&server, dir.path(), Arc::new(FakePackager::default()), None);

        let report = orch
            .run(&BuildPlan::platforms(vec![PlatformTarget::Win32X64]))
            .await
            .unwrap();

        archives.assert_async().await;
        let failure = report.failures().next().unwrap();
        assert_eq!(failure.stage, Stage::Resolve);
        assert!(failure.error.to_string().contains("win32-x86_64"));
        assert_eq!(report.exit_code(), 3);
    }

    #[tokio::test]
    async fn each_platform_packages_only_its_own_runtime() {
        let mut server = Server::new_async().await;
        let _manifest = server
            .mock("GET", "/jres/17/downloads/latest/justj.manifest")
            .with_status(200)
            .with_body(manifest(&PlatformTarget::ALL))
            .create_async()
            .await;
        for target in [PlatformTarget::Win32X64, PlatformTarget::LinuxX64] {
            server
                .mock("GET", archive_path(target).as_str())
                .with_status(200)
                .with_body(runtime_archive())
                .create_async()
                .await;
        }

        let dir = tempfile::tempdir().unwrap();
        let packager = Arc::new(FakePackager::default());
        let orch = orchestrator(&server, dir.path(), packager.clone(), None);

        let report = orch
            .run(&BuildPlan::platforms(vec![
                PlatformTarget::Win32X64,
                PlatformTarget::LinuxX64,
            ]))
            .await
            .unwrap();

        assert!(report.is_success(), "{report:?}");
        assert_eq!(
            *packager.scratch_seen.lock().unwrap(),
            vec![
                (
                    ArtifactTarget::Platform(PlatformTarget::Win32X64),
                    vec!["17-win32-x86_64".to_string()]
                ),
                (
                    ArtifactTarget::Platform(PlatformTarget::LinuxX64),
                    vec!["17-linux-x86_64".to_string()]
                ),
            ]
        );
    }

    #[tokio::test]
    async fn runtime_tree_removed_when_packaging_fails() {
        let mut server = Server::new_async().await;
        let _manifest = server
            .mock("GET", "/jres/17/downloads/latest/justj.manifest")
            .with_status(200)
            .with_body(manifest(&PlatformTarget::ALL))
            .create_async()
            .await;
        let _archive = server
            .mock("GET", archive_path(PlatformTarget::LinuxX64).as_str())
            .with_status(200)
            .with_body(runtime_archive())
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let packager = Arc::new(FakePackager {
            rename_to: Some("ext-latest.vsix".to_string()),
            ..FakePackager::default()
        });
        let orch = orchestrator(&server, dir.path(), packager, None);
        let product = orch.pre_tasks(true).await.unwrap();

        let failure = orch
            .build_target(PlatformTarget::LinuxX64, &product)
            .await
            .unwrap_err();

        assert_eq!(failure.stage, Stage::Package);
        assert!(dir.path().join("jre").is_dir());
        assert!(!dir.path().join("jre/17-linux-x86_64").exists());
    }

    async fn sibling_survives_missing_entry(jobs: usize) {
        let mut server = Server::new_async().await;
        let _manifest = server
            .mock("GET", "/jres/17/downloads/latest/justj.manifest")
            .with_status(200)
            .with_body(manifest(&[PlatformTarget::LinuxX64]))
            .create_async()
            .await;
        let archive = server
            .mock("GET", archive_path(PlatformTarget::LinuxX64).as_str())
            .with_status(200)
            .with_body(runtime_archive())
            .expect(1)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let packager = Arc::new(FakePackager::default());
        let orch = orchestrator_with_jobs(&server, dir.path(), packager.clone(), None, jobs);

        let report = orch
            .run(&BuildPlan::platforms(vec![
                PlatformTarget::Win32X64,
                PlatformTarget::LinuxX64,
            ]))
            .await
            .unwrap();

        archive.assert_async().await;
        assert_eq!(report.built().count(), 1, "{report:?}");
        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].target, ArtifactTarget::Platform(PlatformTarget::Win32X64));
        assert_eq!(failures[0].stage, Stage::Resolve);
        assert_eq!(report.skipped().count(), 0);
        assert_eq!(report.exit_code(), 3);
        assert!(dir.path().join("dist/ext-linux-x64-1.0.0.vsix").is_file());
        assert_eq!(
            *packager.calls.lock().unwrap(),
            vec![(ArtifactTarget::Platform(PlatformTarget::LinuxX64), true)]
        );
    }

    #[tokio::test]
    async fn missing_entry_does_not_stop_sibling_sequential() {
        sibling_survives_missing_entry(1).await;
    }

    #[tokio::test]
    async fn missing_entry_does_not_stop_sibling_concurrent() {
        sibling_survives_missing_entry(2).await;
    }

    #[tokio::test]
    async fn wrong_package_name_is_naming_mismatch() {
        let server = Server::new_async().await;
        let dir = tempfile::tempdir().unwrap();
        let packager = Arc::new(FakePackager {
            rename_to: Some("ext-latest.vsix".to_string()),
            ..FakePackager::default()
        });
        let orch = orchestrator(&server, dir.path(), packager, None);

        let report = orch.run(&BuildPlan::universal()).await.unwrap();

        let failure = report.failures().next().unwrap();
        assert_eq!(failure.stage, Stage::Package);
        assert!(matches!(
            failure.error,
            BuildError::Integrity(IntegrityError::NamingMismatch { .. })
        ));
        assert_eq!(report.exit_code(), 5);
    }

    #[tokio::test]
    async fn absent_package_fails_at_hashing() {
        let server = Server::new_async().await;
        let dir = tempfile::tempdir().unwrap();
        let packager = Arc::new(FakePackager {
            write_nothing: true,
            ..FakePackager::default()
        });
        let orch = orchestrator(&server, dir.path(), packager, None);

        let report = orch.run(&BuildPlan::universal()).await.unwrap();

        let failure = report.failures().next().unwrap();
        assert_eq!(failure.stage, Stage::Hash);
        let record = report.build_info.get(ArtifactTarget::Universal).unwrap();
        assert_eq!(record.file_name, "ext-1.0.0.vsix");
        assert!(!record.is_present());
    }

    #[tokio::test]
    async fn universal_build_is_signed() {
        let server = Server::new_async().await;
        let dir = tempfile::tempdir().unwrap();
        let credentials = SigningCredentials {
            armored_key: include_str!("../../tests/fixtures/signing-key.asc").to_string(),
            passphrase: "correct-horse".to_string(),
        };
        let orch = orchestrator(
            &server,
            dir.path(),
            Arc::new(FakePackager::default()),
            Some(credentials),
        );

        let report = orch.run(&BuildPlan::universal()).await.unwrap();

        assert!(report.is_success(), "{report:?}");
        assert_eq!(report.signatures.len(), 1);
        assert!(dir.path().join("dist/ext-1.0.0.vsix.asc").is_file());
    }

    #[tokio::test]
    async fn bad_passphrase_is_a_step_failure() {
        let server = Server::new_async().await;
        let dir = tempfile::tempdir().unwrap();
        let credentials = SigningCredentials {
            armored_key: include_str!("../../tests/fixtures/signing-key.asc").to_string(),
            passphrase: "nope".to_string(),
        };
        let orch = orchestrator(
            &server,
            dir.path(),
            Arc::new(FakePackager::default()),
            Some(credentials),
        );

        let report = orch.run(&BuildPlan::universal()).await.unwrap();

        assert_eq!(report.built().count(), 1);
        assert_eq!(report.step_failures.len(), 1);
        assert_eq!(report.step_failures[0].stage, Stage::Sign);
        assert_eq!(report.exit_code(), 5);
        assert!(!dir.path().join("dist/ext-1.0.0.vsix.asc").exists());
    }

    #[tokio::test]
    async fn clean_removes_previous_outputs_only() {
        let server = Server::new_async().await;
        let dir = tempfile::tempdir().unwrap();
        let dist = dir.path().join("dist");
        std::fs::create_dir_all(dir.path().join("jre/17-linux-x86_64")).unwrap();
        std::fs::create_dir_all(&dist).unwrap();
        for name in [
            "ext-1.0.0.vsix",
            "ext-linux-x64-0.9.0.vsix",
            "ext-linux-x64-0.9.0.vsix.asc",
            "build-info.json",
            "other-1.0.0.vsix",
            "notes.txt",
        ] {
            std::fs::write(dist.join(name), name).unwrap();
        }

        let orch = orchestrator(&server, dir.path(), Arc::new(FakePackager::default()), None);
        let removed = orch.clean("ext").await.unwrap();

        assert_eq!(removed, 4);
        assert!(!dir.path().join("jre").exists());
        assert!(dist.join("other-1.0.0.vsix").exists());
        assert!(dist.join("notes.txt").exists());
    }
}
