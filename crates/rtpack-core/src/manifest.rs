//! Runtime distribution manifest resolution.
//!
//! Maps a platform identifier to the bundle listed for it in the remote
//! manifest at `{base}/{version}/downloads/latest/{manifest}`.

use reqwest::Client;
use rtpack_schema::{ManifestEntry, PlatformTarget, UnsupportedPlatform};
use thiserror::Error;
use tracing::debug;

use crate::config::RuntimeConfig;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error(transparent)]
    UnsupportedPlatform(#[from] UnsupportedPlatform),

    #[error("manifest {url} unavailable: {reason}")]
    ManifestUnavailable { url: String, reason: String },

    #[error(
        "no bundle for runtime {runtime_version} on {platform} ({code}) in {url}; check the runtime version or platform mapping"
    )]
    NoMatchingEntry {
        platform: PlatformTarget,
        code: &'static str,
        runtime_version: u32,
        url: String,
    },
}

/// Resolves platform targets against one runtime version's manifest.
#[derive(Debug, Clone)]
pub struct ManifestResolver {
    client: Client,
    runtime: RuntimeConfig,
}

impl ManifestResolver {
    pub fn new(client: Client, runtime: RuntimeConfig) -> Self {
        Self { client, runtime }
    }

    fn latest_url(&self) -> String {
        format!(
            "{}/{}/downloads/latest",
            self.runtime.base_url.trim_end_matches('/'),
            self.runtime.version
        )
    }

    pub fn manifest_url(&self) -> String {
        format!("{}/{}", self.latest_url(), self.runtime.manifest)
    }

    /// Download URL of a resolved entry. Relative segments are left for the
    /// URL parser to normalise.
    pub fn download_url(&self, entry: &ManifestEntry) -> String {
        format!("{}/{}", self.latest_url(), entry.path)
    }

    /// Validate `target` and resolve it. Unknown identifiers fail before any
    /// request is made.
    pub async fn resolve(&self, target: &str) -> Result<ManifestEntry, ResolveError> {
        let platform: PlatformTarget = target.parse()?;
        self.resolve_target(platform).await
    }

    pub async fn resolve_target(
        &self,
        platform: PlatformTarget,
    ) -> Result<ManifestEntry, ResolveError> {
        let manifest = self.fetch_manifest().await?;
        ManifestEntry::select(
            &manifest,
            &self.runtime.bundle_marker,
            platform,
            self.runtime.version,
        )
        .ok_or_else(|| ResolveError::NoMatchingEntry {
            platform,
            code: platform.runtime_code(),
            runtime_version: self.runtime.version,
            url: self.manifest_url(),
        })
    }

    /// Fetch the manifest text. Every call goes to the network.
    pub async fn fetch_manifest(&self) -> Result<String, ResolveError> {
        let url = self.manifest_url();
        debug!(%url, "fetching runtime manifest");

        let unavailable = |reason: String| ResolveError::ManifestUnavailable {
            url: url.clone(),
            reason,
        };

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(unavailable(format!("HTTP {status}")));
        }

        let text = response
            .text()
            .await
            .map_err(|e| unavailable(e.to_string()))?;
        if text.trim().is_empty() {
            return Err(unavailable("empty manifest".to_string()));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    const MARKER: &str = "org.eclipse.justj.openjdk.hotspot.jre.full.stripped";

    fn manifest() -> String {
        PlatformTarget::ALL
            .iter()
            .map(|t| format!("../20211012_0921/{MARKER}-17-{}.tar.gz", t.runtime_code()))
            .collect::<Vec<_>>()
            .join("\r\n")
    }

    fn resolver(base: &str) -> ManifestResolver {
        ManifestResolver::new(
            Client::new(),
            RuntimeConfig {
                base_url: format!("{base}/jres/"),
                ..RuntimeConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn resolves_every_supported_target() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/jres/17/downloads/latest/justj.manifest")
            .with_status(200)
            .with_body(manifest())
            .expect(PlatformTarget::ALL.len())
            .create_async()
            .await;

        let resolver = resolver(&server.url());
        for target in PlatformTarget::ALL {
            let entry = resolver.resolve(target.as_str()).await.unwrap();
            assert!(entry.path.contains(target.runtime_code()));
            assert_eq!(entry.platform, target);
            assert_eq!(entry.runtime_version, 17);
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unsupported_platform_makes_no_request() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let err = resolver(&server.url())
            .resolve("solaris-sparc")
            .await
            .unwrap_err();
        match err {
            ResolveError::UnsupportedPlatform(e) => {
                assert_eq!(e.requested, "solaris-sparc");
                assert!(e.supported.contains(&"linux-x64".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn missing_line_is_no_matching_entry() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/jres/17/downloads/latest/justj.manifest")
            .with_status(200)
            .with_body(format!("../x/{MARKER}-17-linux-aarch64.tar.gz\n"))
            .create_async()
            .await;

        let err = resolver(&server.url())
            .resolve("win32-x64")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ResolveError::NoMatchingEntry {
                platform: PlatformTarget::Win32X64,
                code: "win32-x86_64",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn error_status_is_manifest_unavailable() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/jres/17/downloads/latest/justj.manifest")
            .with_status(404)
            .create_async()
            .await;

        let err = resolver(&server.url())
            .resolve("linux-x64")
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::ManifestUnavailable { .. }));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn empty_body_is_manifest_unavailable() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/jres/17/downloads/latest/justj.manifest")
            .with_status(200)
            .with_body("\n")
            .create_async()
            .await;

        let err = resolver(&server.url())
            .resolve("linux-x64")
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::ManifestUnavailable { .. }));
    }

    #[test]
    fn download_url_keeps_entry_path() {
        let resolver = resolver("http://host");
        let entry = ManifestEntry {
            path: "../20211012_0921/b-17-linux-x86_64.tar.gz".to_string(),
            platform: PlatformTarget::LinuxX64,
            runtime_version: 17,
        };
        assert_eq!(
            resolver.download_url(&entry),
            "http://host/jres/17/downloads/latest/../20211012_0921/b-17-linux-x86_64.tar.gz"
        );
        let parsed = reqwest::Url::parse(&resolver.download_url(&entry)).unwrap();
        assert_eq!(parsed.path(), "/jres/17/downloads/20211012_0921/b-17-linux-x86_64.tar.gz");
    }
}
