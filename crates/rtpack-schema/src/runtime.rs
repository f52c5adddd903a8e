//! Runtime distribution manifest entries and the names derived from them.
//!
//! A distribution manifest is plain text, one relative archive path per line:
//!
//! ```text
//! ../20211012_0921/org.eclipse.justj.openjdk.hotspot.jre.full.stripped-17-linux-aarch64.tar.gz
//! ../20211012_0921/org.eclipse.justj.openjdk.hotspot.jre.full.stripped-17-linux-x86_64.tar.gz
//! ```

use serde::{Deserialize, Serialize};

use crate::PlatformTarget;

/// Archive-format extensions stripped when deriving a version label.
pub const ARCHIVE_EXTENSIONS: [&str; 8] = [".7z", ".bz2", ".gz", ".rar", ".tar", ".tgz", ".xz", ".zip"];

/// One downloadable runtime bundle selected from a distribution manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Relative path of the archive, as written in the manifest.
    pub path: String,
    /// Platform the bundle was selected for.
    pub platform: PlatformTarget,
    /// Runtime major version the manifest was fetched for.
    pub runtime_version: u32,
}

impl ManifestEntry {
    /// Pick the first manifest line naming both the bundle family and the
    /// platform's runtime code.
    ///
    /// Lines may end in `\n` or `\r\n`; surrounding whitespace is ignored.
    pub fn select(
        manifest: &str,
        bundle_marker: &str,
        platform: PlatformTarget,
        runtime_version: u32,
    ) -> Option<Self> {
        let code = platform.runtime_code();
        manifest
            .lines()
            .map(str::trim)
            .find(|line| line.contains(bundle_marker) && line.contains(code))
            .map(|line| Self {
                path: line.to_string(),
                platform,
                runtime_version,
            })
    }

    /// File name of the archive (last path segment).
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Version label naming the extracted runtime directory.
    pub fn version_label(&self) -> VersionLabel {
        VersionLabel::from_archive_name(self.file_name())
    }
}

/// Name of an extracted runtime directory, derived from its archive name.
///
/// The label is the archive name with its format extensions removed, keeping
/// only the text after the first hyphen.
///
/// ```
/// use rtpack_schema::VersionLabel;
///
/// let label = VersionLabel::from_archive_name("bundle.full-17-linux-x86_64.tar.gz");
/// assert_eq!(label.as_str(), "17-linux-x86_64");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionLabel(String);

impl VersionLabel {
    /// Derive the label from an archive file name.
    pub fn from_archive_name(name: &str) -> Self {
        let stem = strip_archive_extensions(name);
        let label = stem.split_once('-').map_or(stem, |(_, rest)| rest);
        Self(label.to_string())
    }

    /// Return the label as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VersionLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VersionLabel {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Remove every trailing archive-format extension, so `a-1.tar.gz` becomes `a-1`.
pub fn strip_archive_extensions(name: &str) -> &str {
    let mut stem = name;
    while let Some(shorter) = ARCHIVE_EXTENSIONS
        .iter()
        .find_map(|ext| stem.strip_suffix(ext))
    {
        stem = shorter;
    }
    stem
}
