//! Produced artifacts: naming, digest records and signatures.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::ArtifactTarget;

/// Suffix appended to an artifact's file name to form its detached signature.
pub const SIGNATURE_SUFFIX: &str = ".asc";

/// Digest algorithms recorded for every artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestKind {
    /// MD5, kept for consumers that still check it.
    Md5,
    /// SHA-1.
    Sha1,
}

impl DigestKind {
    /// Every digest kind; a complete record holds exactly these keys.
    pub const ALL: [Self; 2] = [Self::Md5, Self::Sha1];

    /// Algorithm name as written in build-info documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
        }
    }

    /// Length of the lowercase hex digest.
    pub fn hex_len(&self) -> usize {
        match self {
            Self::Md5 => 32,
            Self::Sha1 => 40,
        }
    }
}

impl std::fmt::Display for DigestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// File name and content digests of one produced package.
///
/// The digest map always holds every [`DigestKind`]. An empty value means the
/// file was not there when hashing ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactRecord {
    /// File name of the artifact inside the output directory.
    pub file_name: String,
    hashes: BTreeMap<DigestKind, String>,
}

impl ArtifactRecord {
    /// A record for `file_name` whose digests are all empty.
    pub fn absent(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            hashes: DigestKind::ALL
                .into_iter()
                .map(|kind| (kind, String::new()))
                .collect(),
        }
    }

    /// Store the hex digest computed for `kind`.
    pub fn set_digest(&mut self, kind: DigestKind, hex: impl Into<String>) {
        self.hashes.insert(kind, hex.into());
    }

    /// The hex digest for `kind`, empty if the file was absent.
    pub fn digest(&self, kind: DigestKind) -> &str {
        self.hashes.get(&kind).map_or("", String::as_str)
    }

    /// All digests, keyed by algorithm.
    pub fn digests(&self) -> &BTreeMap<DigestKind, String> {
        &self.hashes
    }

    /// Whether every digest has been filled in.
    pub fn is_present(&self) -> bool {
        DigestKind::ALL.iter().all(|k| !self.digest(*k).is_empty())
    }
}

/// File name of the package produced for `target`.
///
/// Platform packages are `<product>-<platform>-<version>.<ext>`, the universal
/// package is `<product>-<version>.<ext>`.
///
/// ```
/// use rtpack_schema::{ArtifactTarget, PlatformTarget, artifact_file_name};
///
/// let name = artifact_file_name("ext", ArtifactTarget::Platform(PlatformTarget::LinuxX64), "1.2.0", "vsix");
/// assert_eq!(name, "ext-linux-x64-1.2.0.vsix");
/// assert_eq!(artifact_file_name("ext", ArtifactTarget::Universal, "1.2.0", "vsix"), "ext-1.2.0.vsix");
/// ```
pub fn artifact_file_name(
    product: &str,
    target: ArtifactTarget,
    version: &str,
    extension: &str,
) -> String {
    match target {
        ArtifactTarget::Universal => format!("{product}-{version}.{extension}"),
        ArtifactTarget::Platform(p) => format!("{product}-{p}-{version}.{extension}"),
    }
}

/// A detached signature written next to its artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRecord {
    /// The signed file.
    pub artifact: PathBuf,
    /// Where the signature was written.
    pub signature_path: PathBuf,
    /// ASCII-armored OpenPGP signature (the `.asc` file content).
    pub signature: String,
}

/// Signature path for an artifact: the artifact path plus [`SIGNATURE_SUFFIX`].
pub fn signature_path_for(artifact: &std::path::Path) -> PathBuf {
    let mut name = artifact.as_os_str().to_owned();
    name.push(SIGNATURE_SUFFIX);
    PathBuf::from(name)
}

/// Hash records of one build run, keyed by target label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInfo {
    /// Product version the artifacts were built for.
    pub version: String,
    /// One record per built target (`universal` or a platform identifier).
    pub artifacts: BTreeMap<String, ArtifactRecord>,
}

impl BuildInfo {
    /// Empty build info for `version`.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            artifacts: BTreeMap::new(),
        }
    }

    /// Store the record for `target`, replacing any earlier one.
    pub fn insert(&mut self, target: ArtifactTarget, record: ArtifactRecord) {
        self.artifacts.insert(target.label().to_string(), record);
    }

    /// Look up the record stored for `target`.
    pub fn get(&self, target: ArtifactTarget) -> Option<&ArtifactRecord> {
        self.artifacts.get(target.label())
    }
}
