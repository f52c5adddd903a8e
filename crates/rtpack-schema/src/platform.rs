//! Target platforms and their runtime distribution codes.
//!
//! Every platform an editor extension can be packaged for maps to exactly one
//! platform code used by the runtime distribution manifest.
//!
//! # Example
//!
//! ```
//! use rtpack_schema::PlatformTarget;
//!
//! let target: PlatformTarget = "linux-x64".parse().unwrap();
//! assert_eq!(target.runtime_code(), "linux-x86_64");
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A platform a runtime-bundling package can be built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PlatformTarget {
    /// 64-bit ARM Linux.
    LinuxArm64,
    /// `x86_64` Linux.
    LinuxX64,
    /// Apple Silicon macOS.
    DarwinArm64,
    /// Intel macOS.
    DarwinX64,
    /// `x86_64` Windows.
    Win32X64,
}

impl PlatformTarget {
    /// Every supported target, in the order they are listed to users.
    pub const ALL: [Self; 5] = [
        Self::LinuxArm64,
        Self::LinuxX64,
        Self::DarwinArm64,
        Self::DarwinX64,
        Self::Win32X64,
    ];

    /// Targets built by a full multi-platform build when none are configured.
    pub const DEFAULT_TARGETED: [Self; 4] = [
        Self::Win32X64,
        Self::LinuxX64,
        Self::DarwinX64,
        Self::DarwinArm64,
    ];

    /// The identifier used on the command line and in artifact names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LinuxArm64 => "linux-arm64",
            Self::LinuxX64 => "linux-x64",
            Self::DarwinArm64 => "darwin-arm64",
            Self::DarwinX64 => "darwin-x64",
            Self::Win32X64 => "win32-x64",
        }
    }

    /// Platform code used by the runtime distribution manifest.
    pub fn runtime_code(&self) -> &'static str {
        match self {
            Self::LinuxArm64 => "linux-aarch64",
            Self::LinuxX64 => "linux-x86_64",
            Self::DarwinArm64 => "macosx-aarch64",
            Self::DarwinX64 => "macosx-x86_64",
            Self::Win32X64 => "win32-x86_64",
        }
    }

    /// Identifiers of every supported target.
    pub fn supported() -> Vec<String> {
        Self::ALL.iter().map(|t| t.as_str().to_string()).collect()
    }
}

impl std::fmt::Display for PlatformTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PlatformTarget {
    type Err = UnsupportedPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnsupportedPlatform::new(s))
    }
}

impl TryFrom<String> for PlatformTarget {
    type Error = UnsupportedPlatform;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PlatformTarget> for String {
    fn from(target: PlatformTarget) -> Self {
        target.as_str().to_string()
    }
}

/// A requested platform with no runtime mapping.
///
/// Carries the full supported list so callers can print a useful diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported platform '{requested}', supported platforms: {}", supported.join(", "))]
pub struct UnsupportedPlatform {
    /// The identifier that was asked for.
    pub requested: String,
    /// Every identifier that would have been accepted.
    pub supported: Vec<String>,
}

impl UnsupportedPlatform {
    /// Build the error for `requested`, filling in the supported list.
    pub fn new(requested: impl Into<String>) -> Self {
        Self {
            requested: requested.into(),
            supported: PlatformTarget::supported(),
        }
    }
}

/// What a packaged artifact is built for: one platform, or every platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArtifactTarget {
    /// Platform-independent package without a bundled runtime.
    Universal,
    /// Package bundling the runtime for one platform.
    Platform(PlatformTarget),
}

impl ArtifactTarget {
    /// Label used as the build-info key and in diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Universal => "universal",
            Self::Platform(p) => p.as_str(),
        }
    }

    /// The platform, if this is a platform-specific target.
    pub fn platform(&self) -> Option<PlatformTarget> {
        match self {
            Self::Universal => None,
            Self::Platform(p) => Some(*p),
        }
    }
}

impl std::fmt::Display for ArtifactTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl From<PlatformTarget> for ArtifactTarget {
    fn from(p: PlatformTarget) -> Self {
        Self::Platform(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_target_maps_to_a_runtime_code() {
        for target in PlatformTarget::ALL {
            let parsed: PlatformTarget = target.as_str().parse().unwrap();
            assert_eq!(parsed, target);
            assert!(!target.runtime_code().is_empty());
        }
    }

    #[test]
    fn unknown_target_lists_supported_set() {
        let err = "solaris-sparc".parse::<PlatformTarget>().unwrap_err();
        assert_eq!(err.requested, "solaris-sparc");
        assert_eq!(err.supported.len(), PlatformTarget::ALL.len());
        assert!(err.to_string().contains("darwin-arm64"));
    }

    #[test]
    fn default_targets_are_supported() {
        for target in PlatformTarget::DEFAULT_TARGETED {
            assert!(PlatformTarget::ALL.contains(&target));
        }
    }

    #[test]
    fn serde_uses_identifier() {
        let json = serde_json::to_string(&PlatformTarget::DarwinX64).unwrap();
        assert_eq!(json, "\"darwin-x64\"");
        let back: PlatformTarget = serde_json::from_str("\"win32-x64\"").unwrap();
        assert_eq!(back, PlatformTarget::Win32X64);
        assert!(serde_json::from_str::<PlatformTarget>("\"beos\"").is_err());
    }
}
