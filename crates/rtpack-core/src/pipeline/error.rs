//! Pipeline errors and their classification.

use std::path::PathBuf;

use rtpack_schema::{ArtifactTarget, UnsupportedPlatform};
use thiserror::Error;

use crate::config::ConfigError;
use crate::hooks::HookError;
use crate::integrity::IntegrityError;
use crate::io::{ExtractError, FetchError};
use crate::manifest::ResolveError;
use crate::packager::PackagerError;

/// Where in the pipeline a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resolve,
    Fetch,
    Extract,
    Package,
    Hash,
    Sign,
    Hook,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resolve => "resolve",
            Self::Fetch => "fetch",
            Self::Extract => "extract",
            Self::Package => "package",
            Self::Hash => "hash",
            Self::Sign => "sign",
            Self::Hook => "hook",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Packager(#[from] PackagerError),

    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    #[error(transparent)]
    Hook(#[from] HookError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{context}: {message}")]
    Context {
        context: &'static str,
        message: String,
    },
}

impl From<UnsupportedPlatform> for BuildError {
    fn from(err: UnsupportedPlatform) -> Self {
        Self::Resolve(ResolveError::UnsupportedPlatform(err))
    }
}

impl BuildError {
    /// Create an error with context for better debugging.
    pub fn context(ctx: &'static str, msg: impl std::fmt::Display) -> Self {
        Self::Context {
            context: ctx,
            message: msg.to_string(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Resolve(ResolveError::UnsupportedPlatform(_)) | Self::Config(_) => ErrorKind::Usage,
            Self::Resolve(_) => ErrorKind::Upstream,
            Self::Fetch(FetchError::Cancelled { .. })
            | Self::Extract(ExtractError::Cancelled { .. }) => ErrorKind::Cancelled,
            Self::Fetch(_) | Self::Extract(_) => ErrorKind::Transfer,
            Self::Integrity(_) => ErrorKind::Integrity,
            Self::Packager(_) | Self::Hook(_) => ErrorKind::Tool,
            Self::Io { .. } | Self::Context { .. } => ErrorKind::Other,
        }
    }

    /// Whether the run should stop scheduling further targets.
    pub fn is_manifest_unavailable(&self) -> bool {
        matches!(self, Self::Resolve(ResolveError::ManifestUnavailable { .. }))
    }
}

/// Failure classes, each with its own process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorKind {
    Other,
    Usage,
    Upstream,
    Transfer,
    Integrity,
    Tool,
    Cancelled,
}

impl ErrorKind {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Other => 1,
            Self::Usage => 2,
            Self::Upstream => 3,
            Self::Transfer => 4,
            Self::Integrity => 5,
            Self::Tool => 6,
            Self::Cancelled => 130,
        }
    }
}

/// A target that could not be built.
#[derive(Error, Debug)]
#[error("{target} failed at {stage}: {error}")]
pub struct TargetFailure {
    pub target: ArtifactTarget,
    pub stage: Stage,
    #[source]
    pub error: BuildError,
}

impl TargetFailure {
    pub fn new(target: ArtifactTarget, stage: Stage, error: impl Into<BuildError>) -> Self {
        Self {
            target,
            stage,
            error: error.into(),
        }
    }
}

/// A run-level step (hashing, signing, hooks) that failed after the builds.
#[derive(Error, Debug)]
#[error("{stage} step failed: {error}")]
pub struct StepFailure {
    pub stage: Stage,
    #[source]
    pub error: BuildError,
}
