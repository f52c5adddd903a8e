//! Filesystem layout of a build run.
//!
//! ```text
//! <scratch>/
//! ├── <archive file>          # downloaded bundle, removed after extraction
//! └── <version label>/        # extracted runtime tree
//! <output>/
//! ├── <product>-<platform>-<version>.<ext>
//! ├── <product>-<platform>-<version>.<ext>.asc
//! ├── <product>-<version>.<ext>
//! └── build-info.json
//! ```
//!
//! Version labels embed the platform's runtime code, so every target gets
//! disjoint scratch paths.

use std::io;
use std::path::{Path, PathBuf};

use rtpack_schema::{ManifestEntry, VersionLabel};

/// Name of the per-run hash record written to the output directory.
pub const BUILD_INFO_FILE: &str = "build-info.json";

#[derive(Debug, Clone)]
pub struct ScratchLayout {
    root: PathBuf,
}

impl ScratchLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the bundle for `entry` is downloaded to.
    pub fn archive_path(&self, entry: &ManifestEntry) -> PathBuf {
        self.root.join(entry.file_name())
    }

    /// Where the runtime tree labelled `label` is extracted to.
    pub fn tree_dir(&self, label: &VersionLabel) -> PathBuf {
        self.root.join(label.as_str())
    }

    pub async fn ensure(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    /// Remove the whole scratch directory. Only safe once every target
    /// reached a terminal state.
    pub async fn clear(&self) -> io::Result<()> {
        match tokio::fs::remove_dir_all(&self.root).await {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}
