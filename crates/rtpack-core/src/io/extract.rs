//! Streaming tar.gz extraction.
//!
//! The archive is pulled through three chained stages:
//!
//! ```text
//! File -> StageReader(read) -> BufReader -> GzipDecoder -> StageReader(decompress) -> tar
//! ```
//!
//! Each stage only reads when the next one asks for bytes, so the untar stage
//! sets the pace and memory stays bounded by buffer sizes. Errors are tagged
//! with the stage that raised them as they cross a [`StageReader`].

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use async_compression::tokio::bufread::GzipDecoder;
use futures::StreamExt;
use rtpack_schema::PlatformTarget;
use thiserror::Error;
use tokio::io::{AsyncRead, BufReader, ReadBuf};
use tokio_tar::Archive;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::Reporter;

/// The extraction stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractStage {
    Read,
    Decompress,
    Unpack,
}

impl ExtractStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Decompress => "decompress",
            Self::Unpack => "unpack",
        }
    }
}

impl fmt::Display for ExtractStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("extracting {archive} failed at {stage}: {source}")]
    Stage {
        stage: ExtractStage,
        archive: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("extraction of {archive} cancelled")]
    Cancelled { archive: PathBuf },

    #[error("failed to remove {archive} after extraction: {source}")]
    RemoveArchive {
        archive: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ExtractError {
    /// The stage that failed, if the error came from the stream itself.
    pub fn stage(&self) -> Option<ExtractStage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// An io error raised inside a particular stage.
#[derive(Debug)]
struct StageFailure {
    stage: ExtractStage,
    source: io::Error,
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} stage: {}", self.stage, self.source)
    }
}

impl std::error::Error for StageFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Reader adapter that tags errors passing through it with `stage`.
///
/// Errors already tagged by an upstream stage pass through untouched.
pub struct StageReader<R> {
    inner: R,
    stage: ExtractStage,
}

impl<R> StageReader<R> {
    pub fn new(inner: R, stage: ExtractStage) -> Self {
        Self { inner, stage }
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for StageReader<R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let stage = self.stage;
        match Pin::new(&mut self.inner).poll_read(cx, buf) {
            Poll::Ready(Err(e)) if stage_of(&e).is_none() => Poll::Ready(Err(io::Error::new(
                e.kind(),
                StageFailure { stage, source: e },
            ))),
            other => other,
        }
    }
}

/// Find the stage tag anywhere in an error chain.
///
/// `io::Error::source` skips over its wrapped error, so custom io errors are
/// unwrapped with `get_ref` as well.
fn stage_of(err: &io::Error) -> Option<ExtractStage> {
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = current {
        if let Some(failure) = e.downcast_ref::<StageFailure>() {
            return Some(failure.stage);
        }
        if let Some(inner) = e.downcast_ref::<io::Error>().and_then(io::Error::get_ref) {
            current = Some(inner as &(dyn std::error::Error + 'static));
            continue;
        }
        current = e.source();
    }
    None
}

/// Request for an extraction
pub struct ExtractRequest<'a> {
    pub archive: &'a Path,
    pub output: &'a Path,
    pub platform: PlatformTarget,
    pub reporter: &'a dyn Reporter,
    pub cancel: &'a CancellationToken,
}

impl<'a> ExtractRequest<'a> {
    pub fn new(
        archive: &'a Path,
        output: &'a Path,
        platform: PlatformTarget,
        reporter: &'a dyn Reporter,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            archive,
            output,
            platform,
            reporter,
            cancel,
        }
    }

    pub async fn execute(self) -> Result<u64, ExtractError> {
        extract(self).await
    }
}

/// Removes a partially extracted tree on drop unless disarmed. A directory
/// that existed before the extraction started is never removed.
struct PartialTree<'a> {
    path: &'a Path,
    preexisting: bool,
    complete: bool,
}

impl Drop for PartialTree<'_> {
    fn drop(&mut self) {
        if !self.complete && !self.preexisting && self.path.exists() {
            if let Err(e) = std::fs::remove_dir_all(self.path) {
                warn!(path = %self.path.display(), "could not remove partial extraction: {e}");
            } else {
                debug!(path = %self.path.display(), "removed partial extraction");
            }
        }
    }
}

/// Extract the gzip-compressed tar at `req.archive` into `req.output`.
///
/// The output directory is created if absent and not cleared if present.
/// On success the archive is deleted and the number of unpacked entries
/// returned. On failure or cancellation the archive is kept, and the output
/// directory is removed if this call created it.
pub async fn extract(req: ExtractRequest<'_>) -> Result<u64, ExtractError> {
    let preexisting = tokio::fs::try_exists(req.output).await.unwrap_or(true);
    let mut guard = PartialTree {
        path: req.output,
        preexisting,
        complete: false,
    };

    debug!(archive = %req.archive.display(), output = %req.output.display(), "extracting");

    let entries = tokio::select! {
        biased;
        _ = req.cancel.cancelled() => {
            return Err(ExtractError::Cancelled { archive: req.archive.to_path_buf() });
        }
        res = unpack(&req) => res.map_err(|source| ExtractError::Stage {
            stage: stage_of(&source).unwrap_or(ExtractStage::Unpack),
            archive: req.archive.to_path_buf(),
            source,
        })?,
    };

    guard.complete = true;

    tokio::fs::remove_file(req.archive)
        .await
        .map_err(|source| ExtractError::RemoveArchive {
            archive: req.archive.to_path_buf(),
            source,
        })?;

    debug!(entries, output = %req.output.display(), "extraction complete");
    Ok(entries)
}

async fn unpack(req: &ExtractRequest<'_>) -> io::Result<u64> {
    let file = tokio::fs::File::open(req.archive)
        .await
        .map_err(|source| {
            io::Error::new(
                source.kind(),
                StageFailure {
                    stage: ExtractStage::Read,
                    source,
                },
            )
        })?;

    tokio::fs::create_dir_all(req.output).await?;

    let read = StageReader::new(file, ExtractStage::Read);
    let gunzip = GzipDecoder::new(BufReader::new(read));
    let mut archive = Archive::new(StageReader::new(gunzip, ExtractStage::Decompress));

    let mut entries = archive.entries()?;
    let mut count: u64 = 0;
    req.reporter.extracting(req.platform, 0);

    while let Some(entry) = entries.next().await {
        let mut entry = entry?;
        if entry.unpack_in(req.output).await? {
            count += 1;
            req.reporter.extracting(req.platform, count);
        } else {
            warn!(path = %entry.path()?.display(), "skipped archive entry outside the output directory");
        }
    }

    Ok(count)
}
