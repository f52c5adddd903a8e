//! Streaming archive fetcher.
//!
//! The response body is written to disk chunk by chunk. The destination is
//! removed on every failure or cancellation path, so a partial archive never
//! survives.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use reqwest::Client;
use rtpack_schema::PlatformTarget;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::Reporter;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("transfer of {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("transfer of {url} cancelled")]
    Cancelled { url: String },
}

/// Request for a fetch operation
pub struct FetchRequest<'a> {
    pub client: &'a Client,
    pub url: &'a str,
    pub dest: &'a Path,
    pub platform: PlatformTarget,
    pub reporter: &'a dyn Reporter,
    pub cancel: &'a CancellationToken,
}

impl<'a> FetchRequest<'a> {
    pub fn new(
        client: &'a Client,
        url: &'a str,
        dest: &'a Path,
        platform: PlatformTarget,
        reporter: &'a dyn Reporter,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            client,
            url,
            dest,
            platform,
            reporter,
            cancel,
        }
    }

    pub async fn execute(self) -> Result<u64, FetchError> {
        fetch(self).await
    }
}

/// Removes the destination on drop unless the transfer completed.
struct PartialFile<'a> {
    path: &'a Path,
    complete: bool,
}

impl Drop for PartialFile<'_> {
    fn drop(&mut self) {
        if !self.complete {
            match std::fs::remove_file(self.path) {
                Ok(()) => debug!(path = %self.path.display(), "removed partial download"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => debug!(path = %self.path.display(), "could not remove partial download: {e}"),
            }
        }
    }
}

/// Stream `req.url` into `req.dest`, returning the number of bytes written.
///
/// Returns only after the file has been flushed and synced.
pub async fn fetch(req: FetchRequest<'_>) -> Result<u64, FetchError> {
    let mut guard = PartialFile {
        path: req.dest,
        complete: false,
    };

    debug!(url = req.url, dest = %req.dest.display(), "fetching archive");

    let written = tokio::select! {
        biased;
        _ = req.cancel.cancelled() => {
            return Err(FetchError::Cancelled { url: req.url.to_string() });
        }
        res = transfer(&req) => res?,
    };

    guard.complete = true;
    Ok(written)
}

async fn transfer(req: &FetchRequest<'_>) -> Result<u64, FetchError> {
    let http = |source| FetchError::Http {
        url: req.url.to_string(),
        source,
    };
    let io = |source| FetchError::Io {
        path: req.dest.to_path_buf(),
        source,
    };

    let response = req
        .client
        .get(req.url)
        .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
        .send()
        .await
        .map_err(http)?
        .error_for_status()
        .map_err(http)?;

    let total = response.content_length();
    req.reporter.downloading(req.platform, 0, total);

    let mut file = File::create(req.dest).await.map_err(io)?;
    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(http)?;
        file.write_all(&chunk).await.map_err(io)?;
        downloaded += chunk.len() as u64;
        req.reporter.downloading(req.platform, downloaded, total);
    }

    file.flush().await.map_err(io)?;
    file.sync_all().await.map_err(io)?;
    Ok(downloaded)
}
