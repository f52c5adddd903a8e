//! md5 and sha1 digests computed from a single read of the file.

use std::path::Path;

use md5::Md5;
use rtpack_schema::{ArtifactRecord, DigestKind};
use sha1::{Digest, Sha1};
use tokio::io::AsyncReadExt;

use super::IntegrityError;

const BUF_SIZE: usize = 64 * 1024;

/// Hash the file at `path`.
///
/// A missing file is not an error: the record comes back with empty
/// digests and the caller decides whether that matters.
pub async fn compute_hashes(path: &Path) -> Result<ArtifactRecord, IntegrityError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut file = match tokio::fs::File::open(path).await {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(ArtifactRecord::absent(file_name));
        }
        Err(e) => return Err(IntegrityError::io(path)(e)),
    };

    let mut md5 = Md5::new();
    let mut sha1 = Sha1::new();
    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = file.read(&mut buf).await.map_err(IntegrityError::io(path))?;
        if n == 0 {
            break;
        }
        md5.update(&buf[..n]);
        sha1.update(&buf[..n]);
    }

    let mut record = ArtifactRecord::absent(file_name);
    record.set_digest(DigestKind::Md5, hex::encode(md5.finalize()));
    record.set_digest(DigestKind::Sha1, hex::encode(sha1.finalize()));
    Ok(record)
}
