//! Artifact integrity: content digests and detached signatures.

pub mod digest;
pub mod signing;

use std::path::PathBuf;

use thiserror::Error;

pub use digest::compute_hashes;
pub use signing::{
    find_signable, fingerprint, parse_public_key, sign, sign_all, unlock_key, verify,
};

#[derive(Error, Debug)]
pub enum IntegrityError {
    #[error("expected artifact {expected} not found in {dir}")]
    NamingMismatch { expected: String, dir: PathBuf },

    #[error("cannot use signing key: {0}")]
    SigningKey(String),

    #[error("failed to create signature: {0}")]
    Signature(String),

    #[error("invalid public key: {0}")]
    PublicKey(String),

    #[error("signature check failed for {path}: {reason}")]
    BadSignature { path: PathBuf, reason: String },

    #[error("invalid signable pattern '{pattern}': {reason}")]
    Pattern { pattern: String, reason: String },

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl IntegrityError {
    pub(crate) fn io(path: &std::path::Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
