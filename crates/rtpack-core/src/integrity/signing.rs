//! Detached OpenPGP signatures.
//!
//! Keys are ASCII-armored OpenPGP private keys protected by a passphrase.
//! Each artifact gets an armored detached signature, `<artifact>.asc`, that
//! `gpg --verify <artifact>.asc <artifact>` accepts. The artifact is streamed
//! through the hasher on a blocking thread, never loaded whole.

use std::io::BufReader;
use std::path::{Path, PathBuf};

use chrono::{SubsecRound, Utc};
use pgp::crypto::hash::HashAlgorithm;
use pgp::packet::{SignatureConfig, SignatureType, SignatureVersion, Subpacket, SubpacketData};
use pgp::types::{KeyTrait, SecretKeyTrait};
use pgp::{Deserializable, SignedPublicKey, SignedSecretKey, StandaloneSignature};
use rtpack_schema::{SIGNATURE_SUFFIX, SignatureRecord, signature_path_for};
use tracing::debug;

use super::IntegrityError;
use crate::config::SigningCredentials;

/// Parse an armored private key and check that `passphrase` unlocks it.
///
/// The returned key stays encrypted at rest; every signature unlocks it
/// again with the same passphrase.
pub fn unlock_key(armored: &str, passphrase: &str) -> Result<SignedSecretKey, IntegrityError> {
    let (key, _headers) = SignedSecretKey::from_string(armored)
        .map_err(|e| IntegrityError::SigningKey(format!("not an armored private key: {e}")))?;
    let pw = passphrase.to_string();
    key.unlock(move || pw, |_| Ok(()))
        .map_err(|e| IntegrityError::SigningKey(format!("cannot unlock private key: {e}")))?;
    Ok(key)
}

/// Upper-case hex fingerprint of the primary key.
pub fn fingerprint(key: &SignedSecretKey) -> String {
    hex::encode_upper(key.fingerprint())
}

pub fn parse_public_key(armored: &str) -> Result<SignedPublicKey, IntegrityError> {
    let (key, _headers) = SignedPublicKey::from_string(armored)
        .map_err(|e| IntegrityError::PublicKey(e.to_string()))?;
    Ok(key)
}

/// Binary-document signature over the content of `artifact`, armored.
fn detached_signature(
    key: &SignedSecretKey,
    passphrase: String,
    artifact: &Path,
) -> Result<String, IntegrityError> {
    let file = std::fs::File::open(artifact).map_err(IntegrityError::io(artifact))?;

    let hashed = vec![
        Subpacket::regular(SubpacketData::SignatureCreationTime(
            Utc::now().trunc_subsecs(0),
        )),
        Subpacket::regular(SubpacketData::Issuer(key.key_id())),
    ];
    let config = SignatureConfig::new_v4(
        SignatureVersion::V4,
        SignatureType::Binary,
        key.algorithm(),
        HashAlgorithm::SHA2_256,
        hashed,
        Vec::new(),
    );

    let signature = config
        .sign(key, move || passphrase, BufReader::new(file))
        .map_err(|e| IntegrityError::Signature(e.to_string()))?;
    StandaloneSignature::new(signature)
        .to_armored_string(None.into())
        .map_err(|e| IntegrityError::Signature(e.to_string()))
}

/// Sign `artifact`, writing `<artifact>.asc`.
///
/// The key is unlocked before the artifact is touched; a bad key or
/// passphrase leaves no signature file behind.
pub async fn sign(
    artifact: &Path,
    credentials: &SigningCredentials,
) -> Result<SignatureRecord, IntegrityError> {
    let key = unlock_key(&credentials.armored_key, &credentials.passphrase)?;

    let path = artifact.to_path_buf();
    let passphrase = credentials.passphrase.clone();
    let armored = tokio::task::spawn_blocking(move || detached_signature(&key, passphrase, &path))
        .await
        .map_err(|e| IntegrityError::Signature(format!("signing task failed: {e}")))??;

    let signature_path = signature_path_for(artifact);
    tokio::fs::write(&signature_path, &armored)
        .await
        .map_err(IntegrityError::io(&signature_path))?;

    debug!(artifact = %artifact.display(), "signed");
    Ok(SignatureRecord {
        artifact: artifact.to_path_buf(),
        signature_path,
        signature: armored,
    })
}

/// Check the detached signature of `artifact` against the primary key of
/// `key`.
pub async fn verify(
    artifact: &Path,
    signature_path: &Path,
    key: &SignedPublicKey,
) -> Result<(), IntegrityError> {
    let bad = |reason: String| IntegrityError::BadSignature {
        path: artifact.to_path_buf(),
        reason,
    };

    let armored = tokio::fs::read_to_string(signature_path)
        .await
        .map_err(IntegrityError::io(signature_path))?;
    let (signature, _headers) = StandaloneSignature::from_string(&armored)
        .map_err(|e| bad(format!("not an armored signature: {e}")))?;

    let content = tokio::fs::read(artifact)
        .await
        .map_err(IntegrityError::io(artifact))?;
    signature
        .verify(key, &content)
        .map_err(|e| bad(e.to_string()))
}

/// Sign every path concurrently.
///
/// Each task unlocks its own copy of the key. Results come back in input
/// order once every task has finished.
pub async fn sign_all(
    paths: Vec<PathBuf>,
    credentials: &SigningCredentials,
) -> Vec<(PathBuf, Result<SignatureRecord, IntegrityError>)> {
    let mut set = tokio::task::JoinSet::new();

    for (index, path) in paths.iter().cloned().enumerate() {
        let credentials = credentials.clone();
        set.spawn(async move { (index, sign(&path, &credentials).await) });
    }

    let mut results: Vec<Option<Result<SignatureRecord, IntegrityError>>> =
        paths.iter().map(|_| None).collect();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((index, result)) => results[index] = Some(result),
            Err(e) => debug!("signing task failed to join: {e}"),
        }
    }

    paths
        .into_iter()
        .zip(results)
        .map(|(path, result)| {
            let result = result.unwrap_or_else(|| {
                Err(IntegrityError::Signature(format!(
                    "signing task for {} did not complete",
                    path.display()
                )))
            });
            (path, result)
        })
        .collect()
}

/// Files in `dir` matching any of `patterns`, sorted and without signatures.
pub fn find_signable(dir: &Path, patterns: &[String]) -> Result<Vec<PathBuf>, IntegrityError> {
    let base = glob::Pattern::escape(&dir.to_string_lossy());
    let mut found = Vec::new();
    for pattern in patterns {
        let full = format!("{base}/{pattern}");
        let entries = glob::glob(&full).map_err(|e| IntegrityError::Pattern {
            pattern: pattern.clone(),
            reason: e.to_string(),
        })?;
        for entry in entries.flatten() {
            let is_signature = entry
                .file_name()
                .is_some_and(|n| n.to_string_lossy().ends_with(SIGNATURE_SUFFIX));
            if entry.is_file() && !is_signature {
                found.push(entry);
            }
        }
    }
    found.sort();
    found.dedup();
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIVATE_KEY: &str = include_str!("../../tests/fixtures/signing-key.asc");
    const PUBLIC_KEY: &str = include_str!("../../tests/fixtures/signing-key.pub.asc");
    const PASSPHRASE: &str = "correct-horse";

    fn credentials(passphrase: &str) -> SigningCredentials {
        SigningCredentials {
            armored_key: PRIVATE_KEY.to_string(),
            passphrase: passphrase.to_string(),
        }
    }

    #[tokio::test]
    async fn sign_then_verify() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("ext-linux-x64-1.0.0.vsix");
        std::fs::write(&artifact, vec![42u8; 200_000]).unwrap();

        let record = sign(&artifact, &credentials(PASSPHRASE)).await.unwrap();
        assert_eq!(
            record.signature_path,
            dir.path().join("ext-linux-x64-1.0.0.vsix.asc")
        );
        let written = std::fs::read_to_string(&record.signature_path).unwrap();
        assert_eq!(written, record.signature);
        assert!(written.starts_with("-----BEGIN PGP SIGNATURE-----"));

        let public = parse_public_key(PUBLIC_KEY).unwrap();
        verify(&artifact, &record.signature_path, &public).await.unwrap();

        std::fs::write(&artifact, b"tampered").unwrap();
        let err = verify(&artifact, &record.signature_path, &public)
            .await
            .unwrap_err();
        assert!(matches!(err, IntegrityError::BadSignature { .. }));
    }

    #[tokio::test]
    async fn accepts_signature_made_by_gpg() {
        let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
        let public = parse_public_key(PUBLIC_KEY).unwrap();

        verify(
            &fixtures.join("signed-by-gpg.txt"),
            &fixtures.join("signed-by-gpg.txt.asc"),
            &public,
        )
        .await
        .unwrap();
    }

    #[test]
    fn fingerprint_matches_key() {
        let key = unlock_key(PRIVATE_KEY, PASSPHRASE).unwrap();
        assert_eq!(fingerprint(&key), "E274399239F48CBFC368A489C6AFDA87FCFFC326");
    }

    #[tokio::test]
    async fn wrong_passphrase_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("ext-1.0.0.vsix");
        std::fs::write(&artifact, b"package").unwrap();

        let err = sign(&artifact, &credentials("wrong")).await.unwrap_err();

        assert!(matches!(err, IntegrityError::SigningKey(_)));
        assert!(!signature_path_for(&artifact).exists());
    }

    #[test]
    fn public_key_is_not_a_private_key() {
        assert!(matches!(
            unlock_key(PUBLIC_KEY, PASSPHRASE),
            Err(IntegrityError::SigningKey(_))
        ));
    }

    #[tokio::test]
    async fn unreadable_artifact_is_not_a_key_error() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("missing.vsix");

        let err = sign(&artifact, &credentials(PASSPHRASE)).await.unwrap_err();

        assert!(matches!(err, IntegrityError::Io { .. }), "{err:?}");
        assert!(!signature_path_for(&artifact).exists());
    }

    #[tokio::test]
    async fn sign_all_reports_each_file() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a-1.0.0.vsix", "b-1.0.0.vsix", "a-1.0.0-cyclonedx.json"] {
            std::fs::write(dir.path().join(name), name).unwrap();
        }
        let paths = find_signable(
            dir.path(),
            &["*.vsix".to_string(), "*-cyclonedx.json".to_string()],
        )
        .unwrap();
        assert_eq!(paths.len(), 3);

        let results = sign_all(paths.clone(), &credentials(PASSPHRASE)).await;

        assert_eq!(results.len(), 3);
        for ((path, result), expected) in results.iter().zip(&paths) {
            assert_eq!(path, expected);
            assert!(result.is_ok());
            assert!(signature_path_for(path).exists());
        }

        // signatures are never picked up as signable
        let again = find_signable(dir.path(), &["*".to_string()]).unwrap();
        assert_eq!(again.len(), 3);
    }

    #[test]
    fn bad_public_key_is_rejected() {
        assert!(matches!(
            parse_public_key("AAAA"),
            Err(IntegrityError::PublicKey(_))
        ));
    }
}
