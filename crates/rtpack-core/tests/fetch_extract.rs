//! Fetch a served tar.gz and stream-extract it, then compare the tree with
//! what went into the archive.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use mockito::Server;
use reqwest::Client;
use rtpack_core::NullReporter;
use rtpack_core::io::{ExtractRequest, FetchRequest};
use rtpack_schema::PlatformTarget;
use tokio_util::sync::CancellationToken;

fn build_tree(root: &Path) {
    let files: [(&str, Vec<u8>); 4] = [
        ("jre/release", b"JAVA_VERSION=\"17.0.1\"\n".to_vec()),
        ("jre/bin/java", vec![0x7f; 70_000]),
        ("jre/lib/modules", (0..=255u8).cycle().take(300_000).collect()),
        ("jre/conf/security/java.security", b"# empty\n".to_vec()),
    ];
    for (rel, data) in files {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, data).unwrap();
    }
}

fn tar_gz(root: &Path) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    builder.append_dir_all("jre", root.join("jre")).unwrap();
    let tar = builder.into_inner().unwrap();
    let mut enc = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::fast());
    enc.write_all(&tar).unwrap();
    enc.finish().unwrap()
}

/// Relative file path -> size for every regular file under `root`.
fn snapshot(root: &Path) -> BTreeMap<String, u64> {
    walkdir::WalkDir::new(root)
        .into_iter()
        .map(Result::unwrap)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e.path().strip_prefix(root).unwrap().to_string_lossy().into_owned();
            (rel, e.metadata().unwrap().len())
        })
        .collect()
}

#[tokio::test]
async fn fetched_archive_extracts_to_identical_tree() {
    let source = tempfile::tempdir().unwrap();
    build_tree(source.path());
    let body = tar_gz(source.path());

    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/jres/17/downloads/20211012_0921/bundle-17-linux-x86_64.tar.gz")
        .with_status(200)
        .with_body(&body)
        .create_async()
        .await;

    let scratch = tempfile::tempdir().unwrap();
    let archive = scratch.path().join("bundle-17-linux-x86_64.tar.gz");
    let tree = scratch.path().join("17-linux-x86_64");
    let url = format!(
        "{}/jres/17/downloads/latest/../20211012_0921/bundle-17-linux-x86_64.tar.gz",
        server.url()
    );
    let client = Client::new();
    let cancel = CancellationToken::new();

    let bytes = FetchRequest::new(
        &client,
        &url,
        &archive,
        PlatformTarget::LinuxX64,
        &NullReporter,
        &cancel,
    )
    .execute()
    .await
    .unwrap();
    assert_eq!(bytes, body.len() as u64);
    mock.assert_async().await;

    let entries = ExtractRequest::new(
        &archive,
        &tree,
        PlatformTarget::LinuxX64,
        &NullReporter,
        &cancel,
    )
    .execute()
    .await
    .unwrap();

    assert!(entries >= 4);
    assert!(!archive.exists(), "archive is removed after extraction");
    assert_eq!(snapshot(&tree), snapshot(source.path()));
}
