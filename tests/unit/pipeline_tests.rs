//! End-to-end pipeline test: download, verify, install, relaunch intent.
//!
//! The archive travels over a local HTTP responder and is hash-verified;
//! installation runs against a scripted tool runner whose "extraction"
//! reveals a prepared payload directory, so the bundle locate/copy/relaunch
//! path runs against real files.

use std::path::Path;
use std::time::Duration;

use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use airlift::config::UpdateConfig;
use airlift::download::{DownloadOptions, Downloader};
use airlift::install::{InstallOutcome, Installer};
use airlift::process::fake::FakeToolRunner;
use airlift::verify::ChecksumVerifier;

fn make_bundle(dir: &Path, name: &str, marker: &[u8]) -> std::path::PathBuf {
    let bundle = dir.join(name);
    std::fs::create_dir_all(bundle.join("Contents")).expect("create bundle dirs");
    std::fs::write(bundle.join("Contents").join("Info.plist"), marker).expect("write marker");
    bundle
}

async fn serve(body: Vec<u8>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else { break };
            let body = body.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf).await;
                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                let _ = stream.write_all(head.as_bytes()).await;
                let _ = stream.write_all(&body).await;
                let _ = stream.shutdown().await;
            });
        }
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn test_full_update_pipeline_installs_new_bundle() {
    crate::init_test_logging();
    // The wire bytes only need to hash correctly; the scripted runner
    // supplies the archive's "contents" from the payload directory.
    let archive_bytes = b"zip archive bytes".to_vec();
    let expected_hash = ChecksumVerifier::digest(&archive_bytes);
    let base = serve(archive_bytes).await;

    let config = UpdateConfig::new("com.test.app", "ak_test", "sk_test")
        .with_relaunch_delay(Duration::from_millis(10));

    let downloader = Downloader::new(&config).expect("build downloader");
    let archive = downloader
        .download(
            &format!("{base}/releases/latest"),
            DownloadOptions::new()
                .with_expected_hash(expected_hash)
                .with_filename_hint("Update.zip"),
        )
        .await
        .expect("download succeeds");
    assert_eq!(archive.file_name().and_then(|n| n.to_str()), Some("Update.zip"));

    let install_root = TempDir::new().expect("install root");
    let running = make_bundle(install_root.path(), "MyApp.app", b"version 1.0.0");

    let payload = TempDir::new().expect("payload dir");
    make_bundle(payload.path(), "MyApp.app", b"version 2.0.0");

    let runner = FakeToolRunner::new().with_payload(payload.path());
    let mut installer = Installer::with_runner(config, runner, running.clone());

    let outcome = installer.install(&archive).await.expect("install succeeds");
    match outcome {
        InstallOutcome::Installed { destination } => {
            assert_eq!(destination, running);
            let marker = std::fs::read(destination.join("Contents").join("Info.plist"))
                .expect("read installed marker");
            assert_eq!(marker, b"version 2.0.0");
        }
        InstallOutcome::ManualFallback { .. } => panic!("expected a direct installation"),
    }

    std::fs::remove_dir_all(archive.parent().expect("session dir")).expect("cleanup");
}
