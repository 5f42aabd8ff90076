//! Download tests against a local HTTP responder.
//!
//! A plain `TcpListener` answering canned HTTP/1.1 responses is enough to
//! exercise status handling, verification, filename resolution, progress,
//! and cancellation without any external service.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use airlift::config::UpdateConfig;
use airlift::core::UpdateError;
use airlift::download::{DownloadOptions, Downloader};
use airlift::verify::ChecksumVerifier;

fn test_config() -> UpdateConfig {
    UpdateConfig::new("com.test.app", "ak_test", "sk_test")
        .with_request_timeout(Duration::from_secs(5))
        .with_transfer_timeout(Duration::from_secs(10))
}

/// Serve every incoming connection with the same canned response and return
/// the base URL. The server task dies with the test runtime.
async fn spawn_server(status: &'static str, body: Vec<u8>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind listener");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else { break };
            let body = body.clone();
            tokio::spawn(async move {
                // One read is enough for the small GET requests these tests send.
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf).await;
                let head = format!(
                    "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
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

/// Serve a response that stalls after the first half of the body, keeping
/// the connection open so a transfer is genuinely in flight.
async fn spawn_stalling_server(body: Vec<u8>) -> String {
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
                let _ = stream.write_all(&body[..body.len() / 2]).await;
                let _ = stream.flush().await;
                // Hold the rest back; the client decides when to give up.
                tokio::time::sleep(Duration::from_secs(30)).await;
            });
        }
    });

    format!("http://{addr}")
}

#[tokio::test]
async fn test_download_verifies_and_returns_file() {
    crate::init_test_logging();
    let body = b"release payload bytes".to_vec();
    let expected = ChecksumVerifier::digest(&body);
    let base = spawn_server("200 OK", body.clone()).await;

    let downloader = Downloader::new(&test_config()).expect("build downloader");
    let path = downloader
        .download(
            &format!("{base}/releases/MyApp-2.0.0.zip"),
            DownloadOptions::new().with_expected_hash(expected),
        )
        .await
        .expect("download succeeds");

    assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("MyApp-2.0.0.zip"));
    assert_eq!(std::fs::read(&path).expect("read downloaded file"), body);

    std::fs::remove_dir_all(path.parent().expect("session dir")).expect("cleanup");
}

#[tokio::test]
async fn test_download_hash_mismatch_is_verification_failure() {
    crate::init_test_logging();
    let base = spawn_server("200 OK", b"tampered bytes".to_vec()).await;

    let downloader = Downloader::new(&test_config()).expect("build downloader");
    let err = downloader
        .download(
            &format!("{base}/releases/MyApp-2.0.0.zip"),
            DownloadOptions::new().with_expected_hash("0".repeat(64)),
        )
        .await
        .expect_err("mismatched hash must fail");

    assert!(matches!(err, UpdateError::VerificationFailed));
}

#[tokio::test]
async fn test_non_success_status_is_a_download_failure_with_status() {
    crate::init_test_logging();
    let base = spawn_server("404 Not Found", b"gone".to_vec()).await;

    let downloader = Downloader::new(&test_config()).expect("build downloader");
    let err = downloader
        .download(&format!("{base}/releases/missing.zip"), DownloadOptions::new())
        .await
        .expect_err("404 must fail");

    match err {
        UpdateError::DownloadFailed { reason } => assert!(reason.contains("404")),
        other => panic!("expected DownloadFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_download_filename_hint_wins_over_url() {
    crate::init_test_logging();
    let base = spawn_server("200 OK", b"data".to_vec()).await;

    let downloader = Downloader::new(&test_config()).expect("build downloader");
    let path = downloader
        .download(
            &format!("{base}/releases/generic.bin"),
            DownloadOptions::new().with_filename_hint("MyApp.dmg"),
        )
        .await
        .expect("download succeeds");

    assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("MyApp.dmg"));

    std::fs::remove_dir_all(path.parent().expect("session dir")).expect("cleanup");
}

#[tokio::test]
async fn test_download_progress_is_monotonic_and_completes() {
    crate::init_test_logging();
    let body = vec![7u8; 64 * 1024];
    let base = spawn_server("200 OK", body).await;

    let fractions = Arc::new(Mutex::new(Vec::new()));
    let observed = fractions.clone();

    let downloader = Downloader::new(&test_config()).expect("build downloader");
    let path = downloader
        .download(
            &format!("{base}/releases/MyApp.zip"),
            DownloadOptions::new().with_progress(Box::new(move |fraction| {
                observed.lock().expect("progress lock").push(fraction);
            })),
        )
        .await
        .expect("download succeeds");

    let fractions = fractions.lock().expect("progress lock");
    assert!(!fractions.is_empty());
    assert!(fractions.windows(2).all(|w| w[0] <= w[1]), "progress went backwards");
    assert!((fractions.last().copied().expect("last fraction") - 1.0).abs() < f64::EPSILON);

    std::fs::remove_dir_all(path.parent().expect("session dir")).expect("cleanup");
}

#[tokio::test]
async fn test_download_respects_pre_cancelled_token() {
    crate::init_test_logging();
    let base = spawn_server("200 OK", b"never delivered to caller".to_vec()).await;

    let token = CancellationToken::new();
    token.cancel();

    let downloader = Downloader::new(&test_config()).expect("build downloader");
    let err = downloader
        .download(
            &format!("{base}/releases/MyApp.zip"),
            DownloadOptions::new().with_cancellation(token),
        )
        .await
        .expect_err("cancelled download must fail");

    match err {
        UpdateError::DownloadFailed { reason } => assert!(reason.contains("cancelled")),
        other => panic!("expected DownloadFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_mid_stream_cancellation_cleans_up_partial_state() {
    crate::init_test_logging();
    let base = spawn_stalling_server(vec![3u8; 32 * 1024]).await;

    // Unique filename so the partial file can be hunted down afterwards even
    // with sibling tests creating their own session directories in parallel.
    let marker = format!("cancel-{}.zip", uuid::Uuid::new_v4());

    let token = CancellationToken::new();
    let cancel = token.clone();

    let downloader = Downloader::new(&test_config()).expect("build downloader");
    let err = downloader
        .download(
            &format!("{base}/releases/stalling.zip"),
            DownloadOptions::new()
                .with_filename_hint(&marker)
                .with_cancellation(token)
                // The first chunk is on disk by the time progress fires, so
                // cancelling here cancels a genuinely in-flight transfer.
                .with_progress(Box::new(move |_| cancel.cancel())),
        )
        .await
        .expect_err("cancelled download must fail");

    assert!(matches!(err, UpdateError::DownloadFailed { ref reason } if reason.contains("cancelled")));

    // The partial file and its session directory must both be gone.
    let leftover = std::fs::read_dir(std::env::temp_dir())
        .expect("read temp dir")
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("airlift_download_"))
        })
        .find(|session| session.join(&marker).exists());
    assert_eq!(leftover, None, "partial download was not cleaned up");
}
