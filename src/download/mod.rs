//! Streaming download of update packages.
//!
//! Each call to [`Downloader::download`] gets a freshly generated, uniquely
//! named session directory under the OS temp root, so concurrent downloads
//! never collide and a failed transfer can be cleaned up wholesale. The
//! transfer is streamed to disk chunk by chunk; when the server reports a
//! total size, a progress fraction in `[0.0, 1.0]` is delivered to the
//! caller's callback. Callbacks run inline on the download task, one at a
//! time and never after the download's terminal event, so the caller can
//! observe them without synchronization.
//!
//! When an expected content hash is supplied, the finished file is verified
//! before its path is ever returned; on mismatch the partial state is deleted
//! and [`UpdateError::VerificationFailed`] is raised. A caller never receives
//! a path to unverified bytes.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::UpdateConfig;
use crate::core::{Result, UpdateError};
use crate::utils::fs::unique_temp_dir;
use crate::verify::ChecksumVerifier;

/// Fallback filename when neither a hint nor the URL yields one.
const DEFAULT_FILENAME: &str = "update.bin";

/// Progress callback: receives a non-decreasing fraction in `[0.0, 1.0]`.
pub type ProgressFn = Box<dyn Fn(f64) + Send + Sync>;

/// Per-download options.
///
/// The cancellation token supports cooperative cancellation: cancel it from
/// anywhere and the in-flight transfer stops at the next chunk boundary,
/// cleaning up its partial state.
#[derive(Default)]
pub struct DownloadOptions {
    /// Expected hex SHA-256 of the completed file, verified before return.
    pub expected_hash: Option<String>,
    /// Preferred filename for the downloaded file.
    pub filename_hint: Option<String>,
    /// Progress observer, invoked with a fraction when total size is known.
    pub progress: Option<ProgressFn>,
    /// Cooperative cancellation handle.
    pub cancellation: CancellationToken,
}

impl DownloadOptions {
    /// Options with no hash check, no hint, no progress observer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Expect the completed file to hash to `hash`.
    #[must_use]
    pub fn with_expected_hash(mut self, hash: impl Into<String>) -> Self {
        self.expected_hash = Some(hash.into());
        self
    }

    /// Prefer `filename` for the downloaded file.
    #[must_use]
    pub fn with_filename_hint(mut self, filename: impl Into<String>) -> Self {
        self.filename_hint = Some(filename.into());
        self
    }

    /// Observe progress fractions.
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Use `token` for cooperative cancellation.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }
}

/// Streaming downloader with integrity verification.
pub struct Downloader {
    client: reqwest::Client,
    transfer_timeout: Duration,
}

impl Downloader {
    /// Build a downloader from the session configuration.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Network`] if the HTTP client cannot be built.
    pub fn new(config: &UpdateConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.request_timeout)
            .build()
            .map_err(|e| UpdateError::Network { message: format!("failed to build HTTP client: {e}") })?;
        Ok(Self { client, transfer_timeout: config.transfer_timeout })
    }

    /// Download `url` into a private session directory and return the file path.
    ///
    /// # Errors
    ///
    /// - [`UpdateError::VerificationFailed`] when an expected hash was given
    ///   and the bytes do not match; the partial file is deleted first.
    /// - [`UpdateError::DownloadFailed`] for any non-2xx status (the status
    ///   code is carried in the reason), for transport or I/O failures, and
    ///   for cooperative cancellation.
    pub async fn download(&self, url: &str, options: DownloadOptions) -> Result<PathBuf> {
        let session_dir = unique_temp_dir("download")
            .map_err(|e| UpdateError::DownloadFailed { reason: e.to_string() })?;

        match self.download_into(url, &session_dir, options).await {
            Ok(path) => Ok(path),
            Err(err) => {
                // The session dir is private to this call; remove it wholesale.
                if let Err(cleanup_err) = std::fs::remove_dir_all(&session_dir) {
                    warn!("Failed to clean up download session dir: {cleanup_err}");
                }
                Err(err)
            }
        }
    }

    async fn download_into(
        &self,
        url: &str,
        session_dir: &Path,
        options: DownloadOptions,
    ) -> Result<PathBuf> {
        let filename = resolve_filename(url, options.filename_hint.as_deref())?;
        let target = session_dir.join(&filename);
        debug!("Downloading {url} -> {}", target.display());

        let mut response = self
            .client
            .get(url)
            .timeout(self.transfer_timeout)
            .send()
            .await
            .map_err(|e| UpdateError::DownloadFailed { reason: format!("request failed: {e}") })?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpdateError::DownloadFailed {
                reason: format!("server returned HTTP {status}"),
            });
        }

        let total_size = response.content_length();
        let mut file = tokio::fs::File::create(&target)
            .await
            .map_err(|e| UpdateError::DownloadFailed { reason: format!("failed to create file: {e}") })?;

        let mut written: u64 = 0;
        let mut last_fraction = 0.0_f64;
        loop {
            let chunk = tokio::select! {
                // Cancellation always wins over a ready chunk.
                biased;
                () = options.cancellation.cancelled() => {
                    info!("Download of {url} cancelled");
                    return Err(UpdateError::DownloadFailed { reason: "cancelled".to_string() });
                }
                chunk = response.chunk() => chunk
                    .map_err(|e| UpdateError::DownloadFailed { reason: format!("transfer failed: {e}") })?,
            };

            let Some(bytes) = chunk else { break };
            file.write_all(&bytes)
                .await
                .map_err(|e| UpdateError::DownloadFailed { reason: format!("write failed: {e}") })?;
            written += bytes.len() as u64;

            if let (Some(total), Some(progress)) = (total_size, options.progress.as_ref()) {
                if total > 0 {
                    // Clamp so a lying Content-Length can't push us past 1.0.
                    let fraction = (written as f64 / total as f64).min(1.0);
                    if fraction >= last_fraction {
                        progress(fraction);
                        last_fraction = fraction;
                    }
                }
            }
        }

        file.flush()
            .await
            .map_err(|e| UpdateError::DownloadFailed { reason: format!("flush failed: {e}") })?;
        drop(file);

        if let Some(ref expected) = options.expected_hash {
            let matches = ChecksumVerifier::verify_file(&target, expected)
                .await
                .map_err(|e| UpdateError::DownloadFailed { reason: format!("failed to hash download: {e}") })?;
            if !matches {
                warn!("Downloaded file failed verification, discarding");
                return Err(UpdateError::VerificationFailed);
            }
            debug!("Download verified against expected hash");
        }

        info!("Downloaded {written} bytes to {}", target.display());
        Ok(target)
    }
}

/// Resolve the local filename: explicit hint, then the last path segment of
/// the URL, then a generic default.
fn resolve_filename(url: &str, hint: Option<&str>) -> Result<String> {
    if let Some(hint) = hint {
        if !hint.is_empty() {
            return Ok(hint.to_string());
        }
    }

    let parsed = reqwest::Url::parse(url)
        .map_err(|e| UpdateError::DownloadFailed { reason: format!("invalid URL {url}: {e}") })?;
    let segment = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|s| !s.is_empty())
        .map(ToString::to_string);

    Ok(segment.unwrap_or_else(|| DEFAULT_FILENAME.to_string()))
}
