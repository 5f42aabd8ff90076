//! Content-hash verification for downloaded update packages.
//!
//! SHA-256 digests confirm that downloaded bytes were neither corrupted in
//! transit nor tampered with. Digests are always 64 lowercase hex characters;
//! comparison against an expected value is case-insensitive because servers
//! publish checksums in either case.
//!
//! These helpers are pure apart from reading their input: file read errors
//! propagate unchanged as I/O errors rather than being wrapped, since there
//! is nothing update-specific about a missing file at this layer.

use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncReadExt;
use tracing::debug;

/// Read size for streaming file digests. Update packages can run to
/// hundreds of megabytes, so files are hashed incrementally rather than
/// loaded whole.
const DIGEST_BUF_SIZE: usize = 64 * 1024;

/// SHA-256 verifier for downloaded content.
pub struct ChecksumVerifier;

impl ChecksumVerifier {
    /// Compute the SHA-256 digest of a byte slice, hex-encoded lowercase.
    #[must_use]
    pub fn digest(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        hex::encode(hasher.finalize())
    }

    /// Compute the SHA-256 digest of a file's contents.
    ///
    /// # Errors
    ///
    /// Any error reading the file is returned as-is.
    pub async fn digest_file(path: &Path) -> std::io::Result<String> {
        debug!("Computing SHA-256 digest for {}", path.display());
        let mut file = fs::File::open(path).await?;
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; DIGEST_BUF_SIZE];
        loop {
            let read = file.read(&mut buf).await?;
            if read == 0 {
                break;
            }
            hasher.update(&buf[..read]);
        }
        Ok(hex::encode(hasher.finalize()))
    }

    /// Check a byte slice against an expected hex digest, case-insensitively.
    #[must_use]
    pub fn verify(bytes: &[u8], expected: &str) -> bool {
        Self::digest(bytes).eq_ignore_ascii_case(expected)
    }

    /// Check a file against an expected hex digest, case-insensitively.
    ///
    /// # Errors
    ///
    /// Any error reading the file is returned as-is.
    pub async fn verify_file(path: &Path, expected: &str) -> std::io::Result<bool> {
        let actual = Self::digest_file(path).await?;
        let matches = actual.eq_ignore_ascii_case(expected);
        if !matches {
            debug!(
                "Digest mismatch for {}: expected {expected}, got {actual}",
                path.display()
            );
        }
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_digest_golden_vector() {
        // Known SHA-256 of "Hello, World!"
        assert_eq!(
            ChecksumVerifier::digest(b"Hello, World!"),
            "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f"
        );
    }

    #[test]
    fn test_digest_shape_and_determinism() {
        let first = ChecksumVerifier::digest(b"some update payload");
        let second = ChecksumVerifier::digest(b"some update payload");
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(first, ChecksumVerifier::digest(b"some other payload"));
    }

    #[test]
    fn test_verify_case_insensitive() {
        let digest = ChecksumVerifier::digest(b"Test content");
        assert!(ChecksumVerifier::verify(b"Test content", &digest));
        assert!(ChecksumVerifier::verify(b"Test content", &digest.to_uppercase()));
    }

    #[test]
    fn test_verify_rejects_zero_digest() {
        let zeros = "0".repeat(64);
        assert!(!ChecksumVerifier::verify(b"Test content", &zeros));
    }

    #[tokio::test]
    async fn test_verify_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"archive bytes").unwrap();

        let digest = ChecksumVerifier::digest_file(temp_file.path()).await.unwrap();
        assert!(ChecksumVerifier::verify_file(temp_file.path(), &digest).await.unwrap());
        assert!(
            !ChecksumVerifier::verify_file(temp_file.path(), &"f".repeat(64)).await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_digest_file_streams_across_buffer_boundaries() {
        // Larger than one read buffer, so multiple chunks feed the hasher.
        let data: Vec<u8> = (0..3 * DIGEST_BUF_SIZE + 17).map(|i| (i % 251) as u8).collect();
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(&data).unwrap();

        assert_eq!(
            ChecksumVerifier::digest_file(temp_file.path()).await.unwrap(),
            ChecksumVerifier::digest(&data)
        );
    }

    #[tokio::test]
    async fn test_digest_file_io_error_passes_through() {
        let err = ChecksumVerifier::digest_file(Path::new("/nonexistent/update.zip"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
