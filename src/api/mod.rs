//! Wire types for the update service protocol.
//!
//! The transport client itself (URL construction, sending requests) belongs
//! to the host application; this module defines the contract it must speak.
//! Response bodies are camelCase JSON. Authentication headers and the signed
//! canonical string live in [`crate::signing`]; server error classification
//! lives in [`UpdateError::from_server_code`].
//!
//! [`UpdateError::from_server_code`]: crate::core::UpdateError::from_server_code

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::UpdateError;

/// Metadata describing one available update.
///
/// Produced by decoding a server response, consumed by the downloader and
/// surfaced to the caller. Immutable once constructed; equality is structural
/// over all fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDescriptor {
    /// Semantic version string of the update.
    pub version: String,
    /// Release notes text, possibly empty.
    #[serde(default)]
    pub release_notes: String,
    /// Minimum platform version required to run this update, when declared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_platform_version: Option<String>,
    /// Package size in bytes, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    /// Expected hex-encoded SHA-256 of the package, when published.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    /// Relative resource path to download the package from.
    pub download_path: String,
}

/// Response body of the "check for update" endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCheckResponse {
    /// Whether a newer version is available.
    pub available: bool,
    /// The version the client reported.
    pub current_version: String,
    /// The newest version the server knows about.
    pub latest_version: String,
    /// Release notes for the latest version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_notes: Option<String>,
    /// Minimum platform version for the latest version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_platform_version: Option<String>,
    /// Package size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    /// Expected hex-encoded SHA-256 of the package.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    /// Where to download the package. Required when `available` is true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

impl UpdateCheckResponse {
    /// Convert an available-update response into an [`UpdateDescriptor`].
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::InvalidResponse`] if the server claimed an
    /// update was available but omitted the download URL, or if no update is
    /// available at all.
    pub fn into_descriptor(self) -> Result<UpdateDescriptor, UpdateError> {
        if !self.available {
            return Err(UpdateError::InvalidResponse {
                status: None,
                message: "no update available".to_string(),
            });
        }
        let download_path = self.download_url.ok_or_else(|| UpdateError::InvalidResponse {
            status: None,
            message: "update marked available but no download URL provided".to_string(),
        })?;
        Ok(UpdateDescriptor {
            version: self.latest_version,
            release_notes: self.release_notes.unwrap_or_default(),
            minimum_platform_version: self.minimum_platform_version,
            file_size: self.file_size,
            content_hash: self.content_hash,
            download_path,
        })
    }
}

/// Response body of the "get download URL" endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadUrlResponse {
    /// Pre-authorized URL to fetch the package from.
    pub download_url: String,
    /// When the URL stops being valid.
    pub expires_at: DateTime<Utc>,
    /// Expected hex-encoded SHA-256 of the package.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    /// Package size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    /// Suggested filename for the downloaded package.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// Error body the server returns alongside non-success statuses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerErrorBody {
    /// Machine-readable error code (e.g. `version_not_found`).
    pub error_code: String,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
}

impl ServerErrorBody {
    /// Map this body to the structured error taxonomy.
    #[must_use]
    pub fn into_error(self) -> UpdateError {
        UpdateError::from_server_code(&self.error_code, &self.message)
    }
}
