//! Error taxonomy for the update engine.
//!
//! Every failure a caller can observe is one of the [`UpdateError`] variants
//! below. The variants fall into four groups:
//!
//! - **Configuration**: [`UpdateError::NotConfigured`]
//! - **Transport**: [`UpdateError::Network`], [`UpdateError::InvalidResponse`],
//!   [`UpdateError::Signature`], [`UpdateError::ServerError`] and the
//!   server-classified application errors ([`UpdateError::AppNotFound`],
//!   [`UpdateError::AppSuspended`], [`UpdateError::VersionNotFound`],
//!   [`UpdateError::VersionNotApproved`])
//! - **Pipeline**: [`UpdateError::DownloadFailed`],
//!   [`UpdateError::VerificationFailed`], [`UpdateError::InstallationFailed`],
//!   [`UpdateError::InstallationCancelled`]
//! - **Passthrough**: [`UpdateError::Io`], [`UpdateError::Unknown`]
//!
//! User cancellation of the privilege-elevation prompt is deliberately its own
//! variant rather than a reason string inside [`UpdateError::InstallationFailed`],
//! so UI layers can avoid presenting a cancelled install as something that
//! needs troubleshooting.

use thiserror::Error;

/// The error type surfaced by every operation in this crate.
#[derive(Error, Debug)]
pub enum UpdateError {
    /// The engine was used before required configuration (app id, app key,
    /// signing secret) was supplied.
    #[error("update engine is not configured")]
    NotConfigured,

    /// A network-level failure: connection refused, DNS, TLS, timeout.
    #[error("network error: {message}")]
    Network {
        /// Human-readable description of the transport failure.
        message: String,
    },

    /// The server responded, but not with what we expected.
    #[error("invalid response{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    InvalidResponse {
        /// HTTP status code, when one was received.
        status: Option<u16>,
        /// Description of what was wrong with the response.
        message: String,
    },

    /// Request signing failed or the server rejected our signature.
    #[error("request signature error: {message}")]
    Signature {
        /// Description of the signing failure.
        message: String,
    },

    /// The download could not be completed.
    #[error("download failed: {reason}")]
    DownloadFailed {
        /// Why the transfer failed (status, I/O, cancellation).
        reason: String,
    },

    /// The downloaded bytes did not match the expected content hash.
    #[error("downloaded file failed integrity verification")]
    VerificationFailed,

    /// Installation failed and no further strategy applies.
    #[error("installation failed: {reason}")]
    InstallationFailed {
        /// Why the installation failed.
        reason: String,
    },

    /// The user declined the privilege-elevation prompt. Never retried.
    #[error("installation cancelled by user")]
    InstallationCancelled,

    /// Server: the application key does not match any registered app.
    #[error("application not found on update server")]
    AppNotFound,

    /// Server: the application's update feed has been suspended.
    #[error("application is suspended on update server")]
    AppSuspended,

    /// Server: the requested version does not exist.
    #[error("requested version not found on update server")]
    VersionNotFound,

    /// Server: the version exists but has not been approved for release.
    #[error("requested version is not approved for release")]
    VersionNotApproved,

    /// A server-classified error we do not have a dedicated variant for.
    #[error("server error ({code}): {message}")]
    ServerError {
        /// Machine-readable error code from the server.
        code: String,
        /// Human-readable message from the server.
        message: String,
    },

    /// Plain file I/O from pure helpers, passed through unwrapped.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Anything that does not fit the categories above.
    #[error("unknown error: {message}")]
    Unknown {
        /// Description of the failure.
        message: String,
    },
}

impl UpdateError {
    /// Map a server-provided error code to a structured error.
    ///
    /// The update service classifies request failures with a machine-readable
    /// code alongside a message. Recognized codes become dedicated variants;
    /// anything unrecognized is preserved verbatim as
    /// [`UpdateError::ServerError`] so nothing the server said is lost.
    pub fn from_server_code(code: &str, message: &str) -> Self {
        match code {
            "app_not_found" => Self::AppNotFound,
            "app_suspended" => Self::AppSuspended,
            "version_not_found" => Self::VersionNotFound,
            "version_not_approved" => Self::VersionNotApproved,
            "invalid_signature" => Self::Signature {
                message: message.to_string(),
            },
            "timestamp_expired" => Self::Signature {
                message: format!("timestamp expired: {message}"),
            },
            "missing_app_key" => Self::NotConfigured,
            _ => Self::ServerError {
                code: code.to_string(),
                message: message.to_string(),
            },
        }
    }

    /// Whether this error is the user declining the elevation prompt.
    ///
    /// Preserved end-to-end so callers can distinguish "user changed their
    /// mind" from a real failure.
    #[must_use]
    pub const fn is_user_cancelled(&self) -> bool {
        matches!(self, Self::InstallationCancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_code_mapping() {
        assert!(matches!(
            UpdateError::from_server_code("app_not_found", "no such app"),
            UpdateError::AppNotFound
        ));
        assert!(matches!(
            UpdateError::from_server_code("app_suspended", ""),
            UpdateError::AppSuspended
        ));
        assert!(matches!(
            UpdateError::from_server_code("version_not_found", ""),
            UpdateError::VersionNotFound
        ));
        assert!(matches!(
            UpdateError::from_server_code("version_not_approved", ""),
            UpdateError::VersionNotApproved
        ));
        assert!(matches!(
            UpdateError::from_server_code("invalid_signature", "bad sig"),
            UpdateError::Signature { .. }
        ));
        assert!(matches!(
            UpdateError::from_server_code("timestamp_expired", "too old"),
            UpdateError::Signature { .. }
        ));
        assert!(matches!(
            UpdateError::from_server_code("missing_app_key", ""),
            UpdateError::NotConfigured
        ));
    }

    #[test]
    fn test_unrecognized_server_code_preserved_verbatim() {
        let err = UpdateError::from_server_code("quota_exceeded", "too many checks");
        match err {
            UpdateError::ServerError { code, message } => {
                assert_eq!(code, "quota_exceeded");
                assert_eq!(message, "too many checks");
            }
            other => panic!("expected ServerError, got {other:?}"),
        }
    }

    #[test]
    fn test_cancellation_is_distinguishable() {
        assert!(UpdateError::InstallationCancelled.is_user_cancelled());
        assert!(
            !UpdateError::InstallationFailed {
                reason: "copy failed".to_string()
            }
            .is_user_cancelled()
        );
    }

    #[test]
    fn test_invalid_response_display_includes_status() {
        let err = UpdateError::InvalidResponse {
            status: Some(503),
            message: "service unavailable".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("503"));
        assert!(text.contains("service unavailable"));
    }
}
