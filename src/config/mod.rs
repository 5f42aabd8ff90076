//! Explicit configuration for the update engine.
//!
//! [`UpdateConfig`] is a plain value handed to each component at construction.
//! There is deliberately no process-wide singleton or ambient global state:
//! a host application builds one configuration, keeps it wherever it keeps
//! its own state, and passes it (or a clone) into the [`Downloader`],
//! [`Installer`], and check scheduler it creates.
//!
//! [`Downloader`]: crate::download::Downloader
//! [`Installer`]: crate::install::Installer
//!
//! # Examples
//!
//! ```rust
//! use airlift::config::UpdateConfig;
//! use std::time::Duration;
//!
//! let config = UpdateConfig::new("com.example.notes", "ak_live_123", "sk_live_456")
//!     .with_transfer_timeout(Duration::from_secs(600));
//!
//! assert!(config.validate().is_ok());
//! assert_eq!(config.bundle_extension, "app");
//! ```

use std::path::PathBuf;
use std::time::Duration;

use crate::core::{Result, UpdateError};

/// Default per-request timeout (connection establishment and headers).
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default overall transfer timeout for a full download.
const DEFAULT_TRANSFER_TIMEOUT: Duration = Duration::from_secs(300);

/// Default pause between launching the new bundle and terminating ourselves,
/// giving the new process time to start.
const DEFAULT_RELAUNCH_DELAY: Duration = Duration::from_secs(1);

/// Configuration for one logical update session.
///
/// Required fields are the application identity (`app_id`), the public
/// application key sent as a request header (`app_key`), and the shared
/// secret used to sign requests (`signing_secret`). Everything else has a
/// sensible default and a `with_*` builder method.
#[derive(Debug, Clone)]
pub struct UpdateConfig {
    /// Application identifier known to the update server (e.g. a bundle id).
    pub app_id: String,
    /// Public application key, sent in the `X-App-Key` header.
    pub app_key: String,
    /// Shared secret used as the HMAC key for request signing.
    pub signing_secret: String,
    /// File extension that identifies an installable bundle (default `app`).
    pub bundle_extension: String,
    /// Per-request timeout applied to connection setup and response headers.
    pub request_timeout: Duration,
    /// Overall timeout for a complete download transfer.
    pub transfer_timeout: Duration,
    /// Delay between launching the new bundle and terminating this process.
    pub relaunch_delay: Duration,
    /// Standard system applications directory. Defaults to `/Applications`
    /// on macOS and the user's home directory elsewhere.
    pub applications_dir: PathBuf,
    /// Ordered preference list of locations for the manual installation
    /// fallback. Defaults to desktop, then downloads, then the OS temp dir.
    pub fallback_dirs: Vec<PathBuf>,
}

impl UpdateConfig {
    /// Build a configuration from the three required fields, with defaults
    /// for everything else.
    pub fn new(
        app_id: impl Into<String>,
        app_key: impl Into<String>,
        signing_secret: impl Into<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            app_key: app_key.into(),
            signing_secret: signing_secret.into(),
            bundle_extension: "app".to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            transfer_timeout: DEFAULT_TRANSFER_TIMEOUT,
            relaunch_delay: DEFAULT_RELAUNCH_DELAY,
            applications_dir: default_applications_dir(),
            fallback_dirs: default_fallback_dirs(),
        }
    }

    /// Override the bundle extension (without the leading dot).
    #[must_use]
    pub fn with_bundle_extension(mut self, extension: impl Into<String>) -> Self {
        self.bundle_extension = extension.into();
        self
    }

    /// Override the per-request timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Override the overall transfer timeout.
    #[must_use]
    pub const fn with_transfer_timeout(mut self, timeout: Duration) -> Self {
        self.transfer_timeout = timeout;
        self
    }

    /// Override the pre-termination relaunch delay.
    #[must_use]
    pub const fn with_relaunch_delay(mut self, delay: Duration) -> Self {
        self.relaunch_delay = delay;
        self
    }

    /// Override the standard applications directory.
    #[must_use]
    pub fn with_applications_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.applications_dir = dir.into();
        self
    }

    /// Override the manual-fallback location preference list.
    #[must_use]
    pub fn with_fallback_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.fallback_dirs = dirs;
        self
    }

    /// Check that the required fields are present.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::NotConfigured`] if the app id, app key, or
    /// signing secret is empty.
    pub fn validate(&self) -> Result<()> {
        if self.app_id.is_empty() || self.app_key.is_empty() || self.signing_secret.is_empty() {
            return Err(UpdateError::NotConfigured);
        }
        Ok(())
    }
}

/// Platform default for the standard applications directory.
fn default_applications_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        PathBuf::from("/Applications")
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::home_dir().unwrap_or_else(std::env::temp_dir)
    }
}

/// Platform default for the manual-fallback preference list: desktop, then
/// downloads, then the OS temp dir. Entries that cannot be resolved on this
/// system are simply absent.
fn default_fallback_dirs() -> Vec<PathBuf> {
    let mut dirs_list = Vec::new();
    if let Some(desktop) = dirs::desktop_dir() {
        dirs_list.push(desktop);
    }
    if let Some(downloads) = dirs::download_dir() {
        dirs_list.push(downloads);
    }
    dirs_list.push(std::env::temp_dir());
    dirs_list
}
