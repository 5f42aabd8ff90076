//! Airlift - client-side auto-update engine for desktop applications
//!
//! Airlift embeds in a desktop application and drives its update cycle end
//! to end: ask an update service whether a newer build exists, download and
//! verify the release bundle, swap it into place (escalating privileges when
//! the install location demands it), and relaunch into the new version.
//!
//! # Architecture Overview
//!
//! The engine is a pipeline of small, independently usable pieces:
//! - Requests to the update service are HMAC-signed with a per-app secret
//! - Downloads stream to a private temp directory and are SHA-256 verified
//! - Installation walks a strategy ladder: direct copy, then privileged
//!   copy, then staging the bundle somewhere writable for the user to move
//!   by hand
//! - External tools (`hdiutil`, `ditto`, `osascript`, ...) sit behind the
//!   [`process::ToolRunner`] trait so the whole installer is testable
//!   without touching the real system
//!
//! # Core Modules
//!
//! ## Update Pipeline
//! - [`check`] - Periodic background checks and semver comparison
//! - [`download`] - Streaming download with progress and cancellation
//! - [`verify`] - SHA-256 checksum computation and comparison
//! - [`install`] - Multi-strategy installation state machine and relaunch
//!
//! ## Service Integration
//! - [`api`] - Wire types for the update service's JSON responses
//! - [`signing`] - Canonical request strings and HMAC-SHA256 signatures
//!
//! ## Supporting Modules
//! - [`bundle`] - Locating application bundles inside extracted packages
//! - [`config`] - Per-application engine configuration
//! - [`core`] - Error taxonomy shared by every stage
//! - [`process`] - External tool invocation and the [`process::ToolRunner`] seam
//! - [`utils`] - Filesystem helpers (scoped temp dirs, recursive copy)
//!
//! # Example
//!
//! ```no_run
//! use airlift::config::UpdateConfig;
//! use airlift::download::{DownloadOptions, Downloader};
//! use airlift::install::Installer;
//!
//! # async fn run() -> airlift::core::Result<()> {
//! let config = UpdateConfig::new("com.example.app", "ak_live_key", "sk_live_secret");
//!
//! let downloader = Downloader::new(&config)?;
//! let archive = downloader
//!     .download(
//!         "https://releases.example.com/app-2.0.0.dmg",
//!         DownloadOptions::new().with_expected_hash("…"),
//!     )
//!     .await?;
//!
//! let mut installer = Installer::new(config, std::env::current_exe()?);
//! installer.install(&archive).await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod bundle;
pub mod check;
pub mod config;
pub mod core;
pub mod download;
pub mod install;
pub mod process;
pub mod signing;
pub mod utils;
pub mod verify;

pub use api::UpdateDescriptor;
pub use config::UpdateConfig;
pub use core::{Result, UpdateError};
pub use download::{DownloadOptions, Downloader};
pub use install::{InstallOutcome, InstallPhase, Installer};
