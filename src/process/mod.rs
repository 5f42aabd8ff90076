//! External-tool invocation for the installer.
//!
//! Mounting disk images, expanding archives, privileged shell commands,
//! launching the new bundle, and trashing the old one are all delegated to
//! platform tools. The [`ToolRunner`] trait is the seam: the installer only
//! ever talks to this capability, so tests substitute a
//! [`fake::FakeToolRunner`] and the production path uses
//! [`SystemToolRunner`], which shells out through [`command::ToolCommand`]
//! with a bounded timeout and forced termination on expiry.
//!
//! User cancellation of the elevation prompt is reported as its own
//! [`ToolError::Cancelled`] variant rather than a generic failure, because
//! the installer's strategy machine treats the two very differently.

pub mod command;
#[cfg(any(test, feature = "test-utils"))]
pub mod fake;

use std::path::Path;

use thiserror::Error;
use tracing::debug;

use command::ToolCommand;

/// Failure from an external tool invocation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// The user declined an interactive prompt (elevation dialog).
    #[error("cancelled by user")]
    Cancelled,

    /// The tool failed for any other reason.
    #[error("{reason}")]
    Failed {
        /// Human-readable failure description, typically the tool's stderr.
        reason: String,
    },
}

impl ToolError {
    /// Wrap an arbitrary failure reason.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed { reason: reason.into() }
    }
}

/// External tools the installer depends on, as an injectable capability.
#[allow(async_fn_in_trait)]
pub trait ToolRunner: Send + Sync {
    /// Attach a disk image at the given mount point.
    async fn attach_disk_image(&self, image: &Path, mount_point: &Path) -> Result<(), ToolError>;

    /// Detach a previously attached disk image.
    async fn detach_disk_image(&self, mount_point: &Path) -> Result<(), ToolError>;

    /// Expand a compressed archive into a destination directory.
    async fn expand_archive(&self, archive: &Path, destination: &Path) -> Result<(), ToolError>;

    /// Run a shell command with administrator authority.
    ///
    /// Returns [`ToolError::Cancelled`] when the user dismisses the
    /// credential prompt, distinct from every other failure.
    async fn run_privileged(&self, command: &str) -> Result<(), ToolError>;

    /// Launch an application bundle as a new, independent process instance.
    async fn launch_app(&self, bundle: &Path) -> Result<(), ToolError>;

    /// Generic "open this path" fallback when [`Self::launch_app`] fails.
    async fn open_path(&self, path: &Path) -> Result<(), ToolError>;

    /// Reveal a path in the platform file browser.
    async fn reveal_in_browser(&self, path: &Path) -> Result<(), ToolError>;

    /// Move a path to the recoverable trash.
    async fn move_to_trash(&self, path: &Path) -> Result<(), ToolError>;

    /// Terminate the current process. Does not return in production.
    fn terminate_current(&self);
}

/// [`ToolRunner`] backed by the platform's real tools.
#[derive(Debug, Clone, Default)]
pub struct SystemToolRunner;

impl SystemToolRunner {
    /// Create a new system tool runner.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ToolRunner for SystemToolRunner {
    async fn attach_disk_image(&self, image: &Path, mount_point: &Path) -> Result<(), ToolError> {
        #[cfg(target_os = "macos")]
        {
            ToolCommand::new("hdiutil")
                .args(["attach", &image.display().to_string()])
                .args(["-mountpoint", &mount_point.display().to_string()])
                .args(["-nobrowse", "-noverify"])
                .with_context("attach disk image")
                .execute()
                .await?;
            Ok(())
        }
        #[cfg(not(target_os = "macos"))]
        {
            let _ = (image, mount_point);
            Err(ToolError::failed("disk images are not supported on this platform"))
        }
    }

    async fn detach_disk_image(&self, mount_point: &Path) -> Result<(), ToolError> {
        #[cfg(target_os = "macos")]
        {
            ToolCommand::new("hdiutil")
                .args(["detach", &mount_point.display().to_string(), "-force"])
                .with_context("detach disk image")
                .execute()
                .await?;
            Ok(())
        }
        #[cfg(not(target_os = "macos"))]
        {
            let _ = mount_point;
            Err(ToolError::failed("disk images are not supported on this platform"))
        }
    }

    async fn expand_archive(&self, archive: &Path, destination: &Path) -> Result<(), ToolError> {
        let command = if cfg!(target_os = "macos") {
            ToolCommand::new("ditto").args([
                "-x",
                "-k",
                &archive.display().to_string(),
                &destination.display().to_string(),
            ])
        } else {
            ToolCommand::new("unzip").args([
                "-q",
                &archive.display().to_string(),
                "-d",
                &destination.display().to_string(),
            ])
        };
        command.with_context("expand archive").execute().await?;
        Ok(())
    }

    async fn run_privileged(&self, command: &str) -> Result<(), ToolError> {
        debug!("Running privileged command: {command}");
        let result = if cfg!(target_os = "macos") {
            ToolCommand::new("osascript")
                .args([
                    "-e",
                    &format!(
                        "do shell script \"{}\" with administrator privileges",
                        command.replace('\\', "\\\\").replace('"', "\\\"")
                    ),
                ])
                .with_context("privileged shell command")
                .execute()
                .await
        } else {
            ToolCommand::new("pkexec")
                .args(["sh", "-c", command])
                .with_context("privileged shell command")
                .execute()
                .await
        };

        match result {
            Ok(_) => Ok(()),
            Err(ToolError::Failed { reason }) if is_user_cancelled(&reason) => {
                Err(ToolError::Cancelled)
            }
            Err(err) => Err(err),
        }
    }

    async fn launch_app(&self, bundle: &Path) -> Result<(), ToolError> {
        let command = if cfg!(target_os = "macos") {
            // -n forces a new instance even while the old one is still alive.
            ToolCommand::new("open").args(["-n", &bundle.display().to_string()])
        } else {
            ToolCommand::new("xdg-open").args([&bundle.display().to_string()])
        };
        command.with_context("launch application").execute().await?;
        Ok(())
    }

    async fn open_path(&self, path: &Path) -> Result<(), ToolError> {
        let program = if cfg!(target_os = "macos") { "open" } else { "xdg-open" };
        ToolCommand::new(program)
            .args([&path.display().to_string()])
            .with_context("open path")
            .execute()
            .await?;
        Ok(())
    }

    async fn reveal_in_browser(&self, path: &Path) -> Result<(), ToolError> {
        if cfg!(target_os = "macos") {
            ToolCommand::new("open")
                .args(["-R", &path.display().to_string()])
                .with_context("reveal in file browser")
                .execute()
                .await?;
        } else {
            let parent = path.parent().unwrap_or(path);
            ToolCommand::new("xdg-open")
                .args([&parent.display().to_string()])
                .with_context("reveal in file browser")
                .execute()
                .await?;
        }
        Ok(())
    }

    async fn move_to_trash(&self, path: &Path) -> Result<(), ToolError> {
        if cfg!(target_os = "macos") {
            ToolCommand::new("osascript")
                .args([
                    "-e",
                    &format!(
                        "tell application \"Finder\" to move (POSIX file \"{}\") to trash",
                        path.display()
                    ),
                ])
                .with_context("move to trash")
                .execute()
                .await?;
        } else {
            ToolCommand::new("gio")
                .args(["trash", &path.display().to_string()])
                .with_context("move to trash")
                .execute()
                .await?;
        }
        Ok(())
    }

    fn terminate_current(&self) {
        std::process::exit(0);
    }
}

/// Heuristics for recognizing "user dismissed the credential prompt" in tool
/// output across platforms: AppleScript reports error -128 with "User
/// canceled"; pkexec exits 126 when the dialog is dismissed.
fn is_user_cancelled(reason: &str) -> bool {
    let lower = reason.to_lowercase();
    lower.contains("user canceled")
        || lower.contains("user cancelled")
        || lower.contains("-128")
        || lower.contains("exit code 126")
}
