//! Installation of a downloaded update package.
//!
//! The installer owns the riskiest part of the pipeline: replacing the
//! running application with new bytes without ever leaving the user with a
//! broken install. It proceeds through a fixed sequence of phases:
//!
//! ```text
//! Idle -> Extracting -> Locating -> InstallingDirect
//!      -> InstallingElevated -> InstallingManualFallback
//!      -> Relaunching -> { Done | Failed }
//! ```
//!
//! The three installation strategies run in strict order and never in
//! parallel. Elevation is only attempted when the direct copy failed with a
//! permission-flavored error; any other direct failure is fatal immediately,
//! because retrying a non-permission error with administrator rights cannot
//! help. The manual fallback is reached for any elevated failure except the
//! user dismissing the credential prompt, which is surfaced as
//! [`UpdateError::InstallationCancelled`] and never retried.
//!
//! Two safety invariants hold throughout:
//!
//! - The old bundle is trashed (recoverably) or left untouched until the new
//!   bytes are staged; a failed copy never destroys a working installation.
//! - Disk images are always detached and extraction directories always
//!   removed, on every exit path, before any relaunch happens.


use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::bundle::locate_bundle;
use crate::config::UpdateConfig;
use crate::core::{Result, UpdateError};
use crate::process::{SystemToolRunner, ToolError, ToolRunner};
use crate::utils::fs::{ScopedDir, copy_dir};

/// The two archive kinds an update package may arrive as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    /// Mountable image; contents become visible at a mount point.
    DiskImage,
    /// Archive expanded directly into a destination directory.
    CompressedArchive,
}

impl ArchiveKind {
    /// Infer the archive kind from the file extension.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::InstallationFailed`] for unrecognized package
    /// types.
    pub fn infer(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()).map(str::to_lowercase).as_deref() {
            Some("dmg") => Ok(Self::DiskImage),
            Some("zip" | "tar" | "gz" | "tgz" | "bz2" | "xz") => Ok(Self::CompressedArchive),
            other => Err(UpdateError::InstallationFailed {
                reason: format!(
                    "unrecognized update package type: {}",
                    other.unwrap_or("no extension")
                ),
            }),
        }
    }
}

/// Phase of the installation state machine, for observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallPhase {
    /// No installation in flight.
    Idle,
    /// Mounting the disk image or expanding the archive.
    Extracting,
    /// Searching the extracted tree for the application bundle.
    Locating,
    /// Plain filesystem copy into the destination.
    InstallingDirect,
    /// Privileged remove-then-copy after a permission failure.
    InstallingElevated,
    /// Staging the bundle somewhere writable for the user to finish.
    InstallingManualFallback,
    /// Launching the new instance before terminating this one.
    Relaunching,
    /// Terminal: installation finished (possibly via manual fallback).
    Done,
    /// Terminal: installation failed.
    Failed,
}

/// How an installation concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The bundle was installed at `destination` and a relaunch was
    /// attempted; the current process is terminating.
    Installed {
        /// Where the new bundle now lives.
        destination: PathBuf,
    },
    /// The bundle was staged somewhere writable; the user finishes the job.
    /// No relaunch happens on this path.
    ManualFallback {
        /// Where the new bundle was staged.
        staged_at: PathBuf,
        /// Human-readable instructions to surface to the user.
        instructions: String,
    },
}

/// Orchestrates extraction, bundle location, the strategy state machine,
/// and relaunch.
///
/// One installer drives at most one installation at a time (`install` takes
/// `&mut self`); concurrent installs against the same destination are the
/// caller's responsibility to prevent.
pub struct Installer<R: ToolRunner> {
    config: UpdateConfig,
    runner: R,
    running_bundle: PathBuf,
    phase: InstallPhase,
}

impl Installer<SystemToolRunner> {
    /// Create an installer using the platform's real tools.
    ///
    /// `running_bundle` is the path of the currently running application
    /// bundle, used to resolve the installation destination.
    pub fn new(config: UpdateConfig, running_bundle: impl Into<PathBuf>) -> Self {
        Self::with_runner(config, SystemToolRunner::new(), running_bundle)
    }
}

impl<R: ToolRunner> Installer<R> {
    /// Create an installer with an injected tool runner.
    pub fn with_runner(config: UpdateConfig, runner: R, running_bundle: impl Into<PathBuf>) -> Self {
        Self { config, runner, running_bundle: running_bundle.into(), phase: InstallPhase::Idle }
    }

    /// The current phase of the state machine.
    #[must_use]
    pub const fn phase(&self) -> InstallPhase {
        self.phase
    }

    fn set_phase(&mut self, phase: InstallPhase) {
        debug!("Install phase: {:?} -> {phase:?}", self.phase);
        self.phase = phase;
    }

    /// Install the update package at `archive`.
    ///
    /// On the direct and elevated paths this launches the new bundle and
    /// terminates the current process through the tool runner; in production
    /// this method therefore does not return after a successful install.
    /// The manual-fallback outcome returns normally, leaving relaunch to the
    /// user.
    ///
    /// # Errors
    ///
    /// [`UpdateError::InstallationFailed`] for fatal failures,
    /// [`UpdateError::InstallationCancelled`] when the user dismissed the
    /// elevation prompt.
    pub async fn install(&mut self, archive: &Path) -> Result<InstallOutcome> {
        info!("Installing update package {}", archive.display());
        // Extraction areas are fully cleaned up inside `run` before any
        // relaunch, so the new instance never starts with a stale mount.
        match self.run(archive).await {
            Ok(InstallOutcome::Installed { destination }) => {
                self.relaunch(&destination).await;
                self.set_phase(InstallPhase::Done);
                Ok(InstallOutcome::Installed { destination })
            }
            Ok(outcome) => {
                self.set_phase(InstallPhase::Done);
                Ok(outcome)
            }
            Err(err) => {
                self.set_phase(InstallPhase::Failed);
                Err(err)
            }
        }
    }

    /// Extraction and strategy machine, without the relaunch step.
    async fn run(&mut self, archive: &Path) -> Result<InstallOutcome> {
        self.set_phase(InstallPhase::Extracting);
        match ArchiveKind::infer(archive)? {
            ArchiveKind::DiskImage => {
                let mount = ScopedDir::new("mount")
                    .map_err(|e| UpdateError::InstallationFailed { reason: e.to_string() })?;
                self.runner
                    .attach_disk_image(archive, mount.path())
                    .await
                    .map_err(tool_failure)?;

                let result = self.install_from(mount.path()).await;

                // Detach on every exit path, success or failure.
                if let Err(err) = self.runner.detach_disk_image(mount.path()).await {
                    warn!("Failed to detach disk image: {err}");
                }
                result
            }
            ArchiveKind::CompressedArchive => {
                let staging = ScopedDir::new("extract")
                    .map_err(|e| UpdateError::InstallationFailed { reason: e.to_string() })?;
                self.runner
                    .expand_archive(archive, staging.path())
                    .await
                    .map_err(tool_failure)?;
                // `staging` is removed when it drops, failure or not.
                self.install_from(staging.path()).await
            }
        }
    }

    /// Locate the bundle and drive the strategy sequence.
    async fn install_from(&mut self, source_dir: &Path) -> Result<InstallOutcome> {
        self.set_phase(InstallPhase::Locating);
        let bundle = locate_bundle(source_dir, &self.config.bundle_extension)
            .map_err(|e| UpdateError::InstallationFailed {
                reason: format!("failed to scan update contents: {e}"),
            })?
            .ok_or_else(|| UpdateError::InstallationFailed {
                reason: "no application bundle found in update package".to_string(),
            })?;
        let destination = self.resolve_destination(&bundle)?;
        info!("Installing {} -> {}", bundle.display(), destination.display());

        self.set_phase(InstallPhase::InstallingDirect);
        let direct_failure = match self.install_direct(&bundle, &destination).await {
            Ok(()) => return Ok(InstallOutcome::Installed { destination }),
            Err(reason) => reason,
        };

        if !is_permission_error(&direct_failure) {
            // Elevation cannot fix a non-permission failure; fatal now.
            return Err(UpdateError::InstallationFailed { reason: direct_failure });
        }

        warn!("Direct install hit a permission error, retrying with elevation: {direct_failure}");
        self.set_phase(InstallPhase::InstallingElevated);
        match self.install_elevated(&bundle, &destination).await {
            Ok(()) => Ok(InstallOutcome::Installed { destination }),
            Err(ToolError::Cancelled) => Err(UpdateError::InstallationCancelled),
            Err(ToolError::Failed { reason }) => {
                warn!("Elevated install failed, staging for manual installation: {reason}");
                self.set_phase(InstallPhase::InstallingManualFallback);
                self.install_manual(&bundle, &destination).await
            }
        }
    }

    /// Destination: the standard applications directory when the running
    /// instance lives there, otherwise the running instance's own directory.
    fn resolve_destination(&self, bundle: &Path) -> Result<PathBuf> {
        let name = bundle.file_name().ok_or_else(|| UpdateError::InstallationFailed {
            reason: format!("invalid bundle path: {}", bundle.display()),
        })?;
        let running_dir =
            self.running_bundle.parent().ok_or_else(|| UpdateError::InstallationFailed {
                reason: format!(
                    "cannot determine directory of running bundle: {}",
                    self.running_bundle.display()
                ),
            })?;
        let dir = if running_dir == self.config.applications_dir {
            self.config.applications_dir.as_path()
        } else {
            running_dir
        };
        Ok(dir.join(name))
    }

    /// Plain-filesystem installation. Returns the failure reason as text so
    /// the caller can classify it.
    async fn install_direct(&self, bundle: &Path, destination: &Path) -> std::result::Result<(), String> {
        if destination.exists() {
            // Move the occupant somewhere recoverable before touching it;
            // outright removal is the last resort.
            if let Err(trash_err) = self.runner.move_to_trash(destination).await {
                debug!("Trash failed ({trash_err}), attempting direct removal");
                let removed = if destination.is_dir() {
                    std::fs::remove_dir_all(destination)
                } else {
                    std::fs::remove_file(destination)
                };
                if let Err(remove_err) = removed {
                    return Err(format!(
                        "failed to remove existing item at {}: {remove_err}",
                        destination.display()
                    ));
                }
            }
        }

        // The old bundle is gone (or was never there); staging the new bytes
        // cannot clobber a working installation.
        copy_dir(bundle, destination).map_err(|e| format!("{e:#}"))
    }

    /// Privileged remove-then-copy via the elevation prompt.
    async fn install_elevated(
        &self,
        bundle: &Path,
        destination: &Path,
    ) -> std::result::Result<(), ToolError> {
        let command = format!(
            "rm -rf '{}' && cp -R '{}' '{}'",
            destination.display(),
            bundle.display(),
            destination.display()
        );
        self.runner.run_privileged(&command).await
    }

    /// Stage the bundle in the first writable fallback location and hand
    /// the rest of the job to the user.
    async fn install_manual(&mut self, bundle: &Path, destination: &Path) -> Result<InstallOutcome> {
        let name = bundle.file_name().ok_or_else(|| UpdateError::InstallationFailed {
            reason: format!("invalid bundle path: {}", bundle.display()),
        })?;

        for dir in &self.config.fallback_dirs {
            if !dir.is_dir() {
                continue;
            }
            let staged = dir.join(name);
            match copy_dir(bundle, &staged) {
                Ok(()) => {
                    if let Err(err) = self.runner.reveal_in_browser(&staged).await {
                        warn!("Failed to reveal staged bundle: {err}");
                    }
                    let instructions = format!(
                        "The update could not be installed automatically. Quit the application, \
                         move {} to {}, replacing the old version, then relaunch.",
                        staged.display(),
                        destination.display()
                    );
                    info!("Update staged for manual installation at {}", staged.display());
                    return Ok(InstallOutcome::ManualFallback { staged_at: staged, instructions });
                }
                Err(err) => {
                    debug!("Cannot stage in {}: {err:#}", dir.display());
                }
            }
        }

        Err(UpdateError::InstallationFailed {
            reason: "no writable location available for manual installation".to_string(),
        })
    }

    /// Launch the new bundle, wait briefly, and terminate this process.
    /// There is no path back to `Idle` from here.
    async fn relaunch(&mut self, destination: &Path) {
        self.set_phase(InstallPhase::Relaunching);
        if let Err(err) = self.runner.launch_app(destination).await {
            warn!("Launch failed ({err}), falling back to generic opener");
            if let Err(err) = self.runner.open_path(destination).await {
                warn!("Generic opener also failed: {err}");
            }
        }
        tokio::time::sleep(self.config.relaunch_delay).await;
        self.runner.terminate_current();
    }
}

/// Map an external-tool failure into the install error vocabulary.
fn tool_failure(err: ToolError) -> UpdateError {
    match err {
        ToolError::Cancelled => UpdateError::InstallationCancelled,
        ToolError::Failed { reason } => UpdateError::InstallationFailed { reason },
    }
}

/// Heuristic classification of permission-flavored failure text, used to
/// decide whether elevation is worth attempting.
fn is_permission_error(reason: &str) -> bool {
    let lower = reason.to_lowercase();
    lower.contains("permission denied")
        || lower.contains("operation not permitted")
        || lower.contains("read-only file system")
        || lower.contains("access is denied")
        || lower.contains("eacces")
        || lower.contains("os error 13")
}
