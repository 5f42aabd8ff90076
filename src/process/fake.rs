//! Scriptable [`ToolRunner`] for tests.
//!
//! Records every invocation and lets tests inject failures per capability.
//! "Mounting" and "extracting" copy a configured payload directory into the
//! requested destination, so installer tests exercise the real locate and
//! copy logic against real files.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::utils::fs::{ScopedDir, copy_dir};

use super::{ToolError, ToolRunner};

/// One recorded tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    /// Disk image attached at a mount point.
    Attach { image: PathBuf, mount_point: PathBuf },
    /// Disk image detached.
    Detach { mount_point: PathBuf },
    /// Archive expanded into a destination.
    Expand { archive: PathBuf, destination: PathBuf },
    /// Privileged shell command executed.
    Privileged { command: String },
    /// Application bundle launched.
    Launch { bundle: PathBuf },
    /// Generic opener invoked.
    Open { path: PathBuf },
    /// Path revealed in the file browser.
    Reveal { path: PathBuf },
    /// Path moved to trash.
    Trash { path: PathBuf },
    /// Current process asked to terminate.
    Terminate,
}

/// Outcome a fake privileged invocation should produce.
#[derive(Debug, Clone, Default)]
pub enum PrivilegedOutcome {
    /// Report success.
    #[default]
    Succeed,
    /// Report a non-cancellation failure.
    Fail(String),
    /// Report that the user dismissed the credential prompt.
    Cancelled,
}

/// In-memory tool runner that records calls and performs copies locally.
pub struct FakeToolRunner {
    calls: Mutex<Vec<ToolCall>>,
    /// Directory whose contents stand in for the archive payload.
    payload: Option<PathBuf>,
    attach_error: Option<String>,
    expand_error: Option<String>,
    trash_error: Option<String>,
    launch_error: Option<String>,
    privileged: PrivilegedOutcome,
    trash: ScopedDir,
}

impl FakeToolRunner {
    /// Create a fake runner with all capabilities succeeding.
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            payload: None,
            attach_error: None,
            expand_error: None,
            trash_error: None,
            launch_error: None,
            privileged: PrivilegedOutcome::default(),
            trash: ScopedDir::new("fake_trash").expect("create fake trash dir"),
        }
    }

    /// Use `payload` as the content revealed by mount/extract operations.
    #[must_use]
    pub fn with_payload(mut self, payload: impl Into<PathBuf>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Make disk-image attach fail.
    #[must_use]
    pub fn with_attach_error(mut self, reason: impl Into<String>) -> Self {
        self.attach_error = Some(reason.into());
        self
    }

    /// Make archive expansion fail.
    #[must_use]
    pub fn with_expand_error(mut self, reason: impl Into<String>) -> Self {
        self.expand_error = Some(reason.into());
        self
    }

    /// Make trashing fail, forcing the direct-removal fallback.
    #[must_use]
    pub fn with_trash_error(mut self, reason: impl Into<String>) -> Self {
        self.trash_error = Some(reason.into());
        self
    }

    /// Make bundle launch fail, forcing the generic-opener fallback.
    #[must_use]
    pub fn with_launch_error(mut self, reason: impl Into<String>) -> Self {
        self.launch_error = Some(reason.into());
        self
    }

    /// Script the outcome of privileged invocations.
    #[must_use]
    pub fn with_privileged_outcome(mut self, outcome: PrivilegedOutcome) -> Self {
        self.privileged = outcome;
        self
    }

    /// Snapshot of all recorded calls, in order.
    pub fn calls(&self) -> Vec<ToolCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    /// Number of privileged invocations recorded.
    pub fn privileged_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, ToolCall::Privileged { .. }))
            .count()
    }

    fn record(&self, call: ToolCall) {
        self.calls.lock().expect("calls lock").push(call);
    }

    fn deliver_payload(&self, destination: &Path) -> Result<(), ToolError> {
        if let Some(ref payload) = self.payload {
            copy_dir(payload, destination)
                .map_err(|e| ToolError::failed(format!("fake payload copy: {e}")))?;
        }
        Ok(())
    }
}

impl Default for FakeToolRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRunner for FakeToolRunner {
    async fn attach_disk_image(&self, image: &Path, mount_point: &Path) -> Result<(), ToolError> {
        self.record(ToolCall::Attach {
            image: image.to_path_buf(),
            mount_point: mount_point.to_path_buf(),
        });
        if let Some(ref reason) = self.attach_error {
            return Err(ToolError::failed(reason.clone()));
        }
        self.deliver_payload(mount_point)
    }

    async fn detach_disk_image(&self, mount_point: &Path) -> Result<(), ToolError> {
        self.record(ToolCall::Detach { mount_point: mount_point.to_path_buf() });
        Ok(())
    }

    async fn expand_archive(&self, archive: &Path, destination: &Path) -> Result<(), ToolError> {
        self.record(ToolCall::Expand {
            archive: archive.to_path_buf(),
            destination: destination.to_path_buf(),
        });
        if let Some(ref reason) = self.expand_error {
            return Err(ToolError::failed(reason.clone()));
        }
        self.deliver_payload(destination)
    }

    async fn run_privileged(&self, command: &str) -> Result<(), ToolError> {
        self.record(ToolCall::Privileged { command: command.to_string() });
        match &self.privileged {
            PrivilegedOutcome::Succeed => Ok(()),
            PrivilegedOutcome::Fail(reason) => Err(ToolError::failed(reason.clone())),
            PrivilegedOutcome::Cancelled => Err(ToolError::Cancelled),
        }
    }

    async fn launch_app(&self, bundle: &Path) -> Result<(), ToolError> {
        self.record(ToolCall::Launch { bundle: bundle.to_path_buf() });
        if let Some(ref reason) = self.launch_error {
            return Err(ToolError::failed(reason.clone()));
        }
        Ok(())
    }

    async fn open_path(&self, path: &Path) -> Result<(), ToolError> {
        self.record(ToolCall::Open { path: path.to_path_buf() });
        Ok(())
    }

    async fn reveal_in_browser(&self, path: &Path) -> Result<(), ToolError> {
        self.record(ToolCall::Reveal { path: path.to_path_buf() });
        Ok(())
    }

    async fn move_to_trash(&self, path: &Path) -> Result<(), ToolError> {
        self.record(ToolCall::Trash { path: path.to_path_buf() });
        if let Some(ref reason) = self.trash_error {
            return Err(ToolError::failed(reason.clone()));
        }
        let holding = self
            .trash
            .path()
            .join(format!("{}-{}", uuid::Uuid::new_v4(), path.file_name().and_then(|n| n.to_str()).unwrap_or("item")));
        std::fs::rename(path, &holding)
            .map_err(|e| ToolError::failed(format!("fake trash: {e}")))?;
        Ok(())
    }

    fn terminate_current(&self) {
        self.record(ToolCall::Terminate);
    }
}
