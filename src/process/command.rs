//! Builder for bounded external-tool invocations.
//!
//! Every external tool the installer shells out to runs through
//! [`ToolCommand`]: output captured, a hard timeout enforced, and failures
//! folded into a single human-readable reason that includes whatever the
//! tool wrote to stderr. The timeout kills the child rather than waiting on
//! it, so a wedged mount or elevation helper cannot hang an install forever.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::ToolError;

/// Default time limit for a single tool invocation.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Captured output of a successful tool invocation.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error (tools often write progress here).
    pub stderr: String,
}

/// Fluent builder for one external-tool invocation.
///
/// # Examples
///
/// ```rust,no_run
/// use airlift::process::command::ToolCommand;
///
/// # async fn example() -> Result<(), airlift::process::ToolError> {
/// let output = ToolCommand::new("hdiutil")
///     .args(["attach", "/tmp/update.dmg"])
///     .with_context("attach disk image")
///     .execute()
///     .await?;
/// println!("{}", output.stdout);
/// # Ok(())
/// # }
/// ```
pub struct ToolCommand {
    program: String,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    timeout_duration: Duration,
    context: Option<String>,
}

impl ToolCommand {
    /// Start building an invocation of `program`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            timeout_duration: DEFAULT_TIMEOUT,
            context: None,
        }
    }

    /// Add arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory for the invocation.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Override the invocation timeout.
    #[must_use]
    pub const fn with_timeout(mut self, duration: Duration) -> Self {
        self.timeout_duration = duration;
        self
    }

    /// Set a short operation description included in error reasons and logs.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Run the tool and capture its output.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Failed`] when the tool cannot be spawned, exits
    /// non-zero (reason includes stderr and the exit code), or exceeds the
    /// timeout (child is killed).
    pub async fn execute(self) -> Result<ToolOutput, ToolError> {
        let label = self.context.unwrap_or_else(|| self.program.clone());
        debug!(
            target: "tool",
            "Executing: {} {}",
            self.program,
            self.args.join(" ")
        );

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
        if let Some(ref dir) = self.current_dir {
            cmd.current_dir(dir);
        }
        // Ensure a timed-out child is killed, not orphaned.
        cmd.kill_on_drop(true);

        let output = match timeout(self.timeout_duration, cmd.output()).await {
            Ok(result) => result
                .map_err(|e| ToolError::failed(format!("{label}: failed to start {}: {e}", self.program)))?,
            Err(_) => {
                warn!(
                    target: "tool",
                    "{label} timed out after {} seconds",
                    self.timeout_duration.as_secs()
                );
                return Err(ToolError::failed(format!(
                    "{label} timed out after {} seconds",
                    self.timeout_duration.as_secs()
                )));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let detail = if stderr.trim().is_empty() { stdout } else { stderr };
            let code = output
                .status
                .code()
                .map_or_else(|| "terminated by signal".to_string(), |c| format!("exit code {c}"));
            debug!(target: "tool", "{label} failed ({code}): {}", detail.trim());
            return Err(ToolError::failed(format!("{label} failed ({code}): {}", detail.trim())));
        }

        Ok(ToolOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}
