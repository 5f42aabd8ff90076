//! Periodic update checking with an explicit, caller-owned task handle.
//!
//! There is no hidden global scheduler: a host application that wants
//! automatic checks calls [`CheckScheduler::start`] with an interval, a
//! fetch closure, and a notification callback, and keeps the returned
//! [`CheckHandle`]. Dropping the handle (or calling [`CheckHandle::stop`])
//! cancels the background task. Fetch failures are logged and swallowed; a
//! flaky network must never take the host application down with it.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::UpdateDescriptor;
use crate::core::{Result, UpdateError};

/// Whether `candidate` is a strictly newer semantic version than `current`.
///
/// # Errors
///
/// Returns [`UpdateError::Unknown`] when either string is not valid semver.
pub fn is_newer(current: &str, candidate: &str) -> Result<bool> {
    let current = semver::Version::parse(current).map_err(|e| UpdateError::Unknown {
        message: format!("invalid current version {current:?}: {e}"),
    })?;
    let candidate = semver::Version::parse(candidate).map_err(|e| UpdateError::Unknown {
        message: format!("invalid candidate version {candidate:?}: {e}"),
    })?;
    Ok(candidate > current)
}

/// Handle to a running background check task.
///
/// The task stops when [`stop`](Self::stop) is called or when the handle is
/// dropped.
pub struct CheckHandle {
    token: CancellationToken,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl CheckHandle {
    /// Stop the background task and wait for it to finish.
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for CheckHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Spawns periodic update checks.
pub struct CheckScheduler;

impl CheckScheduler {
    /// Start checking every `interval`, comparing against `current_version`.
    ///
    /// `fetch` asks the update service for a descriptor (`Ok(None)` when the
    /// server reports nothing available); `on_update` is invoked whenever
    /// the fetched descriptor's version is strictly newer than
    /// `current_version`. The first check runs one full interval after the
    /// call, not immediately.
    pub fn start<F, Fut, C>(
        current_version: String,
        interval: Duration,
        fetch: F,
        on_update: C,
    ) -> CheckHandle
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Option<UpdateDescriptor>>> + Send + 'static,
        C: Fn(UpdateDescriptor) + Send + 'static,
    {
        let token = CancellationToken::new();
        let task_token = token.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The immediate first tick is consumed here so checks start
            // after one full interval.
            ticker.tick().await;

            loop {
                tokio::select! {
                    () = task_token.cancelled() => {
                        debug!("Update check task stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        match fetch().await {
                            Ok(Some(descriptor)) => {
                                match is_newer(&current_version, &descriptor.version) {
                                    Ok(true) => {
                                        info!(
                                            "Update available: {} -> {}",
                                            current_version, descriptor.version
                                        );
                                        on_update(descriptor);
                                    }
                                    Ok(false) => {
                                        debug!("Already on latest version {current_version}");
                                    }
                                    Err(err) => warn!("Version comparison failed: {err}"),
                                }
                            }
                            Ok(None) => debug!("No update available"),
                            // Periodic checks are best-effort.
                            Err(err) => warn!("Update check failed: {err}"),
                        }
                    }
                }
            }
        });

        CheckHandle { token, task: Some(task) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn descriptor(version: &str) -> UpdateDescriptor {
        UpdateDescriptor {
            version: version.to_string(),
            release_notes: String::new(),
            minimum_platform_version: None,
            file_size: None,
            content_hash: None,
            download_path: "releases/latest.zip".to_string(),
        }
    }

    #[test]
    fn test_is_newer() {
        assert!(is_newer("1.0.0", "1.1.0").unwrap());
        assert!(is_newer("1.0.0", "2.0.0-beta.1").unwrap());
        assert!(!is_newer("1.1.0", "1.1.0").unwrap());
        assert!(!is_newer("1.2.0", "1.1.9").unwrap());
        assert!(is_newer("1.0", "1.1.0").is_err());
    }

    #[tokio::test]
    async fn test_scheduler_notifies_on_newer_version() {
        let notified = Arc::new(AtomicUsize::new(0));
        let observed = notified.clone();

        let handle = CheckScheduler::start(
            "1.0.0".to_string(),
            Duration::from_millis(20),
            || async { Ok(Some(descriptor("1.1.0"))) },
            move |d| {
                assert_eq!(d.version, "1.1.0");
                observed.fetch_add(1, Ordering::SeqCst);
            },
        );

        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.stop().await;
        assert!(notified.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_scheduler_ignores_older_versions_and_errors() {
        let notified = Arc::new(AtomicUsize::new(0));
        let observed = notified.clone();
        let flip = Arc::new(AtomicUsize::new(0));

        let handle = CheckScheduler::start(
            "2.0.0".to_string(),
            Duration::from_millis(10),
            move || {
                let n = flip.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n % 2 == 0 {
                        Ok(Some(descriptor("1.9.0")))
                    } else {
                        Err(UpdateError::Network { message: "offline".to_string() })
                    }
                }
            },
            move |_| {
                observed.fetch_add(1, Ordering::SeqCst);
            },
        );

        tokio::time::sleep(Duration::from_millis(80)).await;
        handle.stop().await;
        assert_eq!(notified.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dropping_handle_cancels_task() {
        let fetched = Arc::new(AtomicUsize::new(0));
        let counter = fetched.clone();

        let handle = CheckScheduler::start(
            "1.0.0".to_string(),
            Duration::from_millis(10),
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok(None) }
            },
            |_| {},
        );

        tokio::time::sleep(Duration::from_millis(40)).await;
        drop(handle);
        let after_drop = fetched.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        // At most one already-started fetch can land after cancellation.
        assert!(fetched.load(Ordering::SeqCst) <= after_drop + 1);
    }
}
