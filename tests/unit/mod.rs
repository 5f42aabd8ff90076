//! Unit test suite aggregated into a single test binary.

use std::sync::Once;

mod download_tests;
mod pipeline_tests;

static INIT_LOGGING: Once = Once::new();

/// Install a tracing subscriber for the suite, honoring `RUST_LOG`.
///
/// Quiet when `RUST_LOG` is unset; rerun a failing test with
/// `RUST_LOG=airlift=debug` to see the engine's tracing output. Safe to call
/// from every test; only the first call does anything.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        if let Ok(filter) = tracing_subscriber::EnvFilter::try_from_default_env() {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_test_writer()
                .try_init();
        }
    });
}
