//! Core types shared across the update pipeline.
//!
//! This module hosts the [`UpdateError`] taxonomy that every component of the
//! crate surfaces its failures through. No raw lower-level error crosses the
//! crate boundary uninterpreted: network, filesystem, and external-tool
//! failures are all rewrapped here with a human-readable reason. The one
//! deliberate exception is plain file I/O from the pure helpers (hashing a
//! file that does not exist), which passes through as [`UpdateError::Io`]
//! unchanged.

mod error;

pub use error::UpdateError;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, UpdateError>;
