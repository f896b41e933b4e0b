//! Shared error types.
//!
//! Only the storage boundary produces real errors. Everything past it
//! (invalid find patterns, invalid host patterns, malformed css) degrades
//! per-rule with a log line instead of failing the pass.

use thiserror::Error;

/// Failure to obtain or decode a settings snapshot.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The backing store could not be reached or refused the read.
    #[error("settings store unavailable: {0}")]
    Store(String),

    /// A namespace decoded from storage was not valid settings JSON.
    #[error("malformed settings: {0}")]
    Malformed(#[from] serde_json::Error),
}
