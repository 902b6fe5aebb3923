//! Custom error types for the harness.
//!
//! This module defines the primary error type, `HarnessError`, used across the
//! library. Using the `thiserror` crate, it provides one consistent taxonomy
//! for everything that can go wrong while exercising the device:
//!
//! - **`DeviceUnavailable`**: the device node is missing or cannot be opened
//!   (permissions). This is fatal to the whole suite, not to a single case.
//! - **`Timeout`**: a deadline elapsed while waiting for an expected event.
//!   Fails the current test case; the suite continues.
//! - **`ShortRead`** / **`Decode`**: the device returned fewer bytes than one
//!   sample record, or the record contents could not be decoded.
//! - **`ConfigRead`** / **`ConfigWrite`**: a sysfs attribute access failed.
//! - **`Restore`**: teardown could not reinstate the original configuration.
//!   Forces the owning test case's outcome to failed, never aborts the suite.
//! - **`Precondition`**: the suite's one-time environment check failed.
//!
//! Transient "no data yet" conditions on non-blocking reads are deliberately
//! *not* part of this taxonomy; `DeviceSession::read_sample` reports them as
//! `Ok(None)` so callers retry silently.
//!
//! Errors are caught at test-case granularity by the orchestrator; only
//! precondition failures propagate past it.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias for results using the harness error type.
pub type HarnessResult<T> = std::result::Result<T, HarnessError>;

/// Unified error type for all harness operations.
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("device unavailable at {path}: {source}")]
    DeviceUnavailable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("timed out after {0:?} waiting for {1}")]
    Timeout(std::time::Duration, &'static str),

    #[error("short read: got {got} bytes, expected {expected}")]
    ShortRead { got: usize, expected: usize },

    #[error("failed to decode sample record: {0}")]
    Decode(String),

    #[error("failed to read sysfs attribute '{attr}': {reason}")]
    ConfigRead { attr: String, reason: String },

    #[error("failed to write sysfs attribute '{attr}': {reason}")]
    ConfigWrite { attr: String, reason: String },

    #[error("failed to restore original configuration: {0}")]
    Restore(String),

    #[error("suite precondition not met: {0}")]
    Precondition(String),

    #[error("device poll error: {0}")]
    Poll(#[from] nix::errno::Errno),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_attribute_name() {
        let err = HarnessError::ConfigWrite {
            attr: "threshold_mc".into(),
            reason: "permission denied".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("threshold_mc"));
        assert!(msg.contains("permission denied"));
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::from(std::io::ErrorKind::NotFound);
        let err: HarnessError = io.into();
        assert!(matches!(err, HarnessError::Io(_)));
    }
}
