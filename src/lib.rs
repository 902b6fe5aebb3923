//! # simtemp-harness
//!
//! Conformance and stress-test harness for the `nxp_simtemp` character
//! device and its sysfs configuration surface. The harness is a black-box
//! verifier: it exercises the documented byte/string/event contract
//! (periodic 16-byte samples, high-priority threshold alerts, bounded
//! configuration attributes) and never models the driver's internals.
//!
//! ## Crate structure
//!
//! - **`config`**: the immutable [`config::HarnessConfig`] value carrying
//!   paths, documented bounds, and timing constants.
//! - **`error`**: the [`error::HarnessError`] taxonomy shared by every
//!   component.
//! - **`sample`**: codec for the fixed-size binary sample record.
//! - **`stats`**: parser for the `updates=.. alerts=.. errors=..` string.
//! - **`sysfs`**: configuration port over the sysfs attribute files,
//!   including snapshot capture and restoration.
//! - **`device`**: RAII device session with deadline-bounded readiness
//!   waits (ordinary and alert) and fixed-offset sample reads.
//! - **`report`**: per-case outcomes, diagnostic logs, and the suite
//!   report.
//! - **`checks`**: the six conformance test cases.
//! - **`stress`**: the cancellable background sampler used by the
//!   concurrency stress case.
//! - **`suite`**: the orchestrator — precondition gate, fixed-order
//!   execution, per-case fault isolation.
//! - **`monitor`**: the live watch-and-print loop.

pub mod checks;
pub mod config;
pub mod device;
pub mod error;
pub mod monitor;
pub mod report;
pub mod sample;
pub mod stats;
pub mod stress;
pub mod suite;
pub mod sysfs;
