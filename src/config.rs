//! Harness configuration.
//!
//! One immutable [`HarnessConfig`] value carries every path, documented bound
//! and timing constant the harness uses; it is built once (defaults, then an
//! optional TOML file, then CLI overrides) and passed by reference to every
//! component. There is no process-wide mutable state.
//!
//! The defaults mirror the driver's documented values: sampling period in
//! [100, 60000] ms (default 1000), threshold in [-50000, 150000] mC (default
//! 50000), modes `normal` / `noisy` / `ramp`, ramp step +100 mC with a reset
//! above 100 C. The ramp wraparound boundary is driver-defined in practice,
//! so the high/low water pair the mode check uses is configurable here
//! rather than hard-coded.

use crate::error::{HarnessError, HarnessResult};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default device node path.
pub const DEFAULT_DEV_PATH: &str = "/dev/simtemp";
/// Default sysfs class directory for the device.
pub const DEFAULT_SYSFS_PATH: &str = "/sys/class/misc/simtemp";

/// Top-level harness configuration.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HarnessConfig {
    pub paths: DevicePaths,
    pub limits: AttributeLimits,
    pub timing: TestTiming,
}

/// Filesystem locations of the device node and its sysfs attributes.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DevicePaths {
    /// Character device node.
    pub device: PathBuf,
    /// Sysfs directory holding the configuration attributes.
    pub sysfs: PathBuf,
}

/// Documented bounds for the writable attributes.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AttributeLimits {
    pub sampling_ms_min: i64,
    pub sampling_ms_max: i64,
    pub threshold_mc_min: i64,
    pub threshold_mc_max: i64,
}

/// Timing constants and per-case parameters for the test suite.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TestTiming {
    /// Pause after a configuration write before measuring, in ms.
    pub settle_ms: u64,
    /// Fast sampling period exercised by the rate check, in ms.
    pub rate_fast_period_ms: i64,
    /// Observation window paired with the fast period, in ms.
    pub rate_fast_window_ms: u64,
    /// Slow sampling period exercised by the rate check, in ms.
    pub rate_slow_period_ms: i64,
    /// Observation window paired with the slow period, in ms.
    pub rate_slow_window_ms: u64,
    /// Consecutive samples the rate check's coherence sub-check reads.
    pub coherence_samples: u32,
    /// Extra margin on the per-sample readiness deadline, in ms.
    pub per_sample_margin_ms: u64,
    /// Threshold forced by the alert check; must sit below any attainable
    /// reading so every sample qualifies as an alert.
    pub alert_force_threshold_mc: i64,
    /// Number of alert events the alert check waits for.
    pub alert_expected: u32,
    /// Overall deadline for the alert check, in ms.
    pub alert_timeout_ms: u64,
    /// Total duration of the concurrency stress window, in ms.
    pub stress_duration_ms: u64,
    /// Poll slice of the background sampler; also bounds how long a
    /// cancellation request can go unobserved. In ms.
    pub stress_poll_ms: u64,
    /// Grace period for the background sampler to terminate after
    /// cancellation, in ms.
    pub stress_grace_ms: u64,
    /// Non-zero byte offset probed by the read-offset check.
    pub offset_probe: u64,
    /// Samples observed by the ramp-mode check.
    pub ramp_samples: u32,
    /// Documented ramp increment per sample, in mC.
    pub ramp_step_mc: i32,
    /// Previous reading at or above this value makes a sharp drop count as
    /// wraparound rather than failure, in mC.
    pub ramp_wrap_high_mc: i32,
    /// Post-drop reading must be at or below this value for the drop to
    /// count as wraparound, in mC.
    pub ramp_wrap_low_mc: i32,
    /// Samples observed by the noisy-mode check.
    pub noisy_samples: u32,
    /// Longest permitted run of identical consecutive readings in noisy mode.
    pub max_identical_run: u32,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            paths: DevicePaths::default(),
            limits: AttributeLimits::default(),
            timing: TestTiming::default(),
        }
    }
}

impl Default for DevicePaths {
    fn default() -> Self {
        Self {
            device: PathBuf::from(DEFAULT_DEV_PATH),
            sysfs: PathBuf::from(DEFAULT_SYSFS_PATH),
        }
    }
}

impl Default for AttributeLimits {
    fn default() -> Self {
        Self {
            sampling_ms_min: 100,
            sampling_ms_max: 60_000,
            threshold_mc_min: -50_000,
            threshold_mc_max: 150_000,
        }
    }
}

impl Default for TestTiming {
    fn default() -> Self {
        Self {
            settle_ms: 300,
            rate_fast_period_ms: 100,
            rate_fast_window_ms: 1_000,
            rate_slow_period_ms: 1_000,
            rate_slow_window_ms: 3_000,
            coherence_samples: 5,
            per_sample_margin_ms: 200,
            alert_force_threshold_mc: -50_000,
            alert_expected: 2,
            alert_timeout_ms: 10_000,
            stress_duration_ms: 3_000,
            stress_poll_ms: 50,
            stress_grace_ms: 1_000,
            offset_probe: 8,
            ramp_samples: 6,
            ramp_step_mc: 100,
            ramp_wrap_high_mc: 90_000,
            ramp_wrap_low_mc: 10_000,
            noisy_samples: 8,
            max_identical_run: 2,
        }
    }
}

impl DevicePaths {
    /// Path of a named sysfs attribute.
    pub fn attr(&self, name: &str) -> PathBuf {
        self.sysfs.join(name)
    }
}

impl TestTiming {
    /// Settle delay as a `Duration`.
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// Per-sample readiness deadline for a given sampling period:
    /// two periods plus a fixed margin.
    pub fn per_sample_deadline(&self, period_ms: i64) -> Duration {
        Duration::from_millis(2 * period_ms.max(0) as u64 + self.per_sample_margin_ms)
    }
}

impl HarnessConfig {
    /// Load configuration from a TOML file, falling back to defaults for any
    /// omitted section or field.
    pub fn load(path: &Path) -> HarnessResult<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| {
            HarnessError::ConfigRead {
                attr: path.display().to_string(),
                reason: e.to_string(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_bounds() {
        let cfg = HarnessConfig::default();
        assert_eq!(cfg.limits.sampling_ms_min, 100);
        assert_eq!(cfg.limits.sampling_ms_max, 60_000);
        assert_eq!(cfg.limits.threshold_mc_min, -50_000);
        assert_eq!(cfg.limits.threshold_mc_max, 150_000);
        assert_eq!(cfg.paths.device, PathBuf::from("/dev/simtemp"));
    }

    #[test]
    fn attr_path_joins_sysfs_dir() {
        let cfg = HarnessConfig::default();
        assert_eq!(
            cfg.paths.attr("sampling_ms"),
            PathBuf::from("/sys/class/misc/simtemp/sampling_ms")
        );
    }

    #[test]
    fn partial_toml_keeps_defaults_elsewhere() {
        let cfg: HarnessConfig = toml::from_str(
            r#"
            [paths]
            device = "/dev/simtemp-test"

            [timing]
            stress_duration_ms = 500
            "#,
        )
        .expect("parse");
        assert_eq!(cfg.paths.device, PathBuf::from("/dev/simtemp-test"));
        assert_eq!(cfg.paths.sysfs, PathBuf::from(DEFAULT_SYSFS_PATH));
        assert_eq!(cfg.timing.stress_duration_ms, 500);
        assert_eq!(cfg.timing.alert_timeout_ms, 10_000);
    }

    #[test]
    fn per_sample_deadline_adds_margin() {
        let timing = TestTiming::default();
        assert_eq!(
            timing.per_sample_deadline(100),
            Duration::from_millis(400)
        );
    }
}
