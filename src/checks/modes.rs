//! TP6 — mode behavior verification.
//!
//! Ramp mode: successive readings must be non-decreasing. The driver ramps
//! by a documented fixed step, but a polled reader can skip samples, so the
//! check requires monotonicity rather than the exact step. A sharp drop
//! from near the top of range to near the bottom is accepted as the
//! documented wraparound; the high/low water pair that defines "near" is
//! configuration, not a hard-coded guess, because the exact reset value is
//! driver-defined.
//!
//! Noisy mode: no run of more than the permitted number of identical
//! consecutive readings.

use super::{collect_samples, finish_with_restore};
use crate::device::{DeviceSession, OpenMode};
use crate::error::HarnessResult;
use crate::report::{TestLog, TestOutcome};
use crate::suite::{TestCase, TestContext};
use crate::sysfs::{SimMode, ATTR_SAMPLING_MS};
use async_trait::async_trait;
use tokio::time::sleep;

pub struct ModeCheck;

#[async_trait]
impl TestCase for ModeCheck {
    fn name(&self) -> &'static str {
        "tp6_modes"
    }

    async fn run(&self, ctx: &TestContext) -> TestOutcome {
        let mut log = TestLog::new(self.name());
        let snapshot = match ctx.port.snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log.fail(format!("could not capture configuration: {e}"));
                return log.into_outcome(false);
            }
        };
        let verdict = self.verify(ctx, &mut log).await;
        let passed = finish_with_restore(&ctx.port, &snapshot, &mut log, verdict);
        log.into_outcome(passed)
    }
}

impl ModeCheck {
    async fn verify(&self, ctx: &TestContext, log: &mut TestLog) -> HarnessResult<bool> {
        let timing = &ctx.config.timing;
        ctx.port
            .set_int(ATTR_SAMPLING_MS, timing.rate_fast_period_ms)?;

        let mut ok = true;
        ok &= self.verify_ramp(ctx, log).await?;
        ok &= self.verify_noisy(ctx, log).await?;
        Ok(ok)
    }

    async fn verify_ramp(&self, ctx: &TestContext, log: &mut TestLog) -> HarnessResult<bool> {
        let timing = &ctx.config.timing;
        ctx.port.set_mode(SimMode::Ramp)?;
        sleep(timing.settle()).await;

        let Some(temps) = self.observe(ctx, timing.ramp_samples, log).await? else {
            return Ok(false);
        };
        log.note(format!(
            "ramp: observed {:?} mC (documented step {} mC)",
            temps, timing.ramp_step_mc
        ));
        match check_ramp_sequence(&temps, timing.ramp_wrap_high_mc, timing.ramp_wrap_low_mc) {
            Ok(()) => {
                log.note("ramp: sequence non-decreasing (modulo wraparound)");
                Ok(true)
            }
            Err(reason) => {
                log.fail(format!("ramp: {reason}"));
                Ok(false)
            }
        }
    }

    async fn verify_noisy(&self, ctx: &TestContext, log: &mut TestLog) -> HarnessResult<bool> {
        let timing = &ctx.config.timing;
        ctx.port.set_mode(SimMode::Noisy)?;
        sleep(timing.settle()).await;

        let Some(temps) = self.observe(ctx, timing.noisy_samples, log).await? else {
            return Ok(false);
        };
        log.note(format!("noisy: observed {temps:?} mC"));
        match check_noisy_sequence(&temps, timing.max_identical_run) {
            Ok(()) => {
                log.note(format!(
                    "noisy: no run longer than {} identical readings",
                    timing.max_identical_run
                ));
                Ok(true)
            }
            Err(reason) => {
                log.fail(format!("noisy: {reason}"));
                Ok(false)
            }
        }
    }

    /// Collect temperatures through readiness-gated reads at the fast
    /// period; `None` means a timeout or device error already logged.
    async fn observe(
        &self,
        ctx: &TestContext,
        count: u32,
        log: &mut TestLog,
    ) -> HarnessResult<Option<Vec<i32>>> {
        let timing = &ctx.config.timing;
        let session = DeviceSession::open(&ctx.config.paths.device, OpenMode::Blocking)?;
        let per_sample = timing.per_sample_deadline(timing.rate_fast_period_ms);
        let samples = collect_samples(&session, count, per_sample, log).await?;
        Ok(samples.map(|s| s.iter().map(|sample| sample.temp_mc).collect()))
    }
}

/// Ramp verdict: every step non-decreasing, except a drop from at or above
/// `wrap_high` down to at or below `wrap_low`, which counts as wraparound.
fn check_ramp_sequence(temps: &[i32], wrap_high: i32, wrap_low: i32) -> Result<(), String> {
    for pair in temps.windows(2) {
        let (prev, cur) = (pair[0], pair[1]);
        if cur >= prev {
            continue;
        }
        if prev >= wrap_high && cur <= wrap_low {
            continue;
        }
        return Err(format!("non-monotonic step {prev} -> {cur} mC"));
    }
    Ok(())
}

/// Noisy verdict: no more than `max_run` identical consecutive readings.
fn check_noisy_sequence(temps: &[i32], max_run: u32) -> Result<(), String> {
    let mut run = 1u32;
    for pair in temps.windows(2) {
        if pair[1] == pair[0] {
            run += 1;
            if run > max_run {
                return Err(format!(
                    "{run} consecutive identical readings of {} mC",
                    pair[0]
                ));
            }
        } else {
            run = 1;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonic_ramp_passes() {
        assert!(check_ramp_sequence(&[100, 200, 300, 300, 400], 90_000, 10_000).is_ok());
    }

    #[test]
    fn wraparound_drop_is_accepted() {
        assert!(check_ramp_sequence(&[99_800, 99_900, 100, 200], 90_000, 10_000).is_ok());
    }

    #[test]
    fn mid_range_drop_fails() {
        let err = check_ramp_sequence(&[50_000, 49_900], 90_000, 10_000);
        assert!(err.is_err());
    }

    #[test]
    fn drop_landing_above_low_water_fails() {
        // Falls from the top but not to the bottom of range.
        assert!(check_ramp_sequence(&[99_900, 50_000], 90_000, 10_000).is_err());
    }

    #[test]
    fn bounded_repetition_passes() {
        assert!(check_noisy_sequence(&[1, 1, 2, 2, 3, 3], 2).is_ok());
    }

    #[test]
    fn run_of_three_fails() {
        assert!(check_noisy_sequence(&[5, 7, 7, 7, 8], 2).is_err());
    }

    #[test]
    fn single_sample_sequences_pass() {
        assert!(check_ramp_sequence(&[42], 90_000, 10_000).is_ok());
        assert!(check_noisy_sequence(&[42], 2).is_ok());
    }
}
