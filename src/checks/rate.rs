//! TP1 — sampling rate verification.
//!
//! For a fast and a slow sampling period: set the period, let it settle,
//! snapshot the `updates` counter, wait a measured window, snapshot again.
//! The counter delta must lie within ±1 of `window / period`. A short
//! coherence sub-check then reads a handful of consecutive samples through
//! readiness-gated reads, each bounded by a per-sample deadline of twice
//! the period plus a fixed margin.

use super::{collect_samples, finish_with_restore};
use crate::device::{DeviceSession, OpenMode};
use crate::error::HarnessResult;
use crate::report::{TestLog, TestOutcome};
use crate::suite::{TestCase, TestContext};
use crate::sysfs::ATTR_SAMPLING_MS;
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::sleep;

pub struct RateCheck;

#[async_trait]
impl TestCase for RateCheck {
    fn name(&self) -> &'static str {
        "tp1_rate"
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

impl RateCheck {
    async fn verify(&self, ctx: &TestContext, log: &mut TestLog) -> HarnessResult<bool> {
        let timing = &ctx.config.timing;
        let mut ok = true;

        for (period_ms, window_ms) in [
            (timing.rate_fast_period_ms, timing.rate_fast_window_ms),
            (timing.rate_slow_period_ms, timing.rate_slow_window_ms),
        ] {
            ok &= self.verify_period(ctx, log, period_ms, window_ms).await?;
        }

        ok &= self.verify_coherence(ctx, log).await?;
        Ok(ok)
    }

    /// Counter-delta check for one period/window pair.
    async fn verify_period(
        &self,
        ctx: &TestContext,
        log: &mut TestLog,
        period_ms: i64,
        window_ms: u64,
    ) -> HarnessResult<bool> {
        ctx.port.set_int(ATTR_SAMPLING_MS, period_ms)?;
        sleep(ctx.config.timing.settle()).await;

        let before = ctx.port.get_stats()?;
        if !before.is_readable() {
            log.fail(format!("stats unreadable before {period_ms} ms window"));
            return Ok(false);
        }
        sleep(Duration::from_millis(window_ms)).await;
        let after = ctx.port.get_stats()?;
        if !after.is_readable() {
            log.fail(format!("stats unreadable after {period_ms} ms window"));
            return Ok(false);
        }

        let delta = after.updates - before.updates;
        let expected = window_ms as i64 / period_ms.max(1);
        let within = (delta - expected).abs() <= 1;
        if within {
            log.note(format!(
                "period {period_ms} ms: {delta} updates over {window_ms} ms (expected {expected} +/- 1)"
            ));
        } else {
            log.fail(format!(
                "period {period_ms} ms: {delta} updates over {window_ms} ms, expected {expected} +/- 1"
            ));
        }
        Ok(within)
    }

    /// Readiness-gated consecutive reads at the fast period.
    async fn verify_coherence(&self, ctx: &TestContext, log: &mut TestLog) -> HarnessResult<bool> {
        let timing = &ctx.config.timing;
        ctx.port.set_int(ATTR_SAMPLING_MS, timing.rate_fast_period_ms)?;
        sleep(timing.settle()).await;

        let session = DeviceSession::open(&ctx.config.paths.device, OpenMode::Blocking)?;
        let per_sample = timing.per_sample_deadline(timing.rate_fast_period_ms);
        let Some(samples) =
            collect_samples(&session, timing.coherence_samples, per_sample, log).await?
        else {
            return Ok(false);
        };
        log.note(format!(
            "coherence: read {} consecutive samples, last {:.1} C",
            samples.len(),
            samples.last().map(|s| s.temp_c()).unwrap_or_default()
        ));
        Ok(true)
    }
}
