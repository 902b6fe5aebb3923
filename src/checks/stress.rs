//! TP4 — concurrency stress.
//!
//! A background task samples the device through short bounded waits while
//! the foreground rewrites all three mutable attributes in rapid rotation
//! for a fixed duration. The shared state (one device plus its sysfs
//! surface) is deliberately accessed from both contexts without external
//! locking: surviving that is the property under test.
//!
//! Pass criteria: the background task reports no fatal I/O error and
//! terminates within the grace period once cancelled, and the foreground
//! records zero write errors.

use super::finish_with_restore;
use crate::error::HarnessResult;
use crate::report::{TestLog, TestOutcome};
use crate::stress::BackgroundSampler;
use crate::suite::{TestCase, TestContext};
use crate::sysfs::{SimMode, ATTR_SAMPLING_MS, ATTR_THRESHOLD_MC};
use async_trait::async_trait;
use std::time::{Duration, Instant};

/// Pause between write rotations.
const ROTATION_PAUSE: Duration = Duration::from_millis(10);

pub struct StressCheck;

#[async_trait]
impl TestCase for StressCheck {
    fn name(&self) -> &'static str {
        "tp4_stress"
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

impl StressCheck {
    async fn verify(&self, ctx: &TestContext, log: &mut TestLog) -> HarnessResult<bool> {
        let timing = &ctx.config.timing;
        let limits = &ctx.config.limits;
        let duration = Duration::from_millis(timing.stress_duration_ms);
        let grace = Duration::from_millis(timing.stress_grace_ms);

        let sampling_values = [limits.sampling_ms_min, 250, 1_000];
        let threshold_values = [limits.threshold_mc_min, 0, limits.threshold_mc_max];

        log.note(format!(
            "stressing for {duration:?}: background sampling + foreground reconfiguration"
        ));
        let sampler = BackgroundSampler::spawn(
            &ctx.config.paths.device,
            Duration::from_millis(timing.stress_poll_ms),
        );

        let deadline = Instant::now() + duration;
        let mut rotations = 0u64;
        let mut write_errors = 0u32;
        while Instant::now() < deadline {
            // The sampler requests cancellation itself on a fatal error;
            // stop reconfiguring early in that case.
            if sampler.cancel_requested() {
                log.note("background sampler requested early stop");
                break;
            }
            let i = rotations as usize;
            if ctx
                .port
                .set_int(ATTR_SAMPLING_MS, sampling_values[i % sampling_values.len()])
                .is_err()
            {
                write_errors += 1;
            }
            if ctx
                .port
                .set_int(ATTR_THRESHOLD_MC, threshold_values[i % threshold_values.len()])
                .is_err()
            {
                write_errors += 1;
            }
            if ctx
                .port
                .set_mode(SimMode::ALL[i % SimMode::ALL.len()])
                .is_err()
            {
                write_errors += 1;
            }
            rotations += 1;
            tokio::time::sleep(ROTATION_PAUSE).await;
        }

        sampler.request_cancel();
        let Some(report) = sampler.join(grace).await else {
            log.fail(format!(
                "background sampler did not terminate within {grace:?}"
            ));
            return Ok(false);
        };

        log.note(format!(
            "foreground: {rotations} write rotations, {write_errors} write errors"
        ));
        log.note(format!(
            "background: {} reads, {} idle polls",
            report.reads, report.idle_polls
        ));

        let mut ok = true;
        if let Some(fatal) = report.fatal {
            log.fail(format!("background sampler fatal error: {fatal}"));
            ok = false;
        }
        if write_errors > 0 {
            log.fail(format!("{write_errors} configuration writes failed"));
            ok = false;
        }
        Ok(ok)
    }
}
