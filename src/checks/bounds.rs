//! TP3 — boundary and idempotence verification.
//!
//! For each writable integer attribute: writes one unit outside the
//! documented range must either be rejected outright or leave the readable
//! value unchanged; writes exactly at the range edges must succeed and
//! read back exactly. An unrecognized mode string must leave the mode
//! unchanged, while a different valid mode must take effect. The read-only
//! statistics attribute must reject writes.
//!
//! No validation happens harness-side before the probe writes: boundary
//! enforcement is the property under test.

use super::finish_with_restore;
use crate::error::HarnessResult;
use crate::report::{TestLog, TestOutcome};
use crate::suite::{TestCase, TestContext};
use crate::sysfs::{SimMode, ATTR_MODE, ATTR_SAMPLING_MS, ATTR_STATS, ATTR_THRESHOLD_MC};
use async_trait::async_trait;

/// Mode string the driver should not recognize.
const BOGUS_MODE: &str = "plasma";

pub struct BoundsCheck;

#[async_trait]
impl TestCase for BoundsCheck {
    fn name(&self) -> &'static str {
        "tp3_bounds"
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
        let verdict = self.verify(ctx, &mut log);
        let passed = finish_with_restore(&ctx.port, &snapshot, &mut log, verdict);
        log.into_outcome(passed)
    }
}

impl BoundsCheck {
    fn verify(&self, ctx: &TestContext, log: &mut TestLog) -> HarnessResult<bool> {
        let limits = &ctx.config.limits;
        let mut ok = true;
        ok &= self.probe_int_attr(
            ctx,
            log,
            ATTR_SAMPLING_MS,
            limits.sampling_ms_min,
            limits.sampling_ms_max,
        )?;
        ok &= self.probe_int_attr(
            ctx,
            log,
            ATTR_THRESHOLD_MC,
            limits.threshold_mc_min,
            limits.threshold_mc_max,
        )?;
        ok &= self.probe_mode(ctx, log)?;
        ok &= self.probe_stats_read_only(ctx, log);
        Ok(ok)
    }

    /// Out-of-range and edge probes for one integer attribute.
    fn probe_int_attr(
        &self,
        ctx: &TestContext,
        log: &mut TestLog,
        attr: &str,
        min: i64,
        max: i64,
    ) -> HarnessResult<bool> {
        let mut ok = true;

        for invalid in [min - 1, max + 1] {
            let before = ctx.port.get_int(attr)?;
            match ctx.port.set_int(attr, invalid) {
                Err(_) => log.note(format!("{attr}: write {invalid} rejected")),
                Ok(()) => {
                    let now = ctx.port.get_int(attr)?;
                    if now == before {
                        log.note(format!(
                            "{attr}: write {invalid} accepted but value unchanged ({before})"
                        ));
                    } else {
                        log.fail(format!(
                            "{attr}: out-of-range write {invalid} changed value {before} -> {now}"
                        ));
                        ok = false;
                    }
                }
            }
        }

        for edge in [min, max] {
            if let Err(e) = ctx.port.set_int(attr, edge) {
                log.fail(format!("{attr}: write of documented bound {edge} rejected: {e}"));
                ok = false;
                continue;
            }
            let now = ctx.port.get_int(attr)?;
            if now == edge {
                log.note(format!("{attr}: bound {edge} accepted and read back"));
            } else {
                log.fail(format!("{attr}: wrote bound {edge}, read back {now}"));
                ok = false;
            }
        }
        Ok(ok)
    }

    /// Invalid mode string must be a no-op; a valid switch must stick.
    fn probe_mode(&self, ctx: &TestContext, log: &mut TestLog) -> HarnessResult<bool> {
        let mut ok = true;
        let before = ctx.port.get_mode()?;

        // Outcome of the write itself does not matter; the readable value
        // must be unchanged either way.
        let write = ctx.port.set_string(ATTR_MODE, BOGUS_MODE);
        let now = ctx.port.get_mode()?;
        if now == before {
            log.note(format!(
                "mode: unrecognized '{BOGUS_MODE}' {} and mode unchanged ({before})",
                if write.is_ok() { "accepted" } else { "rejected" }
            ));
        } else {
            log.fail(format!(
                "mode: unrecognized '{BOGUS_MODE}' changed mode {before} -> {now}"
            ));
            ok = false;
        }

        let target = SimMode::ALL
            .into_iter()
            .find(|m| *m != before)
            .unwrap_or(SimMode::Normal);
        ctx.port.set_mode(target)?;
        let now = ctx.port.get_mode()?;
        if now == target {
            log.note(format!("mode: switch {before} -> {target} read back"));
        } else {
            log.fail(format!("mode: wrote {target}, read back {now}"));
            ok = false;
        }
        Ok(ok)
    }

    fn probe_stats_read_only(&self, ctx: &TestContext, log: &mut TestLog) -> bool {
        match ctx
            .port
            .set_string(ATTR_STATS, "updates=0 alerts=0 errors=0")
        {
            Err(_) => {
                log.note("stats: write rejected (read-only attribute)");
                true
            }
            Ok(()) => {
                log.fail("stats: write to read-only attribute was accepted");
                false
            }
        }
    }
}
