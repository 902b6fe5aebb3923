//! TP2 — alert delivery verification.
//!
//! Forces the threshold far below any attainable reading so every sample
//! qualifies as a high alert, then counts high-priority readiness events
//! until the expected number arrives or the overall deadline elapses. Each
//! observed alert is immediately followed by a clearing read, which by
//! contract de-asserts the device's alert condition.

use super::finish_with_restore;
use crate::device::{DeviceSession, OpenMode, Readiness};
use crate::error::HarnessResult;
use crate::report::{TestLog, TestOutcome};
use crate::suite::{TestCase, TestContext};
use crate::sysfs::ATTR_THRESHOLD_MC;
use async_trait::async_trait;
use std::time::{Duration, Instant};

pub struct AlertCheck;

#[async_trait]
impl TestCase for AlertCheck {
    fn name(&self) -> &'static str {
        "tp2_alert_delivery"
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

impl AlertCheck {
    async fn verify(&self, ctx: &TestContext, log: &mut TestLog) -> HarnessResult<bool> {
        let timing = &ctx.config.timing;
        let expected = timing.alert_expected;
        let overall = Duration::from_millis(timing.alert_timeout_ms);

        log.note(format!(
            "forcing threshold to {} mC to trigger alerts",
            timing.alert_force_threshold_mc
        ));
        ctx.port
            .set_int(ATTR_THRESHOLD_MC, timing.alert_force_threshold_mc)?;

        // Non-blocking open so the clearing read can never stall the test.
        let session = DeviceSession::open(&ctx.config.paths.device, OpenMode::NonBlocking)?;
        let start = Instant::now();
        let mut observed = 0u32;

        while observed < expected {
            let Some(remaining) = overall.checked_sub(start.elapsed()) else {
                log.fail(format!(
                    "timed out after {overall:?}: observed {observed}/{expected} alerts"
                ));
                return Ok(false);
            };
            match session.wait_alert(remaining).await? {
                Readiness::Ready => {
                    observed += 1;
                    log.note(format!("alert detected ({observed}/{expected})"));
                    if !clear_alert(&session, log) {
                        return Ok(false);
                    }
                }
                Readiness::TimedOut => continue,
                Readiness::DeviceError => {
                    log.fail("device signaled error/hangup while waiting for alerts");
                    return Ok(false);
                }
            }
        }

        log.note(format!(
            "observed {observed} alerts in {:?}",
            start.elapsed()
        ));
        Ok(true)
    }
}

/// Perform the clearing read paired with an alert observation.
///
/// A transient no-data result (`Ok(None)`) is harmless on the non-blocking
/// descriptor. Anything else in the error branch is a real fault — a short
/// read, a decode failure, or a genuine errno — and a malformed sample
/// fails the case.
fn clear_alert(session: &DeviceSession, log: &mut TestLog) -> bool {
    match session.read_sample() {
        Ok(_) => true,
        Err(e) => {
            log.fail(format!("clearing read failed: {e}"));
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::{FLAG_THRESHOLD_HIGH, SAMPLE_SIZE};
    use std::io::Write;

    fn device_file(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(bytes).expect("write");
        file.flush().expect("flush");
        file
    }

    fn encoded_alert_sample() -> Vec<u8> {
        let mut raw = Vec::with_capacity(SAMPLE_SIZE);
        raw.extend_from_slice(&9u64.to_le_bytes());
        raw.extend_from_slice(&(-40_000i32).to_le_bytes());
        raw.extend_from_slice(&FLAG_THRESHOLD_HIGH.to_le_bytes());
        raw
    }

    #[test]
    fn clearing_read_of_full_record_succeeds() {
        let file = device_file(&encoded_alert_sample());
        let session = DeviceSession::open(file.path(), OpenMode::NonBlocking).expect("open");
        let mut log = TestLog::new("tp2_alert_delivery");
        assert!(clear_alert(&session, &mut log));
    }

    #[test]
    fn truncated_clearing_read_fails_the_case() {
        // Driver hands back 8 bytes instead of a full record.
        let file = device_file(&encoded_alert_sample()[..8]);
        let session = DeviceSession::open(file.path(), OpenMode::NonBlocking).expect("open");
        let mut log = TestLog::new("tp2_alert_delivery");
        assert!(!clear_alert(&session, &mut log));
        let outcome = log.into_outcome(false);
        assert!(outcome
            .diagnostics
            .iter()
            .any(|d| d.starts_with("FAIL:") && d.contains("clearing read")));
    }
}
