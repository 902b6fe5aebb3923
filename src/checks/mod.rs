//! The six conformance test cases.
//!
//! Every case follows the same shape: capture the configuration it is about
//! to disturb, apply the exercising condition, observe the device against a
//! deadline, compare against the documented contract, restore the captured
//! configuration unconditionally, and return a [`crate::report::TestOutcome`].
//! The shared
//! epilogue lives in [`finish_with_restore`] so no exit path can skip
//! restoration.
//!
//! Fixed suite order: rate → alert delivery → bounds → stress → read
//! offset → modes.

use crate::device::{DeviceSession, Readiness};
use crate::error::HarnessResult;
use crate::report::TestLog;
use crate::sample::Sample;
use crate::suite::TestCase;
use crate::sysfs::{ConfigPort, ConfigSnapshot};
use std::sync::Arc;
use std::time::Duration;

pub mod alerts;
pub mod bounds;
pub mod modes;
pub mod offset;
pub mod rate;
pub mod stress;

/// The standard suite, in its fixed execution order.
pub fn standard_cases() -> Vec<Arc<dyn TestCase>> {
    vec![
        Arc::new(rate::RateCheck),
        Arc::new(alerts::AlertCheck),
        Arc::new(bounds::BoundsCheck),
        Arc::new(stress::StressCheck),
        Arc::new(offset::OffsetCheck),
        Arc::new(modes::ModeCheck),
    ]
}

/// Look up a single case by name or by its `tpN` shorthand.
pub fn case_by_name(name: &str) -> Option<Arc<dyn TestCase>> {
    let wanted = name.trim().to_ascii_lowercase();
    standard_cases().into_iter().find(|case| {
        let full = case.name();
        full == wanted || full.split('_').next() == Some(wanted.as_str())
    })
}

/// Merge a case's verdict with the unconditional configuration restore.
///
/// `verdict` is the body's result: `Ok(true)` pass, `Ok(false)` a check
/// failed (already logged), `Err` an abort. Restoration runs in every
/// branch; a restore failure downgrades the result to failed.
pub(crate) fn finish_with_restore(
    port: &ConfigPort,
    snapshot: &ConfigSnapshot,
    log: &mut TestLog,
    verdict: HarnessResult<bool>,
) -> bool {
    let mut passed = match verdict {
        Ok(passed) => passed,
        Err(e) => {
            log.fail(format!("aborted: {e}"));
            false
        }
    };
    match port.restore(snapshot) {
        Ok(()) => log.note(format!(
            "restored configuration (sampling={} ms, threshold={} mC, mode={})",
            snapshot.sampling_ms, snapshot.threshold_mc, snapshot.mode
        )),
        Err(e) => {
            log.fail(format!("{e}"));
            passed = false;
        }
    }
    passed
}

/// Read `count` consecutive samples through readiness-gated reads, each
/// bounded by `per_sample`. Returns `None` (with the failure logged) on any
/// timeout or device error; transient no-data reads are retried.
pub(crate) async fn collect_samples(
    session: &DeviceSession,
    count: u32,
    per_sample: Duration,
    log: &mut TestLog,
) -> HarnessResult<Option<Vec<Sample>>> {
    let mut samples = Vec::with_capacity(count as usize);
    while samples.len() < count as usize {
        match session.wait_readable(per_sample).await? {
            Readiness::Ready => {
                if let Some(sample) = session.read_sample()? {
                    samples.push(sample);
                }
            }
            Readiness::TimedOut => {
                log.fail(format!(
                    "no sample within {per_sample:?} (got {}/{count})",
                    samples.len()
                ));
                return Ok(None);
            }
            Readiness::DeviceError => {
                log.fail("device signaled error/hangup while collecting samples");
                return Ok(None);
            }
        }
    }
    Ok(Some(samples))
}
