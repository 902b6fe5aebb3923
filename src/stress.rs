//! Background sampler for the concurrency stress check.
//!
//! [`BackgroundSampler`] owns a cancellable sampling task on the blocking
//! pool. The task opens its own non-blocking device handle (scoped to the
//! task's lifetime), then loops: a short bounded readiness wait, a sample
//! read when ready, repeat. The short wait slice doubles as the
//! cancellation poll interval, so a cancel request is observed within one
//! slice and shutdown completes inside the caller's grace period.
//!
//! Transient "no data yet" reads are retried silently. Any other I/O error
//! is fatal: the task records it, requests its own cancellation so the
//! foreground can stop early, and exits.

use crate::device::{DeviceSession, OpenMode, Readiness};
use crate::error::HarnessResult;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// What the background task observed over its lifetime.
#[derive(Debug, Clone)]
pub struct SamplerReport {
    /// Successfully read and decoded samples.
    pub reads: u64,
    /// Readiness waits that elapsed without data (expected under a slow
    /// sampling period; informational only).
    pub idle_polls: u64,
    /// First fatal error, if any. A report with `fatal` set fails the
    /// stress check.
    pub fatal: Option<String>,
}

/// Handle to a running background sampling task.
pub struct BackgroundSampler {
    cancel: Arc<AtomicBool>,
    handle: tokio::task::JoinHandle<SamplerReport>,
}

impl BackgroundSampler {
    /// Spawn the sampler against the given device node.
    pub fn spawn(device: &Path, poll_slice: Duration) -> Self {
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);
        let device: PathBuf = device.to_path_buf();
        let handle =
            tokio::task::spawn_blocking(move || sampler_loop(&device, poll_slice, &flag));
        Self { cancel, handle }
    }

    /// Ask the task to stop. Idempotent.
    pub fn request_cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested, by the caller or by the
    /// task itself after a fatal error.
    pub fn cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Wait for the task to terminate, bounded by the grace period.
    ///
    /// Returns `None` if the task did not terminate in time (it is aborted
    /// on the way out); a task that panicked yields a report with a fatal
    /// entry.
    pub async fn join(self, grace: Duration) -> Option<SamplerReport> {
        match tokio::time::timeout(grace, self.handle).await {
            Ok(Ok(report)) => Some(report),
            Ok(Err(join_err)) => Some(SamplerReport {
                reads: 0,
                idle_polls: 0,
                fatal: Some(format!("sampler task panicked: {join_err}")),
            }),
            Err(_) => None,
        }
    }
}

fn sampler_loop(device: &Path, poll_slice: Duration, cancel: &AtomicBool) -> SamplerReport {
    let mut report = SamplerReport {
        reads: 0,
        idle_polls: 0,
        fatal: None,
    };

    let session = match DeviceSession::open(device, OpenMode::NonBlocking) {
        Ok(session) => session,
        Err(e) => {
            warn!("stress sampler could not open device: {e}");
            report.fatal = Some(e.to_string());
            cancel.store(true, Ordering::Relaxed);
            return report;
        }
    };

    while !cancel.load(Ordering::Relaxed) {
        if let Err(e) = sample_once(&session, poll_slice, &mut report) {
            warn!("stress sampler fatal error: {e}");
            report.fatal = Some(e.to_string());
            cancel.store(true, Ordering::Relaxed);
            break;
        }
    }

    debug!(
        reads = report.reads,
        idle_polls = report.idle_polls,
        "stress sampler finished"
    );
    report
}

fn sample_once(
    session: &DeviceSession,
    poll_slice: Duration,
    report: &mut SamplerReport,
) -> HarnessResult<()> {
    match session.wait_readable_blocking(poll_slice)? {
        Readiness::Ready => match session.read_sample()? {
            Some(_) => report.reads += 1,
            // EAGAIN between readiness and read; retry next slice.
            None => report.idle_polls += 1,
        },
        Readiness::TimedOut => report.idle_polls += 1,
        Readiness::DeviceError => {
            return Err(crate::error::HarnessError::Io(std::io::Error::other(
                "device signaled error/hangup during stress sampling",
            )))
        }
    }
    Ok(())
}
