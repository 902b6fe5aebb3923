//! Live sample monitor.
//!
//! Polls the device for ordinary and high-priority readiness, reads and
//! decodes each fresh sample, and prints one line per sample until Ctrl+C.
//! The wait runs in short bounded slices so the interrupt is observed
//! promptly instead of parking inside an unbounded poll.

use crate::config::HarnessConfig;
use crate::device::{DeviceSession, OpenMode, Readiness};
use crate::error::HarnessResult;
use crate::sample::Sample;
use nix::poll::PollFlags;
use std::time::Duration;
use tracing::warn;

/// Poll slice; bounds how long a Ctrl+C can go unnoticed.
const POLL_SLICE: Duration = Duration::from_millis(500);

/// Watch and print samples until interrupted or the device errors out.
pub async fn watch(config: &HarnessConfig) -> HarnessResult<()> {
    let session = DeviceSession::open(&config.paths.device, OpenMode::Blocking)?;
    println!(
        "Watching {} (Ctrl+C to stop)...",
        config.paths.device.display()
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!();
                println!("Stopped.");
                return Ok(());
            }
            waited = session.wait_any(POLL_SLICE) => {
                match waited? {
                    (Readiness::Ready, revents) => {
                        let alert_event = revents.contains(PollFlags::POLLPRI);
                        if let Some(sample) = session.read_sample()? {
                            print_sample(&sample, alert_event);
                        }
                    }
                    (Readiness::TimedOut, _) => {}
                    (Readiness::DeviceError, revents) => {
                        warn!(?revents, "device error/hangup event");
                        println!("Device error; stopping.");
                        return Ok(());
                    }
                }
            }
        }
    }
}

fn print_sample(sample: &Sample, alert_event: bool) {
    let now = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ");
    let alert = alert_event || sample.is_alert();
    println!(
        "{now} temp={:.1}C alert={}{}",
        sample.temp_c(),
        u8::from(alert),
        if alert { " ALERT" } else { "" }
    );
}
