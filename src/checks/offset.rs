//! TP5 — read-offset contract verification.
//!
//! The sample stream is only defined at offset zero. A read requested at a
//! non-zero byte offset must either return zero bytes (end-of-data) or fail
//! with one of the documented "not seekable / invalid offset" errnos.
//! Returning sample data, or any other error, breaks the contract.
//!
//! This case mutates no configuration, so it has no capture/restore phase.

use crate::device::{DeviceSession, OffsetReadOutcome, OpenMode};
use crate::report::{TestLog, TestOutcome};
use crate::sample::SAMPLE_SIZE;
use crate::suite::{TestCase, TestContext};
use async_trait::async_trait;
use nix::errno::Errno;

/// Errnos a misc character device may legally return for a non-zero offset.
const ACCEPTED_ERRNOS: [Errno; 2] = [Errno::EINVAL, Errno::ESPIPE];

pub struct OffsetCheck;

#[async_trait]
impl TestCase for OffsetCheck {
    fn name(&self) -> &'static str {
        "tp5_read_offset"
    }

    async fn run(&self, ctx: &TestContext) -> TestOutcome {
        let mut log = TestLog::new(self.name());
        let passed = self.verify(ctx, &mut log);
        log.into_outcome(passed)
    }
}

impl OffsetCheck {
    fn verify(&self, ctx: &TestContext, log: &mut TestLog) -> bool {
        let offset = ctx.config.timing.offset_probe;
        let session = match DeviceSession::open(&ctx.config.paths.device, OpenMode::Blocking) {
            Ok(session) => session,
            Err(e) => {
                log.fail(format!("{e}"));
                return false;
            }
        };
        let outcome = session.read_at(offset as i64, SAMPLE_SIZE);
        classify(offset, outcome, log)
    }
}

/// Compare one offset-read outcome against the documented contract.
fn classify(offset: u64, outcome: OffsetReadOutcome, log: &mut TestLog) -> bool {
    match outcome {
        OffsetReadOutcome::Eof => {
            log.note(format!("read at offset {offset}: zero bytes (end-of-data)"));
            true
        }
        OffsetReadOutcome::Failed(errno) if ACCEPTED_ERRNOS.contains(&errno) => {
            log.note(format!("read at offset {offset}: rejected with {errno}"));
            true
        }
        OffsetReadOutcome::Failed(errno) => {
            log.fail(format!(
                "read at offset {offset}: unexpected errno {errno} (allowed: {ACCEPTED_ERRNOS:?})"
            ));
            false
        }
        OffsetReadOutcome::Data(n) => {
            log.fail(format!(
                "read at offset {offset}: returned {n} bytes of data"
            ));
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eof_and_documented_errnos_pass() {
        let mut log = TestLog::new("tp5_read_offset");
        assert!(classify(8, OffsetReadOutcome::Eof, &mut log));
        assert!(classify(8, OffsetReadOutcome::Failed(Errno::EINVAL), &mut log));
        assert!(classify(8, OffsetReadOutcome::Failed(Errno::ESPIPE), &mut log));
    }

    #[test]
    fn data_at_nonzero_offset_fails() {
        let mut log = TestLog::new("tp5_read_offset");
        assert!(!classify(8, OffsetReadOutcome::Data(16), &mut log));
    }

    #[test]
    fn undocumented_errno_fails() {
        let mut log = TestLog::new("tp5_read_offset");
        assert!(!classify(8, OffsetReadOutcome::Failed(Errno::EIO), &mut log));
    }
}
