//! Device session: ownership of one open device descriptor.
//!
//! A [`DeviceSession`] wraps the character device node with deadline-bounded
//! readiness waits and fixed-offset sample reads. Ordinary readiness
//! (`POLLIN`) means a fresh sample is available; high-priority readiness
//! (`POLLPRI`) means a threshold alert is pending and must be cleared by a
//! read — callers are expected to read immediately after observing an alert.
//!
//! The descriptor is RAII-owned: dropping the session closes it exactly
//! once regardless of which exit path the owner takes. Waits are `nix::poll`
//! calls with bounded timeouts; the async wrappers run them on the blocking
//! pool so a waiting test case never parks a runtime worker. The blocking
//! variants exist for code that already lives on the blocking pool (the
//! stress sampler).

use crate::error::{HarnessError, HarnessResult};
use crate::sample::{Sample, SAMPLE_SIZE};
use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::sys::uio::pread;
use std::fs::{File, OpenOptions};
use std::os::fd::AsFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// How the device node is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Reads block until data is available (gated by readiness waits).
    Blocking,
    /// Reads return immediately; "no data yet" surfaces as a transient
    /// condition, not an error.
    NonBlocking,
}

/// Result of a deadline-bounded readiness wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// The requested condition is signaled.
    Ready,
    /// The deadline elapsed first.
    TimedOut,
    /// The device reported an error/hangup condition.
    DeviceError,
}

/// Outcome of a raw read at an explicit byte offset.
///
/// Errnos are data here, not failures: the read-offset check classifies
/// them against the documented contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetReadOutcome {
    /// The device returned zero bytes (end-of-data).
    Eof,
    /// The device returned sample data.
    Data(usize),
    /// The read failed with this errno.
    Failed(Errno),
}

/// Exclusive ownership of one open device descriptor.
#[derive(Debug)]
pub struct DeviceSession {
    file: Arc<File>,
    path: PathBuf,
}

impl DeviceSession {
    /// Open the device node.
    ///
    /// Fails with [`HarnessError::DeviceUnavailable`] when the node is
    /// absent or access is denied.
    pub fn open(path: &Path, mode: OpenMode) -> HarnessResult<Self> {
        let mut options = OpenOptions::new();
        options.read(true);
        if mode == OpenMode::NonBlocking {
            options.custom_flags(nix::fcntl::OFlag::O_NONBLOCK.bits());
        }
        let file = options
            .open(path)
            .map_err(|source| HarnessError::DeviceUnavailable {
                path: path.to_path_buf(),
                source,
            })?;
        trace!(path = %path.display(), ?mode, "device opened");
        Ok(Self {
            file: Arc::new(file),
            path: path.to_path_buf(),
        })
    }

    /// Path this session was opened on.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait until a fresh sample is readable, or the timeout elapses.
    pub async fn wait_readable(&self, timeout: Duration) -> HarnessResult<Readiness> {
        self.wait(PollFlags::POLLIN, timeout).await
    }

    /// Wait until a threshold alert is pending, or the timeout elapses.
    pub async fn wait_alert(&self, timeout: Duration) -> HarnessResult<Readiness> {
        self.wait(PollFlags::POLLPRI, timeout).await
    }

    async fn wait(&self, events: PollFlags, timeout: Duration) -> HarnessResult<Readiness> {
        let file = Arc::clone(&self.file);
        tokio::task::spawn_blocking(move || poll_fd(&file, events, timeout))
            .await
            .map_err(|e| HarnessError::Io(std::io::Error::other(e)))?
    }

    /// Blocking variant of [`wait_readable`](Self::wait_readable), for
    /// callers already running on the blocking pool.
    pub fn wait_readable_blocking(&self, timeout: Duration) -> HarnessResult<Readiness> {
        poll_fd(&self.file, PollFlags::POLLIN, timeout)
    }

    /// Wait for either ordinary or alert readiness. Used by the live
    /// monitor, which reacts to both. Returns the signaled flags on
    /// readiness.
    pub async fn wait_any(&self, timeout: Duration) -> HarnessResult<(Readiness, PollFlags)> {
        let file = Arc::clone(&self.file);
        let events = PollFlags::POLLIN | PollFlags::POLLPRI;
        tokio::task::spawn_blocking(move || poll_fd_revents(&file, events, timeout))
            .await
            .map_err(|e| HarnessError::Io(std::io::Error::other(e)))?
    }

    /// Read one sample record from offset zero.
    ///
    /// Returns `Ok(None)` when a non-blocking descriptor has no data yet
    /// (`EAGAIN`); that condition is transient and must be retried, never
    /// treated as a failure. A read shorter than one record is a
    /// [`HarnessError::ShortRead`].
    pub fn read_sample(&self) -> HarnessResult<Option<Sample>> {
        let mut buf = [0u8; SAMPLE_SIZE];
        match pread(self.file.as_fd(), &mut buf, 0) {
            Ok(n) if n == SAMPLE_SIZE => Sample::decode(&buf).map(Some),
            Ok(n) => Err(HarnessError::ShortRead {
                got: n,
                expected: SAMPLE_SIZE,
            }),
            Err(Errno::EAGAIN) => Ok(None),
            Err(e) => Err(HarnessError::Poll(e)),
        }
    }

    /// Read up to `len` bytes at an explicit byte offset.
    ///
    /// Only the read-offset check uses non-zero offsets; every other read
    /// goes through [`read_sample`](Self::read_sample).
    pub fn read_at(&self, offset: i64, len: usize) -> OffsetReadOutcome {
        let mut buf = vec![0u8; len];
        match pread(self.file.as_fd(), &mut buf, offset) {
            Ok(0) => OffsetReadOutcome::Eof,
            Ok(n) => OffsetReadOutcome::Data(n),
            Err(e) => OffsetReadOutcome::Failed(e),
        }
    }
}

/// One bounded poll on a descriptor. Timeouts are clamped to the `poll(2)`
/// millisecond range, minimum 1 ms so a zero remainder still yields to the
/// device once.
fn poll_fd(file: &File, events: PollFlags, timeout: Duration) -> HarnessResult<Readiness> {
    Ok(poll_fd_revents(file, events, timeout)?.0)
}

fn poll_fd_revents(
    file: &File,
    events: PollFlags,
    timeout: Duration,
) -> HarnessResult<(Readiness, PollFlags)> {
    let ms = timeout.as_millis().clamp(1, u128::from(u16::MAX)) as u16;
    let mut fds = [PollFd::new(file.as_fd(), events)];
    let n = poll(&mut fds, PollTimeout::from(ms))?;
    if n == 0 {
        return Ok((Readiness::TimedOut, PollFlags::empty()));
    }
    let revents = fds[0].revents().unwrap_or_else(PollFlags::empty);
    if revents.intersects(PollFlags::POLLERR | PollFlags::POLLHUP | PollFlags::POLLNVAL) {
        return Ok((Readiness::DeviceError, revents));
    }
    if revents.intersects(events) {
        return Ok((Readiness::Ready, revents));
    }
    Ok((Readiness::TimedOut, revents))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::{FLAG_NEW, SAMPLE_SIZE};
    use std::io::Write;

    fn sample_file(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(bytes).expect("write");
        file.flush().expect("flush");
        file
    }

    fn encoded_sample() -> Vec<u8> {
        let mut raw = Vec::with_capacity(SAMPLE_SIZE);
        raw.extend_from_slice(&42u64.to_le_bytes());
        raw.extend_from_slice(&27_500i32.to_le_bytes());
        raw.extend_from_slice(&FLAG_NEW.to_le_bytes());
        raw
    }

    #[test]
    fn open_missing_node_is_device_unavailable() {
        let err = DeviceSession::open(Path::new("/nonexistent/simtemp"), OpenMode::Blocking);
        assert!(matches!(
            err,
            Err(HarnessError::DeviceUnavailable { .. })
        ));
    }

    #[test]
    fn read_sample_decodes_record() {
        let file = sample_file(&encoded_sample());
        let session = DeviceSession::open(file.path(), OpenMode::Blocking).expect("open");
        let sample = session.read_sample().expect("read").expect("sample");
        assert_eq!(sample.timestamp_ns, 42);
        assert_eq!(sample.temp_mc, 27_500);
    }

    #[test]
    fn truncated_record_is_short_read() {
        let file = sample_file(&encoded_sample()[..8]);
        let session = DeviceSession::open(file.path(), OpenMode::Blocking).expect("open");
        assert!(matches!(
            session.read_sample(),
            Err(HarnessError::ShortRead { got: 8, .. })
        ));
    }

    #[test]
    fn read_at_reports_data_or_eof() {
        let file = sample_file(&encoded_sample());
        let session = DeviceSession::open(file.path(), OpenMode::Blocking).expect("open");
        // A regular file happily serves a non-zero offset.
        assert_eq!(session.read_at(8, 8), OffsetReadOutcome::Data(8));
        // Past the end it reports end-of-data.
        assert_eq!(session.read_at(64, 8), OffsetReadOutcome::Eof);
    }

    #[tokio::test]
    async fn regular_file_polls_ready() {
        let file = sample_file(&encoded_sample());
        let session = DeviceSession::open(file.path(), OpenMode::Blocking).expect("open");
        let readiness = session
            .wait_readable(Duration::from_millis(10))
            .await
            .expect("wait");
        assert_eq!(readiness, Readiness::Ready);
    }
}
