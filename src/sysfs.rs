//! Sysfs configuration port.
//!
//! [`ConfigPort`] reads and writes the device's sysfs attributes as opaque
//! strings or integers: `sampling_ms`, `threshold_mc`, `mode`, and the
//! read-only `stats`. No client-side validation is applied beyond the mode
//! enumeration; boundary enforcement is the driver's job and is itself a
//! subject under test, so out-of-range values are passed straight through.
//!
//! Writes append a trailing newline, matching what sysfs stores expect.

use crate::config::DevicePaths;
use crate::error::{HarnessError, HarnessResult};
use crate::stats::StatsSnapshot;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Sampling period attribute name.
pub const ATTR_SAMPLING_MS: &str = "sampling_ms";
/// Alert threshold attribute name.
pub const ATTR_THRESHOLD_MC: &str = "threshold_mc";
/// Simulation mode attribute name.
pub const ATTR_MODE: &str = "mode";
/// Read-only statistics attribute name.
pub const ATTR_STATS: &str = "stats";

/// Device simulation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimMode {
    Normal,
    Noisy,
    Ramp,
}

impl SimMode {
    /// All valid modes, in the order the driver documents them.
    pub const ALL: [SimMode; 3] = [SimMode::Normal, SimMode::Noisy, SimMode::Ramp];
}

impl fmt::Display for SimMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SimMode::Normal => "normal",
            SimMode::Noisy => "noisy",
            SimMode::Ramp => "ramp",
        };
        f.write_str(name)
    }
}

impl FromStr for SimMode {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "normal" => Ok(SimMode::Normal),
            "noisy" => Ok(SimMode::Noisy),
            "ramp" => Ok(SimMode::Ramp),
            other => Err(HarnessError::ConfigRead {
                attr: ATTR_MODE.into(),
                reason: format!("unrecognized mode '{other}'"),
            }),
        }
    }
}

/// Mutable device configuration captured before a test case changes it.
///
/// Captured at the start of any test case that mutates configuration and
/// restored unconditionally before that case returns, on every exit path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigSnapshot {
    pub sampling_ms: i64,
    pub threshold_mc: i64,
    pub mode: SimMode,
}

/// Read/write access to the device's sysfs attribute files.
#[derive(Debug, Clone)]
pub struct ConfigPort {
    paths: DevicePaths,
}

impl ConfigPort {
    pub fn new(paths: DevicePaths) -> Self {
        Self { paths }
    }

    /// Read an attribute as a whitespace-trimmed string.
    pub fn get_string(&self, attr: &str) -> HarnessResult<String> {
        let path = self.paths.attr(attr);
        match std::fs::read_to_string(&path) {
            Ok(raw) => Ok(raw.trim().to_owned()),
            Err(e) => Err(HarnessError::ConfigRead {
                attr: attr.into(),
                reason: e.to_string(),
            }),
        }
    }

    /// Write an attribute as a string. The value is passed through verbatim
    /// apart from the trailing newline.
    pub fn set_string(&self, attr: &str, value: &str) -> HarnessResult<()> {
        let path = self.paths.attr(attr);
        debug!(attr, value, "sysfs write");
        std::fs::write(&path, format!("{value}\n")).map_err(|e| HarnessError::ConfigWrite {
            attr: attr.into(),
            reason: e.to_string(),
        })
    }

    /// Read an attribute and parse it as a signed integer.
    pub fn get_int(&self, attr: &str) -> HarnessResult<i64> {
        let raw = self.get_string(attr)?;
        raw.parse::<i64>().map_err(|e| HarnessError::ConfigRead {
            attr: attr.into(),
            reason: format!("'{raw}' is not an integer: {e}"),
        })
    }

    /// Write an integer attribute.
    pub fn set_int(&self, attr: &str, value: i64) -> HarnessResult<()> {
        self.set_string(attr, &value.to_string())
    }

    /// Read the current simulation mode.
    pub fn get_mode(&self) -> HarnessResult<SimMode> {
        self.get_string(ATTR_MODE)?.parse()
    }

    /// Set the simulation mode to a known-valid value.
    pub fn set_mode(&self, mode: SimMode) -> HarnessResult<()> {
        self.set_string(ATTR_MODE, &mode.to_string())
    }

    /// Read and parse the statistics attribute.
    ///
    /// An attribute that can be read but not parsed yields the unreadable
    /// sentinel snapshot rather than an error; a failed read is an error.
    pub fn get_stats(&self) -> HarnessResult<StatsSnapshot> {
        Ok(StatsSnapshot::parse(&self.get_string(ATTR_STATS)?))
    }

    /// Capture the three mutable attributes for later restoration.
    pub fn snapshot(&self) -> HarnessResult<ConfigSnapshot> {
        Ok(ConfigSnapshot {
            sampling_ms: self.get_int(ATTR_SAMPLING_MS)?,
            threshold_mc: self.get_int(ATTR_THRESHOLD_MC)?,
            mode: self.get_mode()?,
        })
    }

    /// Restore a previously captured configuration.
    ///
    /// Attempts all three attributes even if one fails; a failure on any of
    /// them is reported as a single [`HarnessError::Restore`] naming every
    /// attribute that could not be written back.
    pub fn restore(&self, snapshot: &ConfigSnapshot) -> HarnessResult<()> {
        let mut failed = Vec::new();
        if self.set_int(ATTR_SAMPLING_MS, snapshot.sampling_ms).is_err() {
            failed.push(ATTR_SAMPLING_MS);
        }
        if self.set_int(ATTR_THRESHOLD_MC, snapshot.threshold_mc).is_err() {
            failed.push(ATTR_THRESHOLD_MC);
        }
        if self.set_mode(snapshot.mode).is_err() {
            failed.push(ATTR_MODE);
        }
        if failed.is_empty() {
            Ok(())
        } else {
            Err(HarnessError::Restore(failed.join(", ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_round_trips_through_strings() {
        for mode in SimMode::ALL {
            let parsed: SimMode = mode.to_string().parse().expect("parse");
            assert_eq!(parsed, mode);
        }
    }

    #[test]
    fn mode_parse_trims_whitespace() {
        assert_eq!("ramp\n".parse::<SimMode>().expect("parse"), SimMode::Ramp);
    }

    #[test]
    fn unrecognized_mode_is_an_error() {
        assert!("plasma".parse::<SimMode>().is_err());
    }
}
