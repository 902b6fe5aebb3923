//! Statistics string parser.
//!
//! The read-only `stats` sysfs attribute reports whitespace-separated
//! `key=value` counters: `updates=<n> alerts=<n> errors=<n>`. A snapshot
//! where any token failed to parse is reported as unreadable: all three
//! counters are set to -1 so callers can tell "could not read" apart from a
//! legitimate zero.

/// Sentinel counter value marking an unreadable snapshot.
pub const UNREADABLE: i64 = -1;

/// Parsed device statistics counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub updates: i64,
    pub alerts: i64,
    pub errors: i64,
}

impl StatsSnapshot {
    /// Snapshot with all counters at the unreadable sentinel.
    pub fn unreadable() -> Self {
        Self {
            updates: UNREADABLE,
            alerts: UNREADABLE,
            errors: UNREADABLE,
        }
    }

    /// Whether this snapshot carries real counter values.
    pub fn is_readable(&self) -> bool {
        self.updates >= 0 && self.alerts >= 0 && self.errors >= 0
    }

    /// Parse a raw stats string.
    ///
    /// Any token that is not `key=<non-negative integer>` for a known key,
    /// or a missing key, yields [`StatsSnapshot::unreadable`].
    pub fn parse(raw: &str) -> Self {
        let mut updates = None;
        let mut alerts = None;
        let mut errors = None;

        for token in raw.split_whitespace() {
            let Some((key, value)) = token.split_once('=') else {
                return Self::unreadable();
            };
            let Ok(value) = value.parse::<i64>() else {
                return Self::unreadable();
            };
            if value < 0 {
                return Self::unreadable();
            }
            match key {
                "updates" => updates = Some(value),
                "alerts" => alerts = Some(value),
                "errors" => errors = Some(value),
                _ => return Self::unreadable(),
            }
        }

        match (updates, alerts, errors) {
            (Some(updates), Some(alerts), Some(errors)) => Self {
                updates,
                alerts,
                errors,
            },
            _ => Self::unreadable(),
        }
    }
}
