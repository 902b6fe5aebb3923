//! Sample record codec.
//!
//! The device delivers fixed-size binary records, 16 bytes little-endian:
//! an 8-byte unsigned monotonic timestamp in nanoseconds, a 4-byte signed
//! temperature in milli-degrees Celsius, and a 4-byte flags bitset. Decoding
//! is strict: anything other than exactly 16 bytes is an error, never a
//! silent truncation.

use crate::error::{HarnessError, HarnessResult};

/// Wire size of one sample record in bytes.
pub const SAMPLE_SIZE: usize = 16;

/// Flag bit: this record carries a fresh reading.
pub const FLAG_NEW: u32 = 1 << 0;
/// Flag bit: the reading exceeded the configured threshold.
pub const FLAG_THRESHOLD_HIGH: u32 = 1 << 1;

/// One decoded temperature sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    /// Monotonic timestamp in nanoseconds, as reported by the device.
    pub timestamp_ns: u64,
    /// Temperature in milli-degrees Celsius.
    pub temp_mc: i32,
    /// Flags bitset; see [`FLAG_NEW`] and [`FLAG_THRESHOLD_HIGH`].
    pub flags: u32,
}

impl Sample {
    /// Decode one record from its 16-byte little-endian wire form.
    pub fn decode(raw: &[u8]) -> HarnessResult<Self> {
        if raw.len() != SAMPLE_SIZE {
            return Err(HarnessError::Decode(format!(
                "expected {} bytes, got {}",
                SAMPLE_SIZE,
                raw.len()
            )));
        }
        // Slice bounds established above; per-field conversion cannot fail.
        let mut ts = [0u8; 8];
        ts.copy_from_slice(&raw[0..8]);
        let mut temp = [0u8; 4];
        temp.copy_from_slice(&raw[8..12]);
        let mut flags = [0u8; 4];
        flags.copy_from_slice(&raw[12..16]);
        Ok(Self {
            timestamp_ns: u64::from_le_bytes(ts),
            temp_mc: i32::from_le_bytes(temp),
            flags: u32::from_le_bytes(flags),
        })
    }

    /// Whether the threshold-exceeded flag is set.
    pub fn is_alert(&self) -> bool {
        self.flags & FLAG_THRESHOLD_HIGH != 0
    }

    /// Temperature in degrees Celsius.
    pub fn temp_c(&self) -> f64 {
        f64::from(self.temp_mc) / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(timestamp_ns: u64, temp_mc: i32, flags: u32) -> Vec<u8> {
        let mut raw = Vec::with_capacity(SAMPLE_SIZE);
        raw.extend_from_slice(&timestamp_ns.to_le_bytes());
        raw.extend_from_slice(&temp_mc.to_le_bytes());
        raw.extend_from_slice(&flags.to_le_bytes());
        raw
    }

    #[test]
    fn decodes_little_endian_fields() {
        let raw = encode(1_700_000_123_456_789, 27_500, FLAG_NEW);
        let sample = Sample::decode(&raw).expect("decode");
        assert_eq!(sample.timestamp_ns, 1_700_000_123_456_789);
        assert_eq!(sample.temp_mc, 27_500);
        assert_eq!(sample.flags, FLAG_NEW);
        assert!(!sample.is_alert());
    }

    #[test]
    fn decodes_negative_temperature() {
        let raw = encode(42, -12_345, FLAG_NEW | FLAG_THRESHOLD_HIGH);
        let sample = Sample::decode(&raw).expect("decode");
        assert_eq!(sample.temp_mc, -12_345);
        assert!(sample.is_alert());
    }

    #[test]
    fn rejects_short_input() {
        let raw = encode(1, 1, 0);
        let err = Sample::decode(&raw[..15]);
        assert!(matches!(err, Err(HarnessError::Decode(_))));
    }

    #[test]
    fn rejects_long_input() {
        let mut raw = encode(1, 1, 0);
        raw.push(0);
        assert!(Sample::decode(&raw).is_err());
    }

    #[test]
    fn temp_c_scales_millidegrees() {
        let raw = encode(0, 27_500, 0);
        let sample = Sample::decode(&raw).expect("decode");
        assert!((sample.temp_c() - 27.5).abs() < f64::EPSILON);
    }
}
