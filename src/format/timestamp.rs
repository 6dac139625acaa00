//! MessagePack timestamp extension support.
//!
//! Node timestamps travel as MessagePack extension type `-1`, the same
//! representation the other Engram SDKs emit. The encoder picks the smallest
//! of the three layouts:
//!
//! - 4 bytes: `u32` seconds, no nanoseconds
//! - 8 bytes: `u64` holding `nanos << 34 | seconds` (seconds fit in 34 bits)
//! - 12 bytes: `u32` nanoseconds followed by `i64` seconds
//!
//! Decoding also accepts RFC3339 strings.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// MessagePack extension type reserved for timestamps.
pub const TIMESTAMP_EXT_TYPE: i8 = -1;

/// A UTC instant stored as a MessagePack timestamp extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The current instant.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Build from Unix seconds and a nanosecond fraction.
    pub fn from_unix(secs: i64, nanos: u32) -> Result<Self> {
        DateTime::<Utc>::from_timestamp(secs, nanos)
            .map(Self)
            .ok_or_else(|| Error::InvalidTimestamp(format!("{}s {}ns out of range", secs, nanos)))
    }

    /// Parse an RFC3339 string.
    pub fn parse_rfc3339(s: &str) -> Result<Self> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| Self(dt.with_timezone(&Utc)))
            .map_err(|e| Error::InvalidTimestamp(format!("{}: {}", s, e)))
    }

    /// The wrapped chrono value.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Format as RFC3339 with nanosecond precision when present.
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }

    /// Encode into the extension payload.
    pub fn to_ext_bytes(&self) -> Vec<u8> {
        let secs = self.0.timestamp() as u64;
        let nanos = u64::from(self.0.timestamp_subsec_nanos());

        if secs >> 34 == 0 {
            let data = (nanos << 34) | secs;
            if data & 0xffff_ffff_0000_0000 == 0 {
                return (data as u32).to_be_bytes().to_vec();
            }
            return data.to_be_bytes().to_vec();
        }

        let mut buf = Vec::with_capacity(12);
        buf.extend_from_slice(&(nanos as u32).to_be_bytes());
        buf.extend_from_slice(&self.0.timestamp().to_be_bytes());
        buf
    }

    /// Decode an extension payload of 4, 8 or 12 bytes.
    pub fn from_ext_bytes(data: &[u8]) -> Result<Self> {
        match data.len() {
            4 => {
                let mut raw = [0u8; 4];
                raw.copy_from_slice(data);
                Self::from_unix(i64::from(u32::from_be_bytes(raw)), 0)
            }
            8 => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(data);
                let value = u64::from_be_bytes(raw);
                let nanos = (value >> 34) as u32;
                let secs = (value & 0x0000_0003_ffff_ffff) as i64;
                Self::from_unix(secs, nanos)
            }
            12 => {
                let mut nanos = [0u8; 4];
                let mut secs = [0u8; 8];
                nanos.copy_from_slice(&data[..4]);
                secs.copy_from_slice(&data[4..]);
                Self::from_unix(i64::from_be_bytes(secs), u32::from_be_bytes(nanos))
            }
            n => Err(Error::InvalidTimestamp(format!(
                "unsupported timestamp extension length {}",
                n
            ))),
        }
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_rfc3339())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        rmpv::Value::Ext(TIMESTAMP_EXT_TYPE, self.to_ext_bytes()).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match rmpv::Value::deserialize(deserializer)? {
            rmpv::Value::Ext(TIMESTAMP_EXT_TYPE, data) => {
                Self::from_ext_bytes(&data).map_err(D::Error::custom)
            }
            rmpv::Value::String(s) => match s.as_str() {
                Some(text) => Self::parse_rfc3339(text).map_err(D::Error::custom),
                None => Err(D::Error::custom("timestamp string is not valid UTF-8")),
            },
            other => Err(D::Error::custom(format!(
                "expected timestamp extension or RFC3339 string, found {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_layouts() {
        let whole = Timestamp::from_unix(1_700_000_000, 0).unwrap();
        assert_eq!(whole.to_ext_bytes().len(), 4);

        let fractional = Timestamp::from_unix(1_700_000_000, 500).unwrap();
        assert_eq!(fractional.to_ext_bytes().len(), 8);

        let far = Timestamp::from_unix(1 << 35, 7).unwrap();
        assert_eq!(far.to_ext_bytes().len(), 12);

        let before_epoch = Timestamp::from_unix(-10, 0).unwrap();
        assert_eq!(before_epoch.to_ext_bytes().len(), 12);
    }

    #[test]
    fn test_ext_bytes_roundtrip() {
        for ts in [
            Timestamp::from_unix(0, 0).unwrap(),
            Timestamp::from_unix(1_700_000_000, 123_456_789).unwrap(),
            Timestamp::from_unix(1 << 35, 999).unwrap(),
            Timestamp::from_unix(-86_400, 1).unwrap(),
        ] {
            assert_eq!(Timestamp::from_ext_bytes(&ts.to_ext_bytes()).unwrap(), ts);
        }
    }

    #[test]
    fn test_known_encoding() {
        // 4-byte form is big-endian seconds
        let ts = Timestamp::from_unix(1, 0).unwrap();
        assert_eq!(ts.to_ext_bytes(), vec![0, 0, 0, 1]);

        let bytes = rmp_serde::to_vec(&ts).unwrap();
        // fixext4, type -1, payload
        assert_eq!(bytes, vec![0xd6, 0xff, 0, 0, 0, 1]);
    }

    #[test]
    fn test_msgpack_roundtrip() {
        let ts = Timestamp::from_unix(1_700_000_000, 42).unwrap();
        let bytes = rmp_serde::to_vec(&ts).unwrap();
        let decoded: Timestamp = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(decoded, ts);
    }

    #[test]
    fn test_decode_rfc3339_string() {
        let bytes = rmp_serde::to_vec("2024-01-02T03:04:05Z").unwrap();
        let decoded: Timestamp = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(decoded.as_datetime().timestamp(), 1_704_164_645);
    }

    #[test]
    fn test_rejects_bad_payload() {
        assert!(Timestamp::from_ext_bytes(&[1, 2, 3]).is_err());

        let bytes = rmp_serde::to_vec(&42u32).unwrap();
        assert!(rmp_serde::from_slice::<Timestamp>(&bytes).is_err());
    }
}
