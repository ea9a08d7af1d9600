use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// The union of timestamp shapes the upstream candle producer may send.
///
/// The engine boundary (C5 gate 2) normalizes any of these into a single UTC
/// `DateTime<Utc>` before gating continues. Unparseable input becomes `None`
/// rather than an error: a candle with a bad timestamp still routes, it just
/// skips the gates that require one (I5, I4).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    EpochSecondsInt(i64),
    EpochSecondsFloat(f64),
    Iso(String),
    SecondsNanos { seconds: i64, nanos: u32 },
    Utc(DateTime<Utc>),
}

impl From<DateTime<Utc>> for RawTimestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        RawTimestamp::Utc(dt)
    }
}

/// Converts a heterogeneous timestamp into a UTC instant.
///
/// Returns `None` for anything that cannot be parsed; callers treat that as
/// "no timestamp" and skip the gates that depend on one.
#[must_use]
pub fn normalize_timestamp(raw: &RawTimestamp) -> Option<DateTime<Utc>> {
    match raw {
        RawTimestamp::Utc(dt) => Some(*dt),
        RawTimestamp::EpochSecondsInt(secs) => Utc.timestamp_opt(*secs, 0).single(),
        RawTimestamp::EpochSecondsFloat(secs) => {
            if !secs.is_finite() {
                return None;
            }
            let whole = secs.trunc() as i64;
            let nanos = ((secs.fract()) * 1_000_000_000.0).round() as u32;
            Utc.timestamp_opt(whole, nanos).single()
        }
        RawTimestamp::SecondsNanos { seconds, nanos } => {
            Utc.timestamp_opt(*seconds, *nanos).single()
        }
        RawTimestamp::Iso(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_epoch_int() {
        let raw = RawTimestamp::EpochSecondsInt(1_700_000_000);
        let ts = normalize_timestamp(&raw).unwrap();
        assert_eq!(ts.timestamp(), 1_700_000_000);
    }

    #[test]
    fn normalizes_epoch_float_with_subsecond() {
        let raw = RawTimestamp::EpochSecondsFloat(1_700_000_000.5);
        let ts = normalize_timestamp(&raw).unwrap();
        assert_eq!(ts.timestamp(), 1_700_000_000);
        assert_eq!(ts.timestamp_subsec_millis(), 500);
    }

    #[test]
    fn normalizes_iso_string() {
        let raw = RawTimestamp::Iso("2025-01-01T12:00:00Z".to_string());
        let ts = normalize_timestamp(&raw).unwrap();
        assert_eq!(ts.timestamp(), 1_735_732_800);
    }

    #[test]
    fn normalizes_seconds_nanos() {
        let raw = RawTimestamp::SecondsNanos {
            seconds: 1_700_000_000,
            nanos: 250_000_000,
        };
        let ts = normalize_timestamp(&raw).unwrap();
        assert_eq!(ts.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn rejects_garbage_iso() {
        let raw = RawTimestamp::Iso("not-a-date".to_string());
        assert!(normalize_timestamp(&raw).is_none());
    }

    #[test]
    fn rejects_non_finite_float() {
        let raw = RawTimestamp::EpochSecondsFloat(f64::NAN);
        assert!(normalize_timestamp(&raw).is_none());
    }
}
