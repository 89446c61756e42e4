/// Timezone handling for connections and results.

use crate::core::{DbalError, Result};
use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use std::str::FromStr;

/// A timezone setting: the host's local zone or a fixed UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeZoneSpec {
    #[default]
    Local,
    Fixed(FixedOffset),
}

impl TimeZoneSpec {
    pub fn utc() -> Self {
        TimeZoneSpec::Fixed(Utc.fix())
    }

    /// Re-expresses an instant in this zone.
    pub fn convert<Tz: TimeZone>(&self, value: &DateTime<Tz>) -> DateTime<FixedOffset> {
        match self {
            TimeZoneSpec::Local => {
                let local = value.with_timezone(&Local);
                local.with_timezone(local.offset())
            }
            TimeZoneSpec::Fixed(offset) => value.with_timezone(offset),
        }
    }

    /// Interprets a wall-clock time in this zone.
    ///
    /// Ambiguous local times resolve to the earliest instant; times skipped
    /// by a DST transition yield `None`.
    pub fn from_naive(&self, naive: &NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        match self {
            TimeZoneSpec::Local => Local
                .from_local_datetime(naive)
                .earliest()
                .map(|dt| dt.with_timezone(dt.offset())),
            TimeZoneSpec::Fixed(offset) => offset.from_local_datetime(naive).single(),
        }
    }
}

impl FromStr for TimeZoneSpec {
    type Err = DbalError;

    /// Accepts `local`, `UTC`/`Z` or an offset such as `+02:00`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("local") {
            return Ok(TimeZoneSpec::Local);
        }
        if s.eq_ignore_ascii_case("utc") || s == "Z" {
            return Ok(TimeZoneSpec::utc());
        }
        s.parse::<FixedOffset>()
            .map(TimeZoneSpec::Fixed)
            .map_err(|_| DbalError::Config(format!("Unrecognized timezone '{}'", s)))
    }
}

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// Parses the textual date-time forms SQLite applications commonly store.
///
/// Values with an explicit offset are absolute; naive values are interpreted
/// in `naive_zone`.
pub fn parse_datetime(text: &str, naive_zone: &TimeZoneSpec) -> Option<DateTime<FixedOffset>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt);
    }
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return naive_zone.from_naive(&naive);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .and_then(|naive| naive_zone.from_naive(&naive))
}

/// Converts a Unix timestamp (seconds, possibly fractional) to an instant.
pub fn from_unix_timestamp(seconds: f64) -> Option<DateTime<FixedOffset>> {
    if !seconds.is_finite() {
        return None;
    }
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9).round() as u32;
    Utc.timestamp_opt(whole as i64, nanos.min(999_999_999))
        .single()
        .map(|dt| dt.fixed_offset())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timezone_spec() {
        assert_eq!("local".parse::<TimeZoneSpec>().unwrap(), TimeZoneSpec::Local);
        assert_eq!("UTC".parse::<TimeZoneSpec>().unwrap(), TimeZoneSpec::utc());
        assert_eq!(
            "+02:00".parse::<TimeZoneSpec>().unwrap(),
            TimeZoneSpec::Fixed(FixedOffset::east_opt(7200).unwrap())
        );
        assert_eq!(
            "-0530".parse::<TimeZoneSpec>().unwrap(),
            TimeZoneSpec::Fixed(FixedOffset::west_opt(5 * 3600 + 1800).unwrap())
        );
        assert!("Mars/Olympus".parse::<TimeZoneSpec>().is_err());
        assert!("+25:00".parse::<TimeZoneSpec>().is_err());
        assert_eq!(
            "+05:30".parse::<TimeZoneSpec>().unwrap(),
            TimeZoneSpec::Fixed(FixedOffset::east_opt(19_800).unwrap())
        );
    }

    #[test]
    fn test_parse_naive_uses_given_zone() {
        let zone = "+01:00".parse::<TimeZoneSpec>().unwrap();
        let dt = parse_datetime("2020-01-02 03:04:05", &zone).unwrap();
        assert_eq!(dt.to_rfc3339(), "2020-01-02T03:04:05+01:00");

        let date_only = parse_datetime("2020-01-02", &zone).unwrap();
        assert_eq!(date_only.to_rfc3339(), "2020-01-02T00:00:00+01:00");
    }

    #[test]
    fn test_parse_absolute_ignores_zone() {
        let zone = TimeZoneSpec::utc();
        let dt = parse_datetime("2020-01-02T03:04:05+02:00", &zone).unwrap();
        assert_eq!(dt.offset().local_minus_utc(), 7200);

        let spaced = parse_datetime("2020-01-02 03:04:05.250+02:00", &zone).unwrap();
        assert_eq!(spaced.timestamp_subsec_millis(), 250);

        assert!(parse_datetime("not a date", &zone).is_none());
    }

    #[test]
    fn test_convert_to_fixed_zone() {
        let zone = "-03:00".parse::<TimeZoneSpec>().unwrap();
        let instant = Utc.with_ymd_and_hms(2020, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(zone.convert(&instant).to_rfc3339(), "2020-06-01T09:00:00-03:00");
    }

    #[test]
    fn test_unix_timestamp() {
        let dt = from_unix_timestamp(86_400.5).unwrap();
        assert_eq!(dt.timestamp(), 86_400);
        assert_eq!(dt.timestamp_subsec_millis(), 500);
        assert!(from_unix_timestamp(f64::NAN).is_none());
    }
}
