use std::borrow::Cow;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthChar;

pub const UNKNOWN_CITY: &str = "Unknown City";
pub const UNKNOWN_REGION: &str = "Unknown Region";
pub const UNKNOWN_COUNTRY: &str = "Unknown Country";

/// Approximate geographic position of a source address.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub city: String,
    pub region: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    /// Placeholder used whenever no geolocation data is available.
    pub fn unknown() -> Self {
        Self {
            city: UNKNOWN_CITY.to_string(),
            region: UNKNOWN_REGION.to_string(),
            country: UNKNOWN_COUNTRY.to_string(),
            latitude: 0.0,
            longitude: 0.0,
        }
    }

    pub fn is_unknown(&self) -> bool {
        *self == Self::unknown()
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::unknown()
    }
}

/// One recorded authentication try.
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    pub timestamp: DateTime<FixedOffset>,
    pub username: String,
    pub password: String,
    pub source_address: String,
    pub location: Location,
}

/// On-disk form of an [`Attempt`]. Field order and names are the audit log
/// schema and must not change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    #[serde(with = "rfc3339")]
    pub date: DateTime<FixedOffset>,
    pub user: String,
    pub password: String,
    pub ip_address: String,
    pub city: String,
    pub region: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl From<&Attempt> for AttemptRecord {
    fn from(a: &Attempt) -> Self {
        Self {
            date: a.timestamp,
            user: a.username.clone(),
            password: a.password.clone(),
            ip_address: a.source_address.clone(),
            city: a.location.city.clone(),
            region: a.location.region.clone(),
            country: a.location.country.clone(),
            latitude: a.location.latitude,
            longitude: a.location.longitude,
        }
    }
}

impl From<AttemptRecord> for Attempt {
    fn from(r: AttemptRecord) -> Self {
        Self {
            timestamp: r.date,
            username: r.user,
            password: r.password,
            source_address: r.ip_address,
            location: Location {
                city: r.city,
                region: r.region,
                country: r.country,
                latitude: r.latitude,
                longitude: r.longitude,
            },
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RecordParseError {
    #[error("empty record")]
    Empty,
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Serialize an attempt as a single JSON line (no trailing newline).
pub fn serialize_record(attempt: &Attempt) -> Result<String, serde_json::Error> {
    serde_json::to_string(&AttemptRecord::from(attempt))
}

pub fn parse_record(line: &str) -> Result<Attempt, RecordParseError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Err(RecordParseError::Empty);
    }
    let record: AttemptRecord = serde_json::from_str(line)?;
    Ok(record.into())
}

pub fn format_timestamp(ts: &DateTime<FixedOffset>) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

mod rfc3339 {
    use chrono::{DateTime, FixedOffset};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<FixedOffset>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<FixedOffset>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw).map_err(de::Error::custom)
    }
}

/// Fit `input` into exactly `width` terminal columns.
///
/// Shorter strings are right-padded with `fill`; longer ones are cut at the
/// last whole character that fits. A double-width character straddling the
/// boundary is dropped and the gap filled so columns stay aligned.
pub fn pad_column(input: &str, width: usize, fill: char) -> String {
    let current = column_width(input);
    if current == width {
        return input.to_string();
    }
    if current < width {
        let mut out = String::with_capacity(input.len() + (width - current));
        out.push_str(input);
        out.extend(std::iter::repeat(fill).take(width - current));
        return out;
    }

    let mut out = String::with_capacity(input.len());
    let mut used = 0usize;
    for ch in input.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.extend(std::iter::repeat(fill).take(width - used));
    out
}

/// Terminal columns taken by `input`, counting control characters as zero.
pub fn column_width(input: &str) -> usize {
    input.chars().map(|c| c.width().unwrap_or(0)).sum()
}

/// Escape control characters so attacker input cannot move the cursor or
/// change terminal modes when rendered.
pub fn display_safe(input: &str) -> Cow<'_, str> {
    if !input.chars().any(char::is_control) {
        return Cow::Borrowed(input);
    }
    let mut out = String::with_capacity(input.len() + 8);
    for ch in input.chars() {
        if ch.is_control() {
            out.extend(ch.escape_default());
        } else {
            out.push(ch);
        }
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample(user: &str, password: &str) -> Attempt {
        Attempt {
            timestamp: DateTime::parse_from_rfc3339("2024-03-01T12:30:45+01:00").unwrap(),
            username: user.to_string(),
            password: password.to_string(),
            source_address: "203.0.113.5".to_string(),
            location: Location::unknown(),
        }
    }

    #[test]
    fn record_fields_are_in_schema_order() {
        let line = serialize_record(&sample("admin", "123456")).unwrap();
        assert_eq!(
            line,
            r#"{"date":"2024-03-01T12:30:45+01:00","user":"admin","password":"123456","ip_address":"203.0.113.5","city":"Unknown City","region":"Unknown Region","country":"Unknown Country","latitude":0.0,"longitude":0.0}"#
        );
    }

    #[test]
    fn sentinel_survives_serialize_and_parse() {
        let attempt = sample("", "");
        let parsed = parse_record(&serialize_record(&attempt).unwrap()).unwrap();
        assert!(parsed.location.is_unknown());
        assert_eq!(parsed, attempt);
    }

    #[test]
    fn hostile_strings_stay_one_valid_line() {
        let attempt = sample("ad\"min\n", "pw\\\",\"x\":1}\u{1b}[2J");
        let line = serialize_record(&attempt).unwrap();
        assert!(!line.contains('\n'));
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["user"], "ad\"min\n");
        assert_eq!(value["password"], "pw\\\",\"x\":1}\u{1b}[2J");
        assert_eq!(value.as_object().unwrap().len(), 9);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(parse_record(""), Err(RecordParseError::Empty)));
        assert!(matches!(parse_record("{\"user\":1}"), Err(RecordParseError::Json(_))));
        assert!(parse_record("not json").is_err());
    }

    #[test]
    fn pad_column_pads_short_input() {
        assert_eq!(pad_column("root", 8, ' '), "root    ");
        assert_eq!(pad_column("", 3, '.'), "...");
    }

    #[test]
    fn pad_column_leaves_exact_width_alone() {
        assert_eq!(pad_column("abcd", 4, ' '), "abcd");
    }

    #[test]
    fn pad_column_truncates_long_input() {
        assert_eq!(pad_column("administrator", 5, ' '), "admin");
    }

    #[test]
    fn pad_column_handles_wide_characters() {
        // each ideograph is two columns wide
        assert_eq!(pad_column("管理者", 5, ' '), "管理 ");
        assert_eq!(pad_column("管理", 6, '-'), "管理--");
    }

    #[test]
    fn display_safe_escapes_controls() {
        assert_eq!(display_safe("plain"), "plain");
        assert_eq!(display_safe("a\nb\u{1b}"), "a\\nb\\u{1b}");
    }

    proptest! {
        #[test]
        fn pad_column_is_always_exact_width(s in ".{0,40}", width in 0usize..32) {
            let out = pad_column(&display_safe(&s), width, ' ');
            prop_assert_eq!(column_width(&out), width);
        }

        #[test]
        fn any_credentials_round_trip(user in ".*", password in ".*") {
            let attempt = sample(&user, &password);
            let line = serialize_record(&attempt).unwrap();
            prop_assert!(!line.contains('\n'));
            prop_assert_eq!(parse_record(&line).unwrap(), attempt);
        }
    }
}
