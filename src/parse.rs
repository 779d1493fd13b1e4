//! Input-argument parsing helpers
//!
//! Timestamps, durations, identifiers and naming-convention conversions used
//! across the helper functions. Timestamps are always UTC; a naive input is
//! localized to UTC rather than rejected.

use crate::errors::{DasError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use uuid::Uuid;

/// Nanoseconds per second, the resolution of all trace-frame indices
pub const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Parses datetime-like input to a UTC timestamp.
///
/// Accepted shapes, tried in order:
/// - RFC 3339 / ISO 8601 with offset (`2021-01-01T12:00:00+02:00`)
/// - naive datetime (`2021-01-01 12:00:00`, `2021-01-01T12:00:00`,
///   optionally with fractional seconds), localized to UTC
/// - bare date (`2021-01-01`), midnight UTC
/// - integer string, nanoseconds since the UNIX epoch
pub fn parse_time(value: &str) -> Result<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }

    for format in [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        // NaiveDate always has a midnight
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }

    if let Ok(nanos) = value.parse::<i64>() {
        return Ok(time_from_nanos(nanos));
    }

    Err(DasError::ParseError {
        message: format!("Unable to parse '{}' as a timestamp", value),
    })
}

/// UTC timestamp from nanoseconds since the UNIX epoch
pub fn time_from_nanos(nanos: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_nanos(nanos)
}

/// Nanoseconds since the UNIX epoch for a UTC timestamp
pub fn time_to_nanos(time: &DateTime<Utc>) -> i64 {
    time.timestamp_nanos_opt().unwrap_or_else(|| {
        // Out of the representable range (year ~1677..2262); saturate
        if time.timestamp() < 0 {
            i64::MIN
        } else {
            i64::MAX
        }
    })
}

/// Parses a duration string like `"10s"`, `"1m"`, `"2h"`, `"500ms"` to
/// nanoseconds.
///
/// Units: `us`, `ms`, `s`, `m` (minutes), `h`, `d`. A bare integer is taken
/// as nanoseconds.
pub fn parse_timedelta(value: &str) -> Result<i64> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DasError::ParseError {
            message: "Empty duration string".to_string(),
        });
    }

    if let Ok(nanos) = value.parse::<i64>() {
        return Ok(nanos);
    }

    let split = value
        .find(|c: char| !c.is_ascii_digit() && c != '-')
        .unwrap_or(value.len());
    let (digits, unit) = value.split_at(split);

    let count: i64 = digits.parse().map_err(|_| DasError::ParseError {
        message: format!("Unable to parse duration '{}'", value),
    })?;

    let scale = match unit {
        "us" => 1_000,
        "ms" => 1_000_000,
        "s" => NANOS_PER_SEC,
        "m" | "min" => 60 * NANOS_PER_SEC,
        "h" => 3_600 * NANOS_PER_SEC,
        "d" => 86_400 * NANOS_PER_SEC,
        _ => {
            return Err(DasError::ParseError {
                message: format!("Unknown duration unit '{}' in '{}'", unit, value),
            })
        }
    };

    count.checked_mul(scale).ok_or_else(|| DasError::ParseError {
        message: format!("Duration '{}' overflows the nanosecond range", value),
    })
}

/// Parses a string expected to be a UUID, returning the canonical
/// hyphenated lowercase form.
pub fn parse_uuid(value: &str) -> Result<String> {
    let parsed = Uuid::parse_str(value.trim())?;
    Ok(parsed.hyphenated().to_string())
}

/// Whether the given string is a valid UUID
pub fn is_valid_uuid(value: &str) -> bool {
    parse_uuid(value).is_ok()
}

/// Converts camel case API naming conventions to snake case,
/// e.g. `"profileId"` to `"profile_id"`.
pub fn to_snake_case(camel_case: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();

    for c in camel_case.chars() {
        if !c.is_ascii_alphabetic() {
            continue;
        }
        if c.is_ascii_uppercase() && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        current.push(c.to_ascii_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }

    words.join("_")
}

/// Converts snake case naming conventions to camel case,
/// e.g. `"user_classifications"` to `"userClassifications"`.
pub fn to_camel_case(snake_case: &str) -> String {
    let mut result = String::with_capacity(snake_case.len());
    for segment in snake_case.split('_') {
        let mut chars = segment.chars();
        match chars.next() {
            Some(first) => {
                result.push(first.to_ascii_uppercase());
                result.extend(chars);
            }
            None => continue,
        }
    }

    let mut chars = result.chars();
    match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => result,
    }
}
