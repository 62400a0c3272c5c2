//! Timezone resolution and parsing of the date/time literals found in serialized records.

use chrono::{DateTime, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;
use std::str::FromStr;

use crate::error::{InterchangeError, InterchangeResult};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMATS: [&str; 2] = ["%H:%M:%S%.f", "%H:%M"];
const NAIVE_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// ## Summary
/// Resolves an IANA timezone name.
///
/// ## Errors
/// Returns `UnknownTimezone` if the name is not in the tz database.
pub fn resolve_timezone(name: &str) -> InterchangeResult<Tz> {
    Tz::from_str(name.trim()).map_err(|_e| InterchangeError::UnknownTimezone(name.to_string()))
}

/// ## Summary
/// Attaches `tz` to a wall-clock time.
///
/// Times repeated by a DST fold resolve to their earlier instant.
///
/// ## Errors
/// Returns `NonExistentTime` for wall-clock times skipped by a DST gap.
pub fn localize(naive: NaiveDateTime, tz: &Tz) -> InterchangeResult<DateTime<Tz>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt),
        LocalResult::Ambiguous(earliest, _latest) => Ok(earliest),
        LocalResult::None => Err(InterchangeError::NonExistentTime(format!(
            "{naive} in {tz}"
        ))),
    }
}

/// ## Errors
/// Returns `ParseError` unless `value` is a `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> InterchangeResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|e| InterchangeError::ParseError(format!("invalid date '{value}': {e}")))
}

/// ## Errors
/// Returns `ParseError` unless `value` is an `HH:MM[:SS[.ffffff]]` time of day.
pub fn parse_time(value: &str) -> InterchangeResult<NaiveTime> {
    let trimmed = value.trim();
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(trimmed, format).ok())
        .ok_or_else(|| InterchangeError::ParseError(format!("invalid time '{value}'")))
}

/// ## Summary
/// Combines a calendar date and an optional time of day into a timezone-aware timestamp.
///
/// An absent time of day means midnight.
///
/// ## Errors
/// Returns `ParseError` for malformed literals, or `NonExistentTime` when the
/// combined wall-clock time falls into a DST gap.
pub fn combine(day: &str, time_of_day: Option<&str>, tz: &Tz) -> InterchangeResult<DateTime<Tz>> {
    let date = parse_date(day)?;
    let time = match time_of_day {
        Some(value) => parse_time(value)?,
        None => NaiveTime::MIN,
    };
    localize(date.and_time(time), tz)
}

/// ## Summary
/// Parses a serialized timestamp.
///
/// Accepts RFC 3339 (`2024-06-01T10:00:00Z`, `2024-06-01T10:00:00+02:00`) and
/// naive date-times, which are interpreted in `tz`.
///
/// ## Errors
/// Returns `ParseError` if no accepted format matches.
pub fn parse_timestamp(value: &str, tz: &Tz) -> InterchangeResult<DateTime<Utc>> {
    let trimmed = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .ok_or_else(|| InterchangeError::ParseError(format!("invalid timestamp '{value}'")))?;
    Ok(localize(naive, tz)?.with_timezone(&Utc))
}

/// ## Summary
/// Formats a timestamp as ISO 8601 with a numeric offset (`2024-06-01T14:00:00+00:00`).
#[must_use]
pub fn to_isoformat<Z: TimeZone>(dt: &DateTime<Z>) -> String
where
    Z::Offset: std::fmt::Display,
{
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}
