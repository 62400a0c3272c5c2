//! Human readable descriptions of occurrences and outbound links for them.

use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use reqwest::Url;

use almanac_core::error::CoreError;
use almanac_db::model::event::Event;
use almanac_db::model::occurrence::Occurrence;

use crate::error::ServiceResult;

const DATE_FORMAT: &str = "%b %-d, %Y";
const TIME_FORMAT: &str = "%-I:%M %p";
const DATE_TIME_FORMAT: &str = "%b %-d, %Y, %-I:%M %p";
const CALENDAR_TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";

const GOOGLE_CALENDAR_URL: &str = "https://www.google.com/calendar/event";
const DIRECTIONS_URL: &str = "https://maps.google.com/maps";

/// ## Summary
/// Describes the span from `start` to `end` in `tz`.
///
/// The end is rendered as a bare time when it falls on the same local day as the
/// start, and left out entirely when absent or equal to the start.
#[must_use]
pub fn duration_info(start: DateTime<Utc>, end: Option<DateTime<Utc>>, tz: Tz) -> String {
    let local_start = start.with_timezone(&tz);
    let mut info = local_start.format(DATE_TIME_FORMAT).to_string();

    if let Some(end) = end.filter(|end| *end != start) {
        let local_end = end.with_timezone(&tz);
        let format = if local_end.date_naive() == local_start.date_naive() {
            TIME_FORMAT
        } else {
            DATE_TIME_FORMAT
        };
        info.push_str(" to ");
        info.push_str(&local_end.format(format).to_string());
    }
    info
}

/// `"Repeats weekly"`, with `" until <date>"` when the repeat is bounded.
/// Empty for occurrences that do not repeat.
#[must_use]
pub fn repetition_info(occurrence: &Occurrence, tz: Tz) -> String {
    let Some(repeat) = occurrence.repeat else {
        return String::new();
    };
    let mut info = format!("Repeats {}", repeat.label().to_lowercase());
    if let Some(until) = occurrence.repeat_until {
        info.push_str(" until ");
        info.push_str(&until.with_timezone(&tz).format(DATE_FORMAT).to_string());
    }
    info
}

fn url_with_params<'a>(
    base: &str,
    params: impl IntoIterator<Item = (&'a str, String)>,
) -> ServiceResult<String> {
    let url = Url::parse_with_params(base, params)
        .map_err(|_e| CoreError::InvariantViolation("outbound link base is not a URL"))?;
    Ok(url.into())
}

/// ## Summary
/// Link to driving directions for `location`.
///
/// Returns `None` for a blank location.
///
/// ## Errors
/// Only fails if the fixed maps base URL cannot be parsed.
pub fn directions_url(location: &str) -> ServiceResult<Option<String>> {
    let location = location.trim();
    if location.is_empty() {
        return Ok(None);
    }
    url_with_params(DIRECTIONS_URL, [("daddr", location.to_string())]).map(Some)
}

/// ## Summary
/// A Google Calendar "add event" link for one occurrence of `event`.
///
/// `event_url` is the absolute URL of the event page and becomes the entry's
/// details. A point-in-time occurrence is given a one hour span. Repeating
/// occurrences carry their rule, bounded by the date of `repeat_until`.
///
/// ## Errors
/// Only fails if the fixed calendar base URL cannot be parsed.
pub fn calendar_link(
    event: &Event,
    occurrence: &Occurrence,
    event_url: &str,
) -> ServiceResult<String> {
    let end = occurrence
        .end
        .unwrap_or(occurrence.start + TimeDelta::hours(1));
    let dates = format!(
        "{}/{}",
        occurrence.start.format(CALENDAR_TIMESTAMP_FORMAT),
        end.format(CALENDAR_TIMESTAMP_FORMAT)
    );

    let mut params = vec![
        ("action", "TEMPLATE".to_string()),
        ("text", event.title.clone()),
        ("dates", dates),
        ("details", event_url.to_string()),
        ("location", event.location.replace(['\r', '\n'], " ")),
    ];
    if let Some(repeat) = occurrence.repeat {
        let mut recur = repeat.as_str().to_string();
        if let Some(until) = occurrence.repeat_until {
            recur.push_str(";UNTIL=");
            recur.push_str(&until.format("%Y%m%d").to_string());
        }
        params.push(("recur", recur));
    }

    url_with_params(GOOGLE_CALENDAR_URL, params)
}
