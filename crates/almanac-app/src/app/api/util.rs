use salvo::http::HeaderValue;
use salvo::{Depot, Request, Response};

use almanac_core::constants::{CALENDAR_ROUTE_PREFIX, EVENT_JSON_ROUTE_COMPONENT};

use crate::config::get_config_from_depot;

/// ## Summary
/// Returns the request origin, preferring the `Host` header and falling back to server config.
#[must_use]
pub fn request_origin(req: &Request, depot: &Depot) -> String {
    let scheme = if req.uri().scheme_str() == Some("https") {
        "https"
    } else {
        "http"
    };

    if let Some(host) = req
        .headers()
        .get("Host")
        .and_then(|h| h.to_str().ok())
        .filter(|h| !h.is_empty())
    {
        return format!("{scheme}://{host}");
    }

    match get_config_from_depot(depot) {
        Ok(settings) => settings.server.origin(),
        Err(e) => {
            tracing::warn!(error = %e, "Configuration missing; falling back to localhost origin");
            format!("{scheme}://localhost")
        }
    }
}

/// Path of an event's public detail page.
#[must_use]
pub fn event_detail_path(slug: &str) -> String {
    format!("{CALENDAR_ROUTE_PREFIX}/event/{slug}/")
}

/// Path of an event's JSON export.
#[must_use]
pub fn event_json_path(event_id: uuid::Uuid) -> String {
    format!("{CALENDAR_ROUTE_PREFIX}/event/{event_id}/{EVENT_JSON_ROUTE_COMPONENT}/")
}

/// Path of the event list.
#[must_use]
pub fn list_path() -> String {
    format!("{CALENDAR_ROUTE_PREFIX}/list/")
}

/// Path of a month grid.
#[must_use]
pub fn month_path(year: i32, month: u32) -> String {
    format!("{CALENDAR_ROUTE_PREFIX}/{year}/{month:02}/")
}

/// ## Summary
/// Sets a response header, skipping values that are not valid header text.
pub fn set_header(res: &mut Response, name: &'static str, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(header) => {
            #[expect(
                clippy::let_underscore_must_use,
                reason = "Header addition failure is non-fatal"
            )]
            let _ = res.add_header(name, header, true);
        }
        Err(e) => tracing::warn!(header = name, error = %e, "Invalid header value"),
    }
}

/// ## Summary
/// Checks `If-None-Match` header for conditional GET.
///
/// Returns true if the request should be served with 304 Not Modified.
#[must_use]
pub fn check_if_none_match(req: &Request, etag: &str) -> bool {
    if let Some(if_none_match) = req.headers().get("If-None-Match")
        && let Ok(value) = if_none_match.to_str()
    {
        return value
            .split(',')
            .map(str::trim)
            .any(|candidate| candidate == etag || candidate == "*");
    }
    false
}
