//! Builders for the records and documents tests start from.

use chrono::{DateTime, TimeZone, Utc};

use almanac_core::types::RequestContext;
use almanac_db::db::enums::{ContentStatus, Repeat};
use almanac_db::db::store::CalendarStore;
use almanac_db::error::DbResult;
use almanac_db::model::category::{EventCategory, NewEventCategory};
use almanac_db::model::event::{Event, NewEvent};
use almanac_db::model::occurrence::{NewOccurrence, Occurrence};
use almanac_interchange::discovery::alternate_link_tag;

pub const SITE_ID: i32 = 1;

/// ## Panics
/// Panics for a date or time that does not exist.
#[must_use]
pub fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    match Utc.with_ymd_and_hms(year, month, day, hour, minute, 0).single() {
        Some(timestamp) => timestamp,
        None => panic!("no such fixture timestamp: {year}-{month}-{day} {hour}:{minute}"),
    }
}

/// A request by a fresh user of [`SITE_ID`] evaluated at `now`.
#[must_use]
pub fn context_at(now: DateTime<Utc>) -> RequestContext {
    RequestContext::new(SITE_ID, uuid::Uuid::now_v7(), now)
}

/// A published event of [`SITE_ID`] whose slug is derived from `title`.
#[must_use]
pub fn published_event(title: &str) -> NewEvent {
    let mut event = NewEvent::draft(SITE_ID, uuid::Uuid::now_v7(), title);
    event.slug = almanac_core::util::slug::generate_slug(title, "event");
    event.status = ContentStatus::Published;
    event
}

/// ## Errors
/// Returns the store's error if an insert fails.
pub async fn seed_event<S: CalendarStore>(
    store: &mut S,
    event: NewEvent,
    category_ids: &[uuid::Uuid],
) -> DbResult<Event> {
    let event = store.insert_event(event).await?;
    if !category_ids.is_empty() {
        store.link_event_categories(event.id, category_ids).await?;
    }
    Ok(event)
}

/// ## Errors
/// Returns the store's error if the insert fails.
pub async fn seed_occurrence<S: CalendarStore>(
    store: &mut S,
    event_id: uuid::Uuid,
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
    repeat: Option<Repeat>,
    repeat_until: Option<DateTime<Utc>>,
) -> DbResult<Occurrence> {
    store
        .insert_occurrence(NewOccurrence::new(event_id, start, end, repeat, repeat_until))
        .await
}

/// ## Errors
/// Returns the store's error if the insert fails.
pub async fn seed_category<S: CalendarStore>(
    store: &mut S,
    title: &str,
    slug: &str,
) -> DbResult<EventCategory> {
    store
        .create_category(NewEventCategory::new(SITE_ID, title, slug))
        .await
}

/// An event page whose head links to `json_href`.
#[must_use]
pub fn event_page(title: &str, json_href: &str) -> String {
    format!(
        "<html><head><title>{title}</title>\n{}\n</head><body><h1>{title}</h1></body></html>",
        alternate_link_tag(json_href)
    )
}
