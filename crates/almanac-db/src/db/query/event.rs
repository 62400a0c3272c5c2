//! Query builder functions for events.

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::db::enums::ContentStatus;
use crate::db::schema::{event, event_category_link};
use crate::model::occurrence::OccurrenceFilter;

/// ## Summary
/// Returns a query to select all events.
#[must_use]
pub fn all() -> event::BoxedQuery<'static, diesel::pg::Pg> {
    event::table.into_boxed()
}

/// ## Summary
/// Returns a query to find an event by ID.
#[must_use]
pub fn by_id(id: uuid::Uuid) -> event::BoxedQuery<'static, diesel::pg::Pg> {
    all().filter(event::id.eq(id))
}

/// ## Summary
/// Returns a query to find events of a site.
#[must_use]
pub fn for_site(site_id: i32) -> event::BoxedQuery<'static, diesel::pg::Pg> {
    all().filter(event::site_id.eq(site_id))
}

/// ## Summary
/// Returns a query to find an event by its slug within a site.
#[must_use]
pub fn by_slug(site_id: i32, slug: &str) -> event::BoxedQuery<'_, diesel::pg::Pg> {
    for_site(site_id).filter(event::slug.eq(slug))
}

/// ## Summary
/// Restricts a query to events published at `now`: published status, and a
/// publish/expiry window that contains `now` where set.
#[must_use]
pub fn published_at(
    query: event::BoxedQuery<'static, diesel::pg::Pg>,
    now: DateTime<Utc>,
) -> event::BoxedQuery<'static, diesel::pg::Pg> {
    query
        .filter(event::status.eq(ContentStatus::Published))
        .filter(event::publish_date.is_null().or(event::publish_date.le(now)))
        .filter(event::expiry_date.is_null().or(event::expiry_date.ge(now)))
}

/// ## Summary
/// Returns a query for the events whose occurrences pass `filter`.
#[must_use]
pub fn matching(filter: &OccurrenceFilter) -> event::BoxedQuery<'static, diesel::pg::Pg> {
    let mut query = for_site(filter.site_id);

    if let Some(now) = filter.published_at {
        query = published_at(query, now);
    }
    if let Some(featured) = filter.featured {
        query = query.filter(event::featured.eq(featured));
    }
    if let Some(event_id) = filter.event_id {
        query = query.filter(event::id.eq(event_id));
    }
    if !filter.category_ids.is_empty() {
        let linked = event_category_link::table
            .filter(event_category_link::category_id.eq_any(filter.category_ids.clone()))
            .select(event_category_link::event_id);
        query = query.filter(event::id.eq_any(linked));
    }

    query.order(event::id.asc())
}
