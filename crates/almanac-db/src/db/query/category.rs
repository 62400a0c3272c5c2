//! Query builder functions for event categories and their links.

use diesel::prelude::*;

use crate::db::schema::{event_category, event_category_link, related_event};

/// ## Summary
/// Returns a query for the categories of a site, ordered by position.
///
/// Unordered categories sort last, then by insertion.
#[must_use]
pub fn for_site(site_id: i32) -> event_category::BoxedQuery<'static, diesel::pg::Pg> {
    event_category::table
        .filter(event_category::site_id.eq(site_id))
        .order((event_category::sort_order.asc(), event_category::id.asc()))
        .into_boxed()
}

/// ## Summary
/// Returns a query to find a category by slug within a site.
#[must_use]
pub fn by_slug(site_id: i32, slug: &str) -> event_category::BoxedQuery<'_, diesel::pg::Pg> {
    event_category::table
        .filter(event_category::site_id.eq(site_id))
        .filter(event_category::slug.eq(slug))
        .into_boxed()
}

/// ## Summary
/// Returns a query for the categories of a site that have a position.
#[must_use]
pub fn ordered(site_id: i32) -> event_category::BoxedQuery<'static, diesel::pg::Pg> {
    event_category::table
        .filter(event_category::site_id.eq(site_id))
        .filter(event_category::sort_order.is_not_null())
        .into_boxed()
}

/// ## Summary
/// Returns a query for the category links of one event.
#[must_use]
pub fn links_for_event(
    event_id: uuid::Uuid,
) -> event_category_link::BoxedQuery<'static, diesel::pg::Pg> {
    event_category_link::table
        .filter(event_category_link::event_id.eq(event_id))
        .into_boxed()
}

/// ## Summary
/// Returns a query for the category links of several events.
#[must_use]
pub fn links_for_events(
    event_ids: Vec<uuid::Uuid>,
) -> event_category_link::BoxedQuery<'static, diesel::pg::Pg> {
    event_category_link::table
        .filter(event_category_link::event_id.eq_any(event_ids))
        .order((
            event_category_link::event_id.asc(),
            event_category_link::category_id.asc(),
        ))
        .into_boxed()
}

/// ## Summary
/// Returns a query for the related-event rows of one event.
#[must_use]
pub fn related_for_event(event_id: uuid::Uuid) -> related_event::BoxedQuery<'static, diesel::pg::Pg> {
    related_event::table
        .filter(related_event::event_id.eq(event_id))
        .order(related_event::related_id.asc())
        .into_boxed()
}
