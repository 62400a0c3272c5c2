//! Query builder functions for occurrences.

use diesel::prelude::*;

use crate::db::schema::occurrence;

/// ## Summary
/// Returns a query for the occurrences of one event in insertion order.
#[must_use]
pub fn for_event(event_id: uuid::Uuid) -> occurrence::BoxedQuery<'static, diesel::pg::Pg> {
    occurrence::table
        .filter(occurrence::event_id.eq(event_id))
        .order(occurrence::id.asc())
        .into_boxed()
}

/// ## Summary
/// Returns a query for the occurrences of several events in insertion order.
#[must_use]
pub fn for_events(event_ids: Vec<uuid::Uuid>) -> occurrence::BoxedQuery<'static, diesel::pg::Pg> {
    occurrence::table
        .filter(occurrence::event_id.eq_any(event_ids))
        .order(occurrence::id.asc())
        .into_boxed()
}
