//! The persistence seam used by the service layer.
//!
//! Services depend on [`CalendarStore`] rather than on a connection type, so the
//! same code runs against Postgres ([`crate::db::pg_store::PgStore`]) and the
//! in-memory store used by tests.

use std::future::Future;

use crate::error::DbResult;
use crate::model::category::{EventCategory, NewEventCategory};
use crate::model::event::{Event, NewEvent};
use crate::model::occurrence::{NewOccurrence, Occurrence, OccurrenceFilter, OccurrenceRecord};

pub trait CalendarStore: Send {
    fn event_by_id(
        &mut self,
        id: uuid::Uuid,
    ) -> impl Future<Output = DbResult<Option<Event>>> + Send;

    fn event_by_slug(
        &mut self,
        site_id: i32,
        slug: &str,
    ) -> impl Future<Output = DbResult<Option<Event>>> + Send;

    fn event_slug_exists(
        &mut self,
        site_id: i32,
        slug: &str,
    ) -> impl Future<Output = DbResult<bool>> + Send;

    /// ## Errors
    /// Returns `SlugConflict` if the slug is already used within the site.
    fn insert_event(&mut self, event: NewEvent) -> impl Future<Output = DbResult<Event>> + Send;

    /// Category ids of an event, ascending.
    fn event_category_ids(
        &mut self,
        event_id: uuid::Uuid,
    ) -> impl Future<Output = DbResult<Vec<uuid::Uuid>>> + Send;

    fn link_event_categories(
        &mut self,
        event_id: uuid::Uuid,
        category_ids: &[uuid::Uuid],
    ) -> impl Future<Output = DbResult<()>> + Send;

    /// Related event ids, ascending.
    fn related_event_ids(
        &mut self,
        event_id: uuid::Uuid,
    ) -> impl Future<Output = DbResult<Vec<uuid::Uuid>>> + Send;

    /// Relates two events in both directions.
    fn link_related_events(
        &mut self,
        event_id: uuid::Uuid,
        related_id: uuid::Uuid,
    ) -> impl Future<Output = DbResult<()>> + Send;

    fn insert_occurrence(
        &mut self,
        occurrence: NewOccurrence,
    ) -> impl Future<Output = DbResult<Occurrence>> + Send;

    /// Occurrences of an event in insertion order.
    fn occurrences_for_event(
        &mut self,
        event_id: uuid::Uuid,
    ) -> impl Future<Output = DbResult<Vec<Occurrence>>> + Send;

    /// Occurrence records passing `filter`, in occurrence insertion order.
    fn occurrence_records(
        &mut self,
        filter: &OccurrenceFilter,
    ) -> impl Future<Output = DbResult<Vec<OccurrenceRecord>>> + Send;

    /// Categories of a site ordered by position; unordered ones last.
    fn categories(
        &mut self,
        site_id: i32,
    ) -> impl Future<Output = DbResult<Vec<EventCategory>>> + Send;

    fn category_by_slug(
        &mut self,
        site_id: i32,
        slug: &str,
    ) -> impl Future<Output = DbResult<Option<EventCategory>>> + Send;

    /// ## Summary
    /// Inserts a category. An unset position becomes the number of categories
    /// of the site that already have one.
    ///
    /// Counting and inserting form one atomic unit.
    ///
    /// ## Errors
    /// Returns `SlugConflict` if the slug is already used within the site.
    fn create_category(
        &mut self,
        category: NewEventCategory,
    ) -> impl Future<Output = DbResult<EventCategory>> + Send;

    /// ## Summary
    /// Deletes a category and closes the gap it leaves: every category of the
    /// site positioned at or after it moves up by one.
    ///
    /// Renumbering and deleting form one atomic unit. Returns `false` if there
    /// was no such category.
    fn delete_category(&mut self, id: uuid::Uuid) -> impl Future<Output = DbResult<bool>> + Send;
}
