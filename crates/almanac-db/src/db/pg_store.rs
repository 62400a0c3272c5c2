//! [`CalendarStore`] backed by a Postgres connection.

use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use almanac_core::error::CoreError;

use crate::db::query;
use crate::db::schema::{event, event_category, event_category_link, related_event};
use crate::db::store::CalendarStore;
use crate::db::transaction::with_transaction;
use crate::error::{DbError, DbResult};
use crate::model::category::{EventCategory, EventCategoryLink, NewEventCategory, RelatedEvent};
use crate::model::event::{Event, NewEvent};
use crate::model::occurrence::{NewOccurrence, Occurrence, OccurrenceFilter, OccurrenceRecord};

/// Store operating on a borrowed connection. Operations that must be atomic
/// open their own transaction (nested as a savepoint when one is already open).
pub struct PgStore<'c> {
    conn: &'c mut AsyncPgConnection,
}

impl<'c> PgStore<'c> {
    pub const fn new(conn: &'c mut AsyncPgConnection) -> Self {
        Self { conn }
    }
}

fn unique_violation(error: diesel::result::Error, slug: &str) -> DbError {
    match error {
        diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            DbError::SlugConflict(slug.to_string())
        }
        other => other.into(),
    }
}

/// Serializes category position changes for the remainder of the transaction.
async fn lock_categories(conn: &mut AsyncPgConnection) -> DbResult<()> {
    diesel::sql_query("LOCK TABLE event_category IN SHARE ROW EXCLUSIVE MODE")
        .execute(conn)
        .await?;
    Ok(())
}

impl CalendarStore for PgStore<'_> {
    #[tracing::instrument(skip(self))]
    async fn event_by_id(&mut self, id: uuid::Uuid) -> DbResult<Option<Event>> {
        Ok(query::event::by_id(id)
            .select(Event::as_select())
            .first(&mut *self.conn)
            .await
            .optional()?)
    }

    #[tracing::instrument(skip(self))]
    async fn event_by_slug(&mut self, site_id: i32, slug: &str) -> DbResult<Option<Event>> {
        Ok(query::event::by_slug(site_id, slug)
            .select(Event::as_select())
            .first(&mut *self.conn)
            .await
            .optional()?)
    }

    async fn event_slug_exists(&mut self, site_id: i32, slug: &str) -> DbResult<bool> {
        let exists = diesel::select(diesel::dsl::exists(
            event::table
                .filter(event::site_id.eq(site_id))
                .filter(event::slug.eq(slug)),
        ))
        .get_result::<bool>(&mut *self.conn)
        .await?;
        Ok(exists)
    }

    #[tracing::instrument(skip(self, event), fields(event_id = %event.id, slug = %event.slug))]
    async fn insert_event(&mut self, event: NewEvent) -> DbResult<Event> {
        let created = diesel::insert_into(event::table)
            .values(&event)
            .returning(Event::as_returning())
            .get_result(&mut *self.conn)
            .await
            .map_err(|e| unique_violation(e, &event.slug))?;
        tracing::debug!("Event inserted");
        Ok(created)
    }

    async fn event_category_ids(&mut self, event_id: uuid::Uuid) -> DbResult<Vec<uuid::Uuid>> {
        Ok(query::category::links_for_event(event_id)
            .select(event_category_link::category_id)
            .order(event_category_link::category_id.asc())
            .load(&mut *self.conn)
            .await?)
    }

    #[tracing::instrument(skip(self, category_ids), fields(count = category_ids.len()))]
    async fn link_event_categories(
        &mut self,
        event_id: uuid::Uuid,
        category_ids: &[uuid::Uuid],
    ) -> DbResult<()> {
        if category_ids.is_empty() {
            return Ok(());
        }
        let links: Vec<EventCategoryLink> = category_ids
            .iter()
            .map(|&category_id| EventCategoryLink {
                event_id,
                category_id,
            })
            .collect();
        diesel::insert_into(event_category_link::table)
            .values(&links)
            .on_conflict_do_nothing()
            .execute(&mut *self.conn)
            .await?;
        Ok(())
    }

    async fn related_event_ids(&mut self, event_id: uuid::Uuid) -> DbResult<Vec<uuid::Uuid>> {
        Ok(query::category::related_for_event(event_id)
            .select(related_event::related_id)
            .load(&mut *self.conn)
            .await?)
    }

    #[tracing::instrument(skip(self))]
    async fn link_related_events(
        &mut self,
        event_id: uuid::Uuid,
        related_id: uuid::Uuid,
    ) -> DbResult<()> {
        if event_id == related_id {
            return Err(CoreError::InvalidInput("an event cannot be related to itself".to_string()).into());
        }
        let rows = [
            RelatedEvent {
                event_id,
                related_id,
            },
            RelatedEvent {
                event_id: related_id,
                related_id: event_id,
            },
        ];
        diesel::insert_into(related_event::table)
            .values(&rows[..])
            .on_conflict_do_nothing()
            .execute(&mut *self.conn)
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, occurrence), fields(event_id = %occurrence.event_id))]
    async fn insert_occurrence(&mut self, occurrence: NewOccurrence) -> DbResult<Occurrence> {
        Ok(diesel::insert_into(crate::db::schema::occurrence::table)
            .values(&occurrence)
            .returning(Occurrence::as_returning())
            .get_result(&mut *self.conn)
            .await?)
    }

    async fn occurrences_for_event(&mut self, event_id: uuid::Uuid) -> DbResult<Vec<Occurrence>> {
        Ok(query::occurrence::for_event(event_id)
            .select(Occurrence::as_select())
            .load(&mut *self.conn)
            .await?)
    }

    #[tracing::instrument(skip(self))]
    async fn occurrence_records(
        &mut self,
        filter: &OccurrenceFilter,
    ) -> DbResult<Vec<OccurrenceRecord>> {
        let events: Vec<Event> = query::event::matching(filter)
            .select(Event::as_select())
            .load(&mut *self.conn)
            .await?;
        if events.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<uuid::Uuid> = events.iter().map(|event| event.id).collect();
        let occurrences: Vec<Occurrence> = query::occurrence::for_events(ids.clone())
            .select(Occurrence::as_select())
            .load(&mut *self.conn)
            .await?;
        let links: Vec<(uuid::Uuid, uuid::Uuid)> = query::category::links_for_events(ids)
            .select((
                event_category_link::event_id,
                event_category_link::category_id,
            ))
            .load(&mut *self.conn)
            .await?;

        tracing::trace!(
            events = events.len(),
            occurrences = occurrences.len(),
            "Loaded occurrence records"
        );
        Ok(OccurrenceRecord::assemble(events, occurrences, &links))
    }

    async fn categories(&mut self, site_id: i32) -> DbResult<Vec<EventCategory>> {
        Ok(query::category::for_site(site_id)
            .select(EventCategory::as_select())
            .load(&mut *self.conn)
            .await?)
    }

    async fn category_by_slug(
        &mut self,
        site_id: i32,
        slug: &str,
    ) -> DbResult<Option<EventCategory>> {
        Ok(query::category::by_slug(site_id, slug)
            .select(EventCategory::as_select())
            .first(&mut *self.conn)
            .await
            .optional()?)
    }

    #[tracing::instrument(skip(self, category), fields(slug = %category.slug))]
    async fn create_category(&mut self, category: NewEventCategory) -> DbResult<EventCategory> {
        with_transaction(&mut *self.conn, move |tx| {
            async move {
                lock_categories(tx).await?;

                let mut category = category;
                if category.sort_order.is_none() {
                    let count: i64 = query::category::ordered(category.site_id)
                        .count()
                        .get_result(tx)
                        .await?;
                    let position = i32::try_from(count).map_err(|_e| {
                        CoreError::InvariantViolation("category count exceeds i32 range")
                    })?;
                    category.sort_order = Some(position);
                }

                let created = diesel::insert_into(event_category::table)
                    .values(&category)
                    .returning(EventCategory::as_returning())
                    .get_result(tx)
                    .await
                    .map_err(|e| unique_violation(e, &category.slug))?;
                tracing::debug!(sort_order = ?created.sort_order, "Category created");
                Ok(created)
            }
            .scope_boxed()
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn delete_category(&mut self, id: uuid::Uuid) -> DbResult<bool> {
        with_transaction(&mut *self.conn, move |tx| {
            async move {
                lock_categories(tx).await?;

                let Some(category) = event_category::table
                    .find(id)
                    .select(EventCategory::as_select())
                    .first(tx)
                    .await
                    .optional()?
                else {
                    return Ok(false);
                };

                if let Some(position) = category.sort_order {
                    let shifted = diesel::update(
                        event_category::table
                            .filter(event_category::site_id.eq(category.site_id))
                            .filter(event_category::sort_order.gt(position)),
                    )
                    .set(event_category::sort_order.eq(event_category::sort_order - 1))
                    .execute(tx)
                    .await?;
                    tracing::trace!(shifted, "Renumbered following categories");
                }

                diesel::delete(event_category::table.find(id))
                    .execute(tx)
                    .await?;
                Ok(true)
            }
            .scope_boxed()
        })
        .await
    }
}
