//! A [`CalendarStore`] held in memory.
//!
//! Mirrors the constraints of the Postgres schema that services rely on:
//! slugs are unique per site, an occurrence with `repeat_until` needs a
//! repeat, category positions stay dense, and rows come back in insertion order.

use chrono::Utc;

use almanac_db::db::store::CalendarStore;
use almanac_db::error::{DbError, DbResult};
use almanac_db::model::category::{EventCategory, EventCategoryLink, NewEventCategory, RelatedEvent};
use almanac_db::model::event::{Event, NewEvent};
use almanac_db::model::occurrence::{NewOccurrence, Occurrence, OccurrenceFilter, OccurrenceRecord};

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    events: Vec<Event>,
    occurrences: Vec<Occurrence>,
    categories: Vec<EventCategory>,
    category_links: Vec<EventCategoryLink>,
    related: Vec<RelatedEvent>,
    writes: usize,
    rejects_events: bool,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose event inserts fail, like a database that went away
    /// between reading and writing.
    #[must_use]
    pub fn rejecting_events() -> Self {
        Self {
            rejects_events: true,
            ..Self::default()
        }
    }

    /// Every stored event, in insertion order.
    #[must_use]
    pub fn stored_events(&self) -> &[Event] {
        &self.events
    }

    /// Every stored occurrence, in insertion order.
    #[must_use]
    pub fn stored_occurrences(&self) -> &[Occurrence] {
        &self.occurrences
    }

    /// Every stored category, in insertion order.
    #[must_use]
    pub fn stored_categories(&self) -> &[EventCategory] {
        &self.categories
    }

    /// Number of successful write operations so far.
    #[must_use]
    pub const fn write_count(&self) -> usize {
        self.writes
    }

    fn category_ids_of(&self, event_id: uuid::Uuid) -> Vec<uuid::Uuid> {
        let mut ids: Vec<uuid::Uuid> = self
            .category_links
            .iter()
            .filter(|link| link.event_id == event_id)
            .map(|link| link.category_id)
            .collect();
        ids.sort_unstable();
        ids
    }
}

impl CalendarStore for MemoryStore {
    async fn event_by_id(&mut self, id: uuid::Uuid) -> DbResult<Option<Event>> {
        Ok(self.events.iter().find(|event| event.id == id).cloned())
    }

    async fn event_by_slug(&mut self, site_id: i32, slug: &str) -> DbResult<Option<Event>> {
        Ok(self
            .events
            .iter()
            .find(|event| event.site_id == site_id && event.slug == slug)
            .cloned())
    }

    async fn event_slug_exists(&mut self, site_id: i32, slug: &str) -> DbResult<bool> {
        Ok(self
            .events
            .iter()
            .any(|event| event.site_id == site_id && event.slug == slug))
    }

    async fn insert_event(&mut self, event: NewEvent) -> DbResult<Event> {
        if self.rejects_events {
            return Err(DbError::DatabaseError(diesel::result::Error::BrokenTransactionManager));
        }
        if self
            .events
            .iter()
            .any(|existing| existing.site_id == event.site_id && existing.slug == event.slug)
        {
            return Err(DbError::SlugConflict(event.slug));
        }
        let event = event.into_event(Utc::now());
        self.events.push(event.clone());
        self.writes += 1;
        Ok(event)
    }

    async fn event_category_ids(&mut self, event_id: uuid::Uuid) -> DbResult<Vec<uuid::Uuid>> {
        Ok(self.category_ids_of(event_id))
    }

    async fn link_event_categories(
        &mut self,
        event_id: uuid::Uuid,
        category_ids: &[uuid::Uuid],
    ) -> DbResult<()> {
        for category_id in category_ids {
            let link = EventCategoryLink {
                event_id,
                category_id: *category_id,
            };
            if !self.category_links.contains(&link) {
                self.category_links.push(link);
            }
        }
        self.writes += 1;
        Ok(())
    }

    async fn related_event_ids(&mut self, event_id: uuid::Uuid) -> DbResult<Vec<uuid::Uuid>> {
        let mut ids: Vec<uuid::Uuid> = self
            .related
            .iter()
            .filter(|pair| pair.event_id == event_id)
            .map(|pair| pair.related_id)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn link_related_events(
        &mut self,
        event_id: uuid::Uuid,
        related_id: uuid::Uuid,
    ) -> DbResult<()> {
        if event_id == related_id {
            return Ok(());
        }
        for pair in [
            RelatedEvent {
                event_id,
                related_id,
            },
            RelatedEvent {
                event_id: related_id,
                related_id: event_id,
            },
        ] {
            if !self.related.contains(&pair) {
                self.related.push(pair);
            }
        }
        self.writes += 1;
        Ok(())
    }

    async fn insert_occurrence(&mut self, occurrence: NewOccurrence) -> DbResult<Occurrence> {
        if occurrence.repeat_until.is_some() && occurrence.repeat.is_none() {
            return Err(DbError::InvalidRepeat(
                "repeat_until requires a repeat".to_string(),
            ));
        }
        let occurrence = occurrence.into_occurrence();
        self.occurrences.push(occurrence.clone());
        self.writes += 1;
        Ok(occurrence)
    }

    async fn occurrences_for_event(&mut self, event_id: uuid::Uuid) -> DbResult<Vec<Occurrence>> {
        Ok(self
            .occurrences
            .iter()
            .filter(|occurrence| occurrence.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn occurrence_records(
        &mut self,
        filter: &OccurrenceFilter,
    ) -> DbResult<Vec<OccurrenceRecord>> {
        let events: Vec<Event> = self
            .events
            .iter()
            .filter(|event| filter.matches(event, &self.category_ids_of(event.id)))
            .cloned()
            .collect();
        let occurrences: Vec<Occurrence> = self
            .occurrences
            .iter()
            .filter(|occurrence| events.iter().any(|event| event.id == occurrence.event_id))
            .cloned()
            .collect();
        let links: Vec<(uuid::Uuid, uuid::Uuid)> = self
            .category_links
            .iter()
            .map(|link| (link.event_id, link.category_id))
            .collect();
        Ok(OccurrenceRecord::assemble(events, occurrences, &links))
    }

    async fn categories(&mut self, site_id: i32) -> DbResult<Vec<EventCategory>> {
        let mut categories: Vec<EventCategory> = self
            .categories
            .iter()
            .filter(|category| category.site_id == site_id)
            .cloned()
            .collect();
        categories.sort_by_key(|category| (category.sort_order.is_none(), category.sort_order, category.id));
        Ok(categories)
    }

    async fn category_by_slug(
        &mut self,
        site_id: i32,
        slug: &str,
    ) -> DbResult<Option<EventCategory>> {
        Ok(self
            .categories
            .iter()
            .find(|category| category.site_id == site_id && category.slug == slug)
            .cloned())
    }

    async fn create_category(&mut self, category: NewEventCategory) -> DbResult<EventCategory> {
        if self
            .categories
            .iter()
            .any(|existing| existing.site_id == category.site_id && existing.slug == category.slug)
        {
            return Err(DbError::SlugConflict(category.slug));
        }
        let mut category = category;
        if category.sort_order.is_none() {
            let count = self
                .categories
                .iter()
                .filter(|existing| existing.site_id == category.site_id && existing.sort_order.is_some())
                .count();
            category.sort_order = Some(i32::try_from(count).map_err(|_e| {
                almanac_core::error::CoreError::InvariantViolation("category count exceeds i32 range")
            })?);
        }
        let category = category.into_category();
        self.categories.push(category.clone());
        self.writes += 1;
        Ok(category)
    }

    async fn delete_category(&mut self, id: uuid::Uuid) -> DbResult<bool> {
        let Some(index) = self.categories.iter().position(|category| category.id == id) else {
            return Ok(false);
        };
        let removed = self.categories.remove(index);
        if let Some(position) = removed.sort_order {
            for category in &mut self.categories {
                if category.site_id == removed.site_id
                    && let Some(order) = category.sort_order.as_mut()
                    && *order > position
                {
                    *order -= 1;
                }
            }
        }
        self.category_links.retain(|link| link.category_id != id);
        self.writes += 1;
        Ok(true)
    }
}
