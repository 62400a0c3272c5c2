use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use diesel::{pg::Pg, prelude::*};

use crate::db::enums::Repeat;
use crate::db::schema;
use crate::model::event::Event;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Queryable, Selectable, Identifiable)]
#[diesel(table_name = schema::occurrence)]
#[diesel(check_for_backend(Pg))]
pub struct Occurrence {
    pub id: uuid::Uuid,
    pub event_id: uuid::Uuid,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub repeat: Option<Repeat>,
    /// Latest allowed instance start; only meaningful with `repeat`.
    pub repeat_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Insertable)]
#[diesel(table_name = schema::occurrence)]
pub struct NewOccurrence {
    pub id: uuid::Uuid,
    pub event_id: uuid::Uuid,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub repeat: Option<Repeat>,
    pub repeat_until: Option<DateTime<Utc>>,
}

impl NewOccurrence {
    #[must_use]
    pub fn new(
        event_id: uuid::Uuid,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
        repeat: Option<Repeat>,
        repeat_until: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: uuid::Uuid::now_v7(),
            event_id,
            start,
            end,
            repeat,
            repeat_until,
        }
    }

    #[must_use]
    pub const fn into_occurrence(self) -> Occurrence {
        Occurrence {
            id: self.id,
            event_id: self.event_id,
            start: self.start,
            end: self.end,
            repeat: self.repeat,
            repeat_until: self.repeat_until,
        }
    }
}

/// An occurrence together with its owning event and that event's categories.
#[derive(Debug, Clone, PartialEq)]
pub struct OccurrenceRecord {
    pub occurrence: Occurrence,
    pub event: Arc<Event>,
    pub category_ids: Arc<[uuid::Uuid]>,
}

impl OccurrenceRecord {
    /// ## Summary
    /// Joins loaded rows into records, in occurrence insertion order.
    ///
    /// Occurrences whose event is not among `events` are dropped.
    #[must_use]
    pub fn assemble(
        events: Vec<Event>,
        mut occurrences: Vec<Occurrence>,
        links: &[(uuid::Uuid, uuid::Uuid)],
    ) -> Vec<Self> {
        let mut categories: HashMap<uuid::Uuid, Vec<uuid::Uuid>> = HashMap::new();
        for (event_id, category_id) in links {
            categories.entry(*event_id).or_default().push(*category_id);
        }

        let owners: HashMap<uuid::Uuid, (Arc<Event>, Arc<[uuid::Uuid]>)> = events
            .into_iter()
            .map(|event| {
                let ids: Arc<[uuid::Uuid]> = categories.remove(&event.id).unwrap_or_default().into();
                (event.id, (Arc::new(event), ids))
            })
            .collect();

        occurrences.sort_by_key(|occurrence| occurrence.id);
        occurrences
            .into_iter()
            .filter_map(|occurrence| {
                let (event, category_ids) = owners.get(&occurrence.event_id)?;
                Some(Self {
                    occurrence,
                    event: Arc::clone(event),
                    category_ids: Arc::clone(category_ids),
                })
            })
            .collect()
    }
}

/// Criteria for loading occurrence records.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OccurrenceFilter {
    pub site_id: i32,
    /// Only events published at this instant.
    pub published_at: Option<DateTime<Utc>>,
    /// Only events in at least one of these categories; empty means any.
    pub category_ids: Vec<uuid::Uuid>,
    pub featured: Option<bool>,
    pub event_id: Option<uuid::Uuid>,
}

impl OccurrenceFilter {
    #[must_use]
    pub fn for_site(site_id: i32) -> Self {
        Self {
            site_id,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn published_at(mut self, now: DateTime<Utc>) -> Self {
        self.published_at = Some(now);
        self
    }

    #[must_use]
    pub fn in_categories(mut self, category_ids: Vec<uuid::Uuid>) -> Self {
        self.category_ids = category_ids;
        self
    }

    #[must_use]
    pub const fn featured(mut self, featured: bool) -> Self {
        self.featured = Some(featured);
        self
    }

    #[must_use]
    pub const fn for_event(mut self, event_id: uuid::Uuid) -> Self {
        self.event_id = Some(event_id);
        self
    }

    /// Whether an event with the given categories passes the filter.
    #[must_use]
    pub fn matches(&self, event: &Event, category_ids: &[uuid::Uuid]) -> bool {
        event.site_id == self.site_id
            && self.published_at.is_none_or(|now| event.is_published(now))
            && self.featured.is_none_or(|featured| event.featured == featured)
            && self.event_id.is_none_or(|id| event.id == id)
            && (self.category_ids.is_empty()
                || category_ids.iter().any(|id| self.category_ids.contains(id)))
    }
}
