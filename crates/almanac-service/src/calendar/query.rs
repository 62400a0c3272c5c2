//! Queries over the instances of many occurrences.
//!
//! ## Summary
//! An [`OccurrenceSet`] holds candidate occurrence records (in insertion order)
//! and answers the questions the presentations ask: which instances fall into a
//! window, which are upcoming or past, and what the next instance of every event is.
//! All operations take `now` explicitly and are pure.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use almanac_db::model::event::Event;
use almanac_db::model::occurrence::{Occurrence, OccurrenceRecord};

use crate::calendar::expand::{ExpandOptions, Window, expand};
use crate::calendar::recurrence::Recurrence;

/// A concrete instance together with the occurrence it was expanded from.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub record: Arc<OccurrenceRecord>,
}

impl Instance {
    #[must_use]
    pub fn event(&self) -> &Event {
        &self.record.event
    }

    #[must_use]
    pub fn occurrence(&self) -> &Occurrence {
        &self.record.occurrence
    }

    #[must_use]
    pub fn event_id(&self) -> uuid::Uuid {
        self.record.event.id
    }
}

/// Candidate occurrence records plus the expansion settings of the request.
#[derive(Debug, Clone, Default)]
pub struct OccurrenceSet {
    records: Vec<Arc<OccurrenceRecord>>,
    options: ExpandOptions,
}

impl OccurrenceSet {
    #[must_use]
    pub fn new(records: Vec<OccurrenceRecord>, options: ExpandOptions) -> Self {
        Self {
            records: records.into_iter().map(Arc::new).collect(),
            options,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn records(&self) -> &[Arc<OccurrenceRecord>] {
        &self.records
    }

    fn retain(mut self, keep: impl Fn(&OccurrenceRecord) -> bool) -> Self {
        self.records.retain(|record| keep(record));
        self
    }

    /// ## Summary
    /// Keeps occurrences of events that are published at `now`.
    ///
    /// Events without publish or expiry dates are only subject to their status.
    #[must_use]
    pub fn published(self, now: DateTime<Utc>) -> Self {
        self.retain(|record| record.event.is_published(now))
    }

    /// ## Summary
    /// Keeps occurrences of events in at least one of `category_ids`.
    ///
    /// An empty set of categories filters nothing.
    #[must_use]
    pub fn in_categories(self, category_ids: &[uuid::Uuid]) -> Self {
        if category_ids.is_empty() {
            return self;
        }
        self.retain(|record| {
            record
                .category_ids
                .iter()
                .any(|id| category_ids.contains(id))
        })
    }

    /// Keeps occurrences of featured (`true`) or regular (`false`) events.
    #[must_use]
    pub fn featured(self, featured: bool) -> Self {
        self.retain(|record| record.event.featured == featured)
    }

    fn instances<'a>(
        &'a self,
        record: &'a Arc<OccurrenceRecord>,
        window: Window,
    ) -> impl Iterator<Item = Instance> + 'a {
        expand(&Recurrence::of(&record.occurrence), window, &self.options).map(move |span| {
            Instance {
                start: span.start,
                end: span.end,
                record: Arc::clone(record),
            }
        })
    }

    /// ## Summary
    /// Every instance intersecting `[window_start, window_end]`, ascending by start.
    ///
    /// Instances starting at the same moment keep the insertion order of their
    /// occurrences. An inverted window yields nothing.
    #[must_use]
    pub fn all_occurrences(
        &self,
        window_start: Option<DateTime<Utc>>,
        window_end: Option<DateTime<Utc>>,
    ) -> Vec<Instance> {
        let window = Window::new(window_start, window_end);
        let mut instances: Vec<Instance> = self
            .records
            .iter()
            .flat_map(|record| self.instances(record, window))
            .collect();
        // stable: ties stay in record order
        instances.sort_by_key(|instance| instance.start);
        tracing::trace!(
            records = self.records.len(),
            instances = instances.len(),
            "Merged occurrence instances"
        );
        instances
    }

    /// Published instances in `[now, ∞)`, ascending by start.
    #[must_use]
    pub fn upcoming(&self, now: DateTime<Utc>) -> Vec<Instance> {
        self.clone().published(now).all_occurrences(Some(now), None)
    }

    /// Published instances in `(-∞, now]`, latest first.
    #[must_use]
    pub fn past(&self, now: DateTime<Utc>) -> Vec<Instance> {
        let mut instances = self.clone().published(now).all_occurrences(None, Some(now));
        instances.sort_by(|a, b| b.start.cmp(&a.start));
        instances
    }
}

/// ## Summary
/// Reduces a start-ordered sequence to the earliest instance of each event,
/// ascending by start and truncated to `limit`.
///
/// The sequence is sorted by event (stably, so each event's instances stay in
/// start order), consecutive runs of the same event are collapsed to their first
/// instance, and the survivors are sorted by start again.
#[must_use]
pub fn next_per_event(mut instances: Vec<Instance>, limit: Option<usize>) -> Vec<Instance> {
    instances.sort_by_key(Instance::event_id);

    let mut unique: Vec<Instance> = instances
        .chunk_by(|a, b| a.event_id() == b.event_id())
        .filter_map(|group| group.first().cloned())
        .collect();
    unique.sort_by_key(|instance| instance.start);

    if let Some(limit) = limit {
        unique.truncate(limit);
    }
    unique
}
