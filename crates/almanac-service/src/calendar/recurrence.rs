//! The schedule of a single occurrence.

use chrono::{DateTime, TimeDelta, Utc};

use almanac_core::error::{CoreError, CoreResult};
use almanac_db::db::enums::Repeat;
use almanac_db::model::occurrence::{NewOccurrence, Occurrence};

/// Base span of an occurrence plus an optional repeat rule.
///
/// `end`, when present, is never before `start`. `repeat_until` bounds the
/// last allowed instance *start* and is only set together with `repeat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recurrence {
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
    repeat: Option<Repeat>,
    repeat_until: Option<DateTime<Utc>>,
}

impl Recurrence {
    /// ## Summary
    /// Builds a validated recurrence.
    ///
    /// ## Errors
    /// Returns `ValidationError` if `end` precedes `start`, or if `repeat_until`
    /// is given without `repeat`.
    pub fn new(
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
        repeat: Option<Repeat>,
        repeat_until: Option<DateTime<Utc>>,
    ) -> CoreResult<Self> {
        if end.is_some_and(|end| end < start) {
            return Err(CoreError::ValidationError(format!(
                "occurrence ends before it starts ({start})"
            )));
        }
        if repeat_until.is_some() && repeat.is_none() {
            return Err(CoreError::ValidationError(
                "repeat_until requires a repeat rule".to_string(),
            ));
        }
        Ok(Self {
            start,
            end,
            repeat,
            repeat_until,
        })
    }

    /// A non-repeating span.
    ///
    /// ## Errors
    /// Returns `ValidationError` if `end` precedes `start`.
    pub fn single(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> CoreResult<Self> {
        Self::new(start, end, None, None)
    }

    /// Reads the schedule of a stored occurrence. Stored rows already satisfy the
    /// invariants; an end before the start is treated as a point in time.
    #[must_use]
    pub fn of(occurrence: &Occurrence) -> Self {
        Self {
            start: occurrence.start,
            end: occurrence.end.filter(|end| *end >= occurrence.start),
            repeat: occurrence.repeat,
            repeat_until: occurrence.repeat.and(occurrence.repeat_until),
        }
    }

    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> Option<DateTime<Utc>> {
        self.end
    }

    #[must_use]
    pub const fn repeat(&self) -> Option<Repeat> {
        self.repeat
    }

    #[must_use]
    pub const fn repeat_until(&self) -> Option<DateTime<Utc>> {
        self.repeat_until
    }

    /// Length of each instance; `None` for point-in-time occurrences.
    #[must_use]
    pub fn duration(&self) -> Option<TimeDelta> {
        self.end.map(|end| end - self.start)
    }

    /// The row that stores this schedule for `event_id`.
    #[must_use]
    pub fn into_new_occurrence(self, event_id: uuid::Uuid) -> NewOccurrence {
        NewOccurrence::new(event_id, self.start, self.end, self.repeat, self.repeat_until)
    }
}
