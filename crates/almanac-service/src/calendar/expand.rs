//! Expansion of an occurrence into concrete instances.
//!
//! ## Summary
//! Instance `n` of a repeating occurrence starts `n` periods after the original
//! start, computed on the wall clock of the site timezone so a weekly 18:00
//! occurrence stays at 18:00 across DST changes. Periods are always counted from
//! the original start, never from the window, so skipping instances before the
//! window does not shift the phase.
//!
//! Monthly and yearly rules skip dates the target month does not have (the 31st,
//! February 29th), matching RRULE semantics.

use chrono::{
    DateTime, Datelike, Days, LocalResult, Months, NaiveDateTime, TimeDelta, TimeZone, Utc,
};
use chrono_tz::Tz;

use almanac_db::db::enums::Repeat;

use crate::calendar::recurrence::Recurrence;

pub const DEFAULT_MAX_INSTANCES: usize = 1000;

/// Settings shared by every expansion of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpandOptions {
    /// Timezone whose calendar days define the repeat periods.
    pub timezone: Tz,
    /// Cap on instances of a repeat bounded neither by `repeat_until` nor by the window end.
    pub max_instances: usize,
}

impl ExpandOptions {
    #[must_use]
    pub const fn new(timezone: Tz, max_instances: usize) -> Self {
        Self {
            timezone,
            max_instances,
        }
    }
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self::new(Tz::UTC, DEFAULT_MAX_INSTANCES)
    }
}

/// One concrete time span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Span {
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

/// Closed query window; either bound may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Window {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl Window {
    pub const UNBOUNDED: Self = Self {
        start: None,
        end: None,
    };

    #[must_use]
    pub const fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub const fn starting(start: DateTime<Utc>) -> Self {
        Self::new(Some(start), None)
    }

    #[must_use]
    pub const fn ending(end: DateTime<Utc>) -> Self {
        Self::new(None, Some(end))
    }

    /// A window whose end precedes its start contains nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!((self.start, self.end), (Some(start), Some(end)) if end < start)
    }

    /// Whether `[start, end]` intersects the window. A missing `end` is a point in time.
    #[must_use]
    pub fn overlaps(&self, start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> bool {
        let last = end.unwrap_or(start);
        self.start.is_none_or(|window_start| last >= window_start)
            && self.end.is_none_or(|window_end| start <= window_end)
    }
}

/// ## Summary
/// Expands `rule` into the instances that intersect `window`, in ascending start order.
///
/// The result is lazy and finite: it ends at the first instance starting after
/// `min(window.end, repeat_until)`, or after `options.max_instances` instances when
/// neither bound exists. Expansion is pure; cloning the returned iterator restarts it.
#[must_use]
pub fn expand(rule: &Recurrence, window: Window, options: &ExpandOptions) -> Expansion {
    if window.is_empty() {
        return Expansion {
            state: State::Finished,
        };
    }

    let Some(repeat) = rule.repeat() else {
        let state = if window.overlaps(rule.start(), rule.end()) {
            State::Single(Span {
                start: rule.start(),
                end: rule.end(),
            })
        } else {
            State::Finished
        };
        return Expansion { state };
    };

    let upper = match (window.end, rule.repeat_until()) {
        (Some(window_end), Some(until)) => Some(window_end.min(until)),
        (window_end, until) => window_end.or(until),
    };

    let mut repeating = Repeating {
        repeat,
        anchor: rule.start().with_timezone(&options.timezone).naive_local(),
        duration: rule.duration(),
        timezone: options.timezone,
        next_index: 0,
        upper,
        window_start: window.start,
        remaining: upper.is_none().then_some(options.max_instances),
    };
    repeating.next_index = repeating.first_candidate();

    Expansion {
        state: State::Repeating(repeating),
    }
}

/// Lazy sequence of the instances of one occurrence.
#[derive(Debug, Clone)]
pub struct Expansion {
    state: State,
}

#[derive(Debug, Clone)]
enum State {
    Finished,
    Single(Span),
    Repeating(Repeating),
}

#[derive(Debug, Clone)]
struct Repeating {
    repeat: Repeat,
    /// Original start on the wall clock of `timezone`.
    anchor: NaiveDateTime,
    duration: Option<TimeDelta>,
    timezone: Tz,
    next_index: u32,
    upper: Option<DateTime<Utc>>,
    window_start: Option<DateTime<Utc>>,
    remaining: Option<usize>,
}

enum Step {
    At(DateTime<Utc>),
    /// The period lands on a date that does not exist.
    Skip,
    /// Past the representable range.
    Exhausted,
}

/// Attaches `tz`; folded times take the earlier instant, times inside a DST gap move past it.
pub(crate) fn resolve_local(naive: NaiveDateTime, tz: &Tz) -> Option<DateTime<Tz>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(earliest, _latest) => Some(earliest),
        LocalResult::None => naive
            .checked_add_signed(TimeDelta::hours(1))
            .and_then(|shifted| tz.from_local_datetime(&shifted).earliest()),
    }
}

impl Repeating {
    fn nth(&self, index: u32) -> Step {
        let local = match self.repeat {
            Repeat::Daily => self.anchor.checked_add_days(Days::new(u64::from(index))),
            Repeat::Weekly => self
                .anchor
                .checked_add_days(Days::new(u64::from(index) * 7)),
            Repeat::Monthly => self.anchor.checked_add_months(Months::new(index)),
            Repeat::Yearly => index
                .checked_mul(12)
                .and_then(|months| self.anchor.checked_add_months(Months::new(months))),
        };
        let Some(local) = local else {
            return Step::Exhausted;
        };

        // chrono clamps to the last day of a shorter month
        if matches!(self.repeat, Repeat::Monthly | Repeat::Yearly) && local.day() != self.anchor.day()
        {
            return Step::Skip;
        }

        resolve_local(local, &self.timezone)
            .map_or(Step::Skip, |dt| Step::At(dt.with_timezone(&Utc)))
    }

    /// Index to start iterating from: one period before the first instance that
    /// can still reach the window, so nothing overlapping is skipped.
    fn first_candidate(&self) -> u32 {
        let Some(window_start) = self.window_start else {
            return 0;
        };
        let lead = self
            .duration
            .and_then(|duration| window_start.checked_sub_signed(duration))
            .unwrap_or(window_start);
        let lead = lead.with_timezone(&self.timezone).naive_local();
        if lead <= self.anchor {
            return 0;
        }

        let days = lead.date().signed_duration_since(self.anchor.date()).num_days();
        let months = i64::from(lead.year() - self.anchor.year()) * 12
            + i64::from(lead.month()) - i64::from(self.anchor.month());
        let periods = match self.repeat {
            Repeat::Daily => days,
            Repeat::Weekly => days / 7,
            Repeat::Monthly => months,
            Repeat::Yearly => months / 12,
        };

        u32::try_from((periods - 1).max(0)).unwrap_or(u32::MAX)
    }
}

impl Iterator for Expansion {
    type Item = Span;

    fn next(&mut self) -> Option<Span> {
        match &mut self.state {
            State::Finished => None,
            State::Single(span) => {
                let span = *span;
                self.state = State::Finished;
                Some(span)
            }
            State::Repeating(repeating) => loop {
                if repeating.remaining == Some(0) {
                    self.state = State::Finished;
                    return None;
                }

                let index = repeating.next_index;
                let Some(following) = index.checked_add(1) else {
                    self.state = State::Finished;
                    return None;
                };
                repeating.next_index = following;

                let start = match repeating.nth(index) {
                    Step::At(start) => start,
                    Step::Skip => continue,
                    Step::Exhausted => {
                        self.state = State::Finished;
                        return None;
                    }
                };

                if repeating.upper.is_some_and(|upper| start > upper) {
                    self.state = State::Finished;
                    return None;
                }

                let end = repeating
                    .duration
                    .and_then(|duration| start.checked_add_signed(duration));
                if repeating
                    .window_start
                    .is_some_and(|window_start| end.unwrap_or(start) < window_start)
                {
                    continue;
                }

                if let Some(remaining) = repeating.remaining.as_mut() {
                    *remaining -= 1;
                }
                tracing::trace!(index, start = %start, "Expanded instance");
                return Some(Span { start, end });
            },
        }
    }
}
