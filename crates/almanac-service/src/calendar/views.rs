//! The calendar presentations: month grid, event list and upcoming feed.
//!
//! ## Summary
//! Each presentation has a pure builder over an [`OccurrenceSet`] and an async
//! loader that fetches the published candidates of the request's site first.
//! Local days are days in the site timezone carried by [`ExpandOptions`].

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveTime, TimeDelta, Utc};
use chrono_tz::Tz;

use almanac_core::error::CoreError;
use almanac_core::types::{ListingConfig, RequestContext};
use almanac_db::db::store::CalendarStore;
use almanac_db::model::category::EventCategory;
use almanac_db::model::occurrence::OccurrenceFilter;

use crate::calendar::expand::{ExpandOptions, resolve_local};
use crate::calendar::pagination::{Page, paginate};
use crate::calendar::query::{Instance, OccurrenceSet, next_per_event};
use crate::category::resolve_categories;
use crate::error::{ServiceError, ServiceResult};

/// Input format of the list range fields.
pub const DAY_INPUT_FORMAT: &str = "%m/%d/%Y";

/// The local date of `now` in `tz`.
#[must_use]
pub fn today(now: DateTime<Utc>, tz: Tz) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

/// Year and month that contain `now` in `tz`.
#[must_use]
pub fn current_month(now: DateTime<Utc>, tz: Tz) -> (i32, u32) {
    let today = today(now, tz);
    (today.year(), today.month())
}

fn start_of_day(day: NaiveDate, tz: Tz) -> ServiceResult<DateTime<Utc>> {
    resolve_local(day.and_time(NaiveTime::MIN), &tz)
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| CoreError::InvalidInput(format!("no local midnight on {day}")).into())
}

/// Last representable instant of the local `day`.
fn end_of_day(day: NaiveDate, tz: Tz) -> ServiceResult<DateTime<Utc>> {
    let next = day
        .checked_add_days(Days::new(1))
        .ok_or_else(|| CoreError::InvalidInput(format!("{day} is out of range")))?;
    Ok(start_of_day(next, tz)? - TimeDelta::microseconds(1))
}

/// Loads the published occurrence records of the request's site.
async fn published_set<S: CalendarStore>(
    store: &mut S,
    ctx: &RequestContext,
    options: &ExpandOptions,
    categories: &[EventCategory],
) -> ServiceResult<OccurrenceSet> {
    let filter = OccurrenceFilter::for_site(ctx.site_id)
        .published_at(ctx.now)
        .in_categories(categories.iter().map(|category| category.id).collect());
    let records = store.occurrence_records(&filter).await?;
    Ok(OccurrenceSet::new(records, *options))
}

/// First day of `year`/`month` and of the month after it.
fn month_limits(year: i32, month: u32) -> ServiceResult<(NaiveDate, NaiveDate)> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| Some((first, first.checked_add_months(Months::new(1))?)))
        .ok_or_else(|| ServiceError::NotFound(format!("month {year}-{month:02}")))
}

/// One cell of the month grid.
#[derive(Debug, Clone)]
pub struct GridDay {
    pub date: NaiveDate,
    /// Whether the day belongs to the displayed month rather than a neighbour.
    pub in_month: bool,
    pub instances: Vec<Instance>,
}

/// A month laid out in whole weeks, Sunday first.
#[derive(Debug, Clone)]
pub struct MonthGrid {
    pub year: i32,
    pub month: u32,
    pub today: NaiveDate,
    pub weeks: Vec<Vec<GridDay>>,
    /// Last day of the previous month.
    pub prev_month: NaiveDate,
    /// First day of the following month.
    pub next_month: NaiveDate,
    pub categories: Vec<EventCategory>,
}

impl MonthGrid {
    /// ## Summary
    /// First and last day shown for `year`/`month`: the Sunday on or before the
    /// 1st through the Saturday on or after the last day.
    ///
    /// ## Errors
    /// Returns `NotFound` for a month that does not exist.
    pub fn bounds(year: i32, month: u32) -> ServiceResult<(NaiveDate, NaiveDate)> {
        let (first, next_first) = month_limits(year, month)?;
        let last = next_first.pred_opt().unwrap_or(first);

        let lead = u64::from(first.weekday().num_days_from_sunday());
        let trail = u64::from(6 - last.weekday().num_days_from_sunday());
        let shown_first = first.checked_sub_days(Days::new(lead)).unwrap_or(first);
        let shown_last = last.checked_add_days(Days::new(trail)).unwrap_or(last);
        Ok((shown_first, shown_last))
    }

    /// ## Summary
    /// Lays out `set`'s instances for `year`/`month`, grouped by local start day.
    ///
    /// The window runs from the first shown day at 00:00 to the end of the last
    /// shown day, both local.
    ///
    /// ## Errors
    /// Returns `NotFound` for a month that does not exist.
    pub fn build(
        set: &OccurrenceSet,
        year: i32,
        month: u32,
        tz: Tz,
        today: NaiveDate,
    ) -> ServiceResult<Self> {
        let (shown_first, shown_last) = Self::bounds(year, month)?;
        let window_start = start_of_day(shown_first, tz)?;
        let window_end = end_of_day(shown_last, tz)?;

        let mut by_day: BTreeMap<NaiveDate, Vec<Instance>> = BTreeMap::new();
        for instance in set.all_occurrences(Some(window_start), Some(window_end)) {
            by_day
                .entry(instance.start.with_timezone(&tz).date_naive())
                .or_default()
                .push(instance);
        }

        let mut weeks: Vec<Vec<GridDay>> = Vec::new();
        let mut week: Vec<GridDay> = Vec::with_capacity(7);
        for date in shown_first.iter_days().take_while(|day| *day <= shown_last) {
            week.push(GridDay {
                date,
                in_month: date.year() == year && date.month() == month,
                instances: by_day.remove(&date).unwrap_or_default(),
            });
            if week.len() == 7 {
                weeks.push(std::mem::take(&mut week));
            }
        }

        let (first, next_first) = month_limits(year, month)?;
        Ok(Self {
            year,
            month,
            today,
            weeks,
            prev_month: first.pred_opt().unwrap_or(first),
            next_month: next_first,
            categories: Vec::new(),
        })
    }

    /// Number of instances across the grid.
    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.weeks
            .iter()
            .flatten()
            .map(|day| day.instances.len())
            .sum()
    }
}

/// ## Summary
/// Loads the month grid of the request's site, optionally restricted to the
/// categories with the given slugs.
///
/// ## Errors
/// Returns `NotFound` for a month that does not exist, or a database error.
#[tracing::instrument(skip(store, ctx, options), fields(site_id = ctx.site_id))]
pub async fn load_month_grid<S: CalendarStore>(
    store: &mut S,
    ctx: &RequestContext,
    options: &ExpandOptions,
    year: i32,
    month: u32,
    category_slugs: &[String],
) -> ServiceResult<MonthGrid> {
    let categories = resolve_categories(store, ctx.site_id, category_slugs).await?;
    let set = published_set(store, ctx, options, &categories).await?;
    let mut grid = MonthGrid::build(&set, year, month, options.timezone, today(ctx.now, options.timezone))?;
    grid.categories = categories;
    tracing::debug!(instances = grid.instance_count(), "Month grid built");
    Ok(grid)
}

/// The day range of an event list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListRange {
    pub start_day: NaiveDate,
    pub end_day: Option<NaiveDate>,
}

impl ListRange {
    /// ## Summary
    /// Reads the range fields as `MM/DD/YYYY`.
    ///
    /// A missing or unreadable start day becomes `today`. An unreadable end day,
    /// or one before the start day, is dropped.
    #[must_use]
    pub fn parse(start_day: Option<&str>, end_day: Option<&str>, today: NaiveDate) -> Self {
        let parse = |raw: &str| NaiveDate::parse_from_str(raw.trim(), DAY_INPUT_FORMAT).ok();
        let start_day = start_day.and_then(parse).unwrap_or(today);
        let end_day = end_day.and_then(parse).filter(|end| *end >= start_day);
        Self { start_day, end_day }
    }

    /// The instant window: start day 00:00 to the end of the end day, both local.
    ///
    /// ## Errors
    /// Returns `InvalidInput` for days outside the representable range.
    pub fn window(&self, tz: Tz) -> ServiceResult<(DateTime<Utc>, Option<DateTime<Utc>>)> {
        let start = start_of_day(self.start_day, tz)?;
        let end = self.end_day.map(|day| end_of_day(day, tz)).transpose()?;
        Ok((start, end))
    }
}

/// Query parameters of the event list.
#[derive(Debug, Clone, Default)]
pub struct ListParams {
    pub start_day: Option<String>,
    pub end_day: Option<String>,
    pub categories: Vec<String>,
    pub featured_page: Option<String>,
    pub page: Option<String>,
}

/// Featured and regular instances in a day range, paginated separately.
#[derive(Debug, Clone)]
pub struct EventList {
    pub today: NaiveDate,
    pub range: ListRange,
    pub categories: Vec<EventCategory>,
    pub featured: Page<Instance>,
    pub regular: Page<Instance>,
}

impl EventList {
    /// ## Errors
    /// Returns `InvalidInput` for days outside the representable range.
    pub fn build(
        set: &OccurrenceSet,
        range: ListRange,
        listing: &ListingConfig,
        featured_page: Option<&str>,
        page: Option<&str>,
        tz: Tz,
        today: NaiveDate,
    ) -> ServiceResult<Self> {
        let (start, end) = range.window(tz)?;
        let featured = set.clone().featured(true).all_occurrences(Some(start), end);
        let regular = set.clone().featured(false).all_occurrences(Some(start), end);

        Ok(Self {
            today,
            range,
            categories: Vec::new(),
            featured: paginate(
                featured,
                featured_page,
                listing.featured_per_page,
                listing.max_paging_links,
            ),
            regular: paginate(regular, page, listing.per_page, listing.max_paging_links),
        })
    }
}

/// ## Summary
/// Loads the event list of the request's site.
///
/// ## Errors
/// Returns a database error if loading fails.
#[tracing::instrument(skip(store, ctx, options, listing, params), fields(site_id = ctx.site_id))]
pub async fn load_event_list<S: CalendarStore>(
    store: &mut S,
    ctx: &RequestContext,
    options: &ExpandOptions,
    listing: &ListingConfig,
    params: &ListParams,
) -> ServiceResult<EventList> {
    let today = today(ctx.now, options.timezone);
    let range = ListRange::parse(params.start_day.as_deref(), params.end_day.as_deref(), today);
    let categories = resolve_categories(store, ctx.site_id, &params.categories).await?;
    let set = published_set(store, ctx, options, &categories).await?;

    let mut list = EventList::build(
        &set,
        range,
        listing,
        params.featured_page.as_deref(),
        params.page.as_deref(),
        options.timezone,
        today,
    )?;
    list.categories = categories;
    tracing::debug!(
        featured = list.featured.count,
        regular = list.regular.count,
        "Event list built"
    );
    Ok(list)
}

/// The next instance of each upcoming event.
#[derive(Debug, Clone)]
pub struct UpcomingFeed {
    /// The category the feed is restricted to, if one was requested and exists.
    pub category: Option<EventCategory>,
    pub instances: Vec<Instance>,
}

impl UpcomingFeed {
    #[must_use]
    pub fn build(set: &OccurrenceSet, now: DateTime<Utc>, limit: usize) -> Self {
        Self {
            category: None,
            instances: next_per_event(set.upcoming(now), Some(limit)),
        }
    }
}

/// ## Summary
/// Loads the upcoming feed of the request's site.
///
/// An unknown `category_slug` leaves the feed unfiltered and its category unset.
///
/// ## Errors
/// Returns a database error if loading fails.
#[tracing::instrument(skip(store, ctx, options), fields(site_id = ctx.site_id))]
pub async fn load_upcoming<S: CalendarStore>(
    store: &mut S,
    ctx: &RequestContext,
    options: &ExpandOptions,
    category_slug: Option<&str>,
    limit: usize,
) -> ServiceResult<UpcomingFeed> {
    let category = match category_slug.map(str::trim).filter(|slug| !slug.is_empty()) {
        Some(slug) => store.category_by_slug(ctx.site_id, slug).await?,
        None => None,
    };
    let set = published_set(store, ctx, options, category.as_slice()).await?;

    let mut feed = UpcomingFeed::build(&set, ctx.now, limit);
    feed.category = category;
    Ok(feed)
}
