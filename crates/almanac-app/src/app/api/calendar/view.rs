//! Response bodies of the public calendar.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use almanac_db::db::enums::Repeat;
use almanac_db::model::category::EventCategory;
use almanac_db::model::event::Event;
use almanac_interchange::discovery::{alternate_link_tag, escape_html};
use almanac_service::calendar::display::{
    calendar_link, directions_url, duration_info, repetition_info,
};
use almanac_service::calendar::pagination::Page;
use almanac_service::calendar::query::Instance;
use almanac_service::calendar::views::{EventList, MonthGrid, UpcomingFeed};

use crate::app::api::util::{event_detail_path, month_path};
use crate::error::AppResult;

#[derive(Debug, Serialize)]
pub struct CategoryView {
    pub id: uuid::Uuid,
    pub title: String,
    pub slug: String,
    pub order: Option<i32>,
}

impl From<&EventCategory> for CategoryView {
    fn from(category: &EventCategory) -> Self {
        Self {
            id: category.id,
            title: category.title.clone(),
            slug: category.slug.clone(),
            order: category.sort_order,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EventSummary {
    pub id: uuid::Uuid,
    pub title: String,
    pub slug: String,
    pub url: String,
    pub featured: bool,
    pub featured_image: Option<String>,
    pub location: String,
    pub address: String,
    pub link: String,
}

/// One instance with the strings a page shows next to it.
#[derive(Debug, Serialize)]
pub struct InstanceView {
    pub occurrence_id: uuid::Uuid,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub repeat: Option<Repeat>,
    pub event: EventSummary,
    pub duration: String,
    pub repetition: String,
    pub calendar_link: String,
    pub directions: Option<String>,
}

/// Renders instances for one request: local times in `timezone`, absolute
/// links under `origin`.
#[derive(Debug, Clone, Copy)]
pub struct Presenter<'a> {
    pub timezone: Tz,
    pub origin: &'a str,
}

impl Presenter<'_> {
    fn event_summary(&self, event: &Event) -> EventSummary {
        EventSummary {
            id: event.id,
            title: event.title.clone(),
            slug: event.slug.clone(),
            url: format!("{}{}", self.origin, event_detail_path(&event.slug)),
            featured: event.featured,
            featured_image: event.featured_image.clone(),
            location: event.location.clone(),
            address: event.address.clone(),
            link: event.link.clone(),
        }
    }

    /// ## Errors
    /// Fails only if an outbound link cannot be built.
    pub fn instance(&self, instance: &Instance) -> AppResult<InstanceView> {
        let event = instance.event();
        let occurrence = instance.occurrence();
        let summary = self.event_summary(event);
        Ok(InstanceView {
            occurrence_id: occurrence.id,
            start: instance.start,
            end: instance.end,
            repeat: occurrence.repeat,
            duration: duration_info(instance.start, instance.end, self.timezone),
            repetition: repetition_info(occurrence, self.timezone),
            calendar_link: calendar_link(event, occurrence, &summary.url)?,
            directions: directions_url(&event.location)?,
            event: summary,
        })
    }

    /// ## Errors
    /// Fails only if an outbound link cannot be built.
    pub fn instances(&self, instances: &[Instance]) -> AppResult<Vec<InstanceView>> {
        instances.iter().map(|instance| self.instance(instance)).collect()
    }

    /// ## Errors
    /// Fails only if an outbound link cannot be built.
    pub fn page(&self, page: Page<Instance>) -> AppResult<Page<InstanceView>> {
        Ok(Page {
            items: self.instances(&page.items)?,
            number: page.number,
            num_pages: page.num_pages,
            count: page.count,
            visible_page_range: page.visible_page_range,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct DayView {
    pub date: NaiveDate,
    pub in_month: bool,
    pub is_today: bool,
    pub instances: Vec<InstanceView>,
}

#[derive(Debug, Serialize)]
pub struct MonthLink {
    pub year: i32,
    pub month: u32,
    pub path: String,
}

impl MonthLink {
    fn of(day: NaiveDate) -> Self {
        Self {
            year: day.year(),
            month: day.month(),
            path: month_path(day.year(), day.month()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MonthGridView {
    pub year: i32,
    pub month: u32,
    pub today: NaiveDate,
    pub weeks: Vec<Vec<DayView>>,
    pub previous: MonthLink,
    pub next: MonthLink,
    pub categories: Vec<CategoryView>,
}

impl MonthGridView {
    /// ## Errors
    /// Fails only if an outbound link cannot be built.
    pub fn build(grid: &MonthGrid, presenter: &Presenter<'_>) -> AppResult<Self> {
        let weeks = grid
            .weeks
            .iter()
            .map(|week| {
                week.iter()
                    .map(|day| {
                        Ok(DayView {
                            date: day.date,
                            in_month: day.in_month,
                            is_today: day.date == grid.today,
                            instances: presenter.instances(&day.instances)?,
                        })
                    })
                    .collect::<AppResult<Vec<_>>>()
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Self {
            year: grid.year,
            month: grid.month,
            today: grid.today,
            weeks,
            previous: MonthLink::of(grid.prev_month),
            next: MonthLink::of(grid.next_month),
            categories: grid.categories.iter().map(CategoryView::from).collect(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct EventListView {
    pub today: NaiveDate,
    pub start_day: NaiveDate,
    pub end_day: Option<NaiveDate>,
    pub categories: Vec<CategoryView>,
    pub featured: Page<InstanceView>,
    pub events: Page<InstanceView>,
}

impl EventListView {
    /// ## Errors
    /// Fails only if an outbound link cannot be built.
    pub fn build(list: EventList, presenter: &Presenter<'_>) -> AppResult<Self> {
        Ok(Self {
            today: list.today,
            start_day: list.range.start_day,
            end_day: list.range.end_day,
            categories: list.categories.iter().map(CategoryView::from).collect(),
            featured: presenter.page(list.featured)?,
            events: presenter.page(list.regular)?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct UpcomingView {
    pub category: Option<CategoryView>,
    pub instances: Vec<InstanceView>,
}

impl UpcomingView {
    /// ## Errors
    /// Fails only if an outbound link cannot be built.
    pub fn build(feed: &UpcomingFeed, presenter: &Presenter<'_>) -> AppResult<Self> {
        Ok(Self {
            category: feed.category.as_ref().map(CategoryView::from),
            instances: presenter.instances(&feed.instances)?,
        })
    }
}

/// ## Summary
/// The public detail page of an event, reduced to the document head that other
/// installations read to find the event's JSON representation.
#[must_use]
pub fn discovery_page(event: &Event, json_href: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n{link}\n</head>\n<body></body>\n</html>\n",
        title = escape_html(&event.title),
        link = alternate_link_tag(json_href),
    )
}
