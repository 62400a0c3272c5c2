//! Integration tests for the calendar presentations loaded from a store.
//!
//! Tests:
//! - Month grid with and without a category restriction
//! - Event list with featured separation and pagination
//! - Upcoming feed, including an unknown category

use chrono::NaiveDate;
use chrono_tz::Tz;

use almanac_core::types::{ListingConfig, RequestContext};
use almanac_db::db::enums::{ContentStatus, Repeat};
use almanac_service::calendar::expand::ExpandOptions;
use almanac_service::calendar::views::{ListParams, load_event_list, load_month_grid, load_upcoming};
use almanac_service::error::ServiceError;
use almanac_test::MemoryStore;
use almanac_test::fixtures::{
    context_at, published_event, seed_category, seed_event, seed_occurrence, utc,
};

struct Calendar {
    store: MemoryStore,
    ctx: RequestContext,
    options: ExpandOptions,
    weekly_id: uuid::Uuid,
    concert_id: uuid::Uuid,
}

/// A weekly meetup on Mondays in June 2024, a featured concert in the
/// "music" category on June 12, and a draft that never shows up.
async fn calendar() -> Calendar {
    let mut store = MemoryStore::new();
    let music = seed_category(&mut store, "Music", "music").await.expect("category");

    let weekly = seed_event(&mut store, published_event("Meetup"), &[])
        .await
        .expect("meetup");
    seed_occurrence(
        &mut store,
        weekly.id,
        utc(2024, 6, 3, 10, 0),
        Some(utc(2024, 6, 3, 11, 0)),
        Some(Repeat::Weekly),
        Some(utc(2024, 6, 24, 10, 0)),
    )
    .await
    .expect("weekly occurrence");

    let mut concert = published_event("Concert");
    concert.featured = true;
    let concert = seed_event(&mut store, concert, &[music.id]).await.expect("concert");
    seed_occurrence(&mut store, concert.id, utc(2024, 6, 12, 19, 0), None, None, None)
        .await
        .expect("concert occurrence");

    let mut draft = published_event("Secret");
    draft.status = ContentStatus::Draft;
    let draft = seed_event(&mut store, draft, &[music.id]).await.expect("draft");
    seed_occurrence(&mut store, draft.id, utc(2024, 6, 14, 19, 0), None, None, None)
        .await
        .expect("draft occurrence");

    Calendar {
        store,
        ctx: context_at(utc(2024, 6, 10, 12, 0)),
        options: ExpandOptions::new(Tz::UTC, 100),
        weekly_id: weekly.id,
        concert_id: concert.id,
    }
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

#[test_log::test(tokio::test)]
async fn month_grid_places_instances_by_day() {
    let mut cal = calendar().await;

    let grid = load_month_grid(&mut cal.store, &cal.ctx, &cal.options, 2024, 6, &[])
        .await
        .expect("grid");

    assert_eq!(grid.weeks.len(), 6);
    assert_eq!(grid.weeks[0][0].date, date(2024, 5, 26));
    assert_eq!(grid.today, date(2024, 6, 10));
    assert_eq!(grid.instance_count(), 5);

    let busy: Vec<NaiveDate> = grid
        .weeks
        .iter()
        .flatten()
        .filter(|day| !day.instances.is_empty())
        .map(|day| day.date)
        .collect();
    assert_eq!(
        busy,
        vec![
            date(2024, 6, 3),
            date(2024, 6, 10),
            date(2024, 6, 12),
            date(2024, 6, 17),
            date(2024, 6, 24)
        ]
    );
}

#[test_log::test(tokio::test)]
async fn month_grid_restricted_to_category() {
    let mut cal = calendar().await;

    let grid = load_month_grid(
        &mut cal.store,
        &cal.ctx,
        &cal.options,
        2024,
        6,
        &["music".to_string(), "unknown".to_string()],
    )
    .await
    .expect("grid");

    assert_eq!(grid.instance_count(), 1);
    assert_eq!(grid.categories.len(), 1);
    assert_eq!(grid.categories[0].slug, "music");
}

#[test_log::test(tokio::test)]
async fn month_grid_rejects_impossible_month() {
    let mut cal = calendar().await;

    let err = load_month_grid(&mut cal.store, &cal.ctx, &cal.options, 2024, 13, &[])
        .await
        .expect_err("no 13th month");
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[test_log::test(tokio::test)]
async fn event_list_separates_featured_and_paginates() {
    let mut cal = calendar().await;
    let listing = ListingConfig {
        featured_per_page: 10,
        per_page: 2,
        max_paging_links: 10,
    };

    let first = load_event_list(&mut cal.store, &cal.ctx, &cal.options, &listing, &ListParams::default())
        .await
        .expect("list");
    assert_eq!(first.range.start_day, date(2024, 6, 10));
    assert_eq!(first.featured.count, 1);
    assert_eq!(first.featured.items[0].event_id(), cal.concert_id);
    assert_eq!(first.regular.count, 3);
    assert_eq!(first.regular.num_pages, 2);
    assert_eq!(first.regular.items.len(), 2);

    let params = ListParams {
        page: Some("2".to_string()),
        ..ListParams::default()
    };
    let second = load_event_list(&mut cal.store, &cal.ctx, &cal.options, &listing, &params)
        .await
        .expect("second page");
    assert_eq!(second.regular.number, 2);
    assert_eq!(second.regular.items.len(), 1);
    assert_eq!(second.regular.items[0].start, utc(2024, 6, 24, 10, 0));
}

#[test_log::test(tokio::test)]
async fn event_list_honours_day_range() {
    let mut cal = calendar().await;
    let params = ListParams {
        start_day: Some("06/01/2024".to_string()),
        end_day: Some("06/10/2024".to_string()),
        ..ListParams::default()
    };

    let list = load_event_list(&mut cal.store, &cal.ctx, &cal.options, &ListingConfig::default(), &params)
        .await
        .expect("list");

    assert_eq!(list.featured.count, 0);
    let starts: Vec<_> = list.regular.items.iter().map(|instance| instance.start).collect();
    assert_eq!(starts, vec![utc(2024, 6, 3, 10, 0), utc(2024, 6, 10, 10, 0)]);
}

#[test_log::test(tokio::test)]
async fn upcoming_lists_next_instance_per_event() {
    let mut cal = calendar().await;

    let feed = load_upcoming(&mut cal.store, &cal.ctx, &cal.options, None, 5)
        .await
        .expect("feed");
    let next: Vec<_> = feed
        .instances
        .iter()
        .map(|instance| (instance.event_id(), instance.start))
        .collect();
    assert_eq!(
        next,
        vec![
            (cal.concert_id, utc(2024, 6, 12, 19, 0)),
            (cal.weekly_id, utc(2024, 6, 17, 10, 0))
        ]
    );

    let limited = load_upcoming(&mut cal.store, &cal.ctx, &cal.options, None, 1)
        .await
        .expect("limited feed");
    assert_eq!(limited.instances.len(), 1);
}

#[test_log::test(tokio::test)]
async fn upcoming_with_category() {
    let mut cal = calendar().await;

    let music = load_upcoming(&mut cal.store, &cal.ctx, &cal.options, Some("music"), 5)
        .await
        .expect("music feed");
    assert_eq!(music.category.as_ref().map(|category| category.slug.as_str()), Some("music"));
    assert_eq!(music.instances.len(), 1);

    let unknown = load_upcoming(&mut cal.store, &cal.ctx, &cal.options, Some("nope"), 5)
        .await
        .expect("unfiltered feed");
    assert!(unknown.category.is_none());
    assert_eq!(unknown.instances.len(), 2);
}
