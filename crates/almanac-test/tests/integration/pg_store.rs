//! Integration tests for the Postgres store. Skipped without `TEST_DATABASE_URL`.
//!
//! Tests:
//! - Category positions are assigned in order and close up after a delete
//! - Occurrence records honour the published and category filters
//! - Event slugs are unique per site
//! - A month grid expands occurrences loaded from Postgres

use almanac_db::db::enums::{ContentStatus, Repeat};
use almanac_db::db::pg_store::PgStore;
use almanac_db::db::store::CalendarStore;
use almanac_db::error::DbError;
use almanac_db::model::event::NewEvent;
use almanac_db::model::occurrence::{NewOccurrence, OccurrenceFilter};
use almanac_service::calendar::expand::ExpandOptions;
use almanac_service::calendar::views::load_month_grid;
use almanac_service::category::{create_category, delete_category};
use almanac_test::fixtures::utc;

use super::helpers::*;

fn published(site_id: i32, title: &str, slug: &str) -> NewEvent {
    let mut event = NewEvent::draft(site_id, uuid::Uuid::now_v7(), title);
    event.slug = slug.to_string();
    event.status = ContentStatus::Published;
    event
}

#[test_log::test(tokio::test)]
async fn category_positions_close_gap_after_delete() {
    let Some(db) = TestDb::connect().await else {
        return;
    };
    let ctx = db.context_at(utc(2024, 6, 1, 12, 0));
    let mut conn = db.pool.get().await.expect("connection");
    let mut store = PgStore::new(&mut conn);

    let music = create_category(&mut store, &ctx, "Music").await.expect("music");
    let theatre = create_category(&mut store, &ctx, "Theatre").await.expect("theatre");
    let sports = create_category(&mut store, &ctx, "Sports").await.expect("sports");
    assert_eq!(
        [music.sort_order, theatre.sort_order, sports.sort_order],
        [Some(0), Some(1), Some(2)]
    );

    delete_category(&mut store, theatre.id).await.expect("delete");

    let remaining = store.categories(db.site_id).await.expect("categories");
    let positions: Vec<(String, Option<i32>)> = remaining
        .iter()
        .map(|category| (category.slug.clone(), category.sort_order))
        .collect();
    assert_eq!(
        positions,
        vec![("music".to_string(), Some(0)), ("sports".to_string(), Some(1))]
    );

    let film = create_category(&mut store, &ctx, "Film").await.expect("film");
    assert_eq!(film.sort_order, Some(2));

    assert!(!store.delete_category(theatre.id).await.expect("second delete"));
}

#[test_log::test(tokio::test)]
async fn occurrence_records_filter_published_and_categories() {
    let Some(db) = TestDb::connect().await else {
        return;
    };
    let now = utc(2024, 6, 10, 12, 0);
    let ctx = db.context_at(now);
    let mut conn = db.pool.get().await.expect("connection");
    let mut store = PgStore::new(&mut conn);

    let music = create_category(&mut store, &ctx, "Music").await.expect("music");

    let concert = store
        .insert_event(published(db.site_id, "Concert", "concert"))
        .await
        .expect("concert");
    store
        .link_event_categories(concert.id, &[music.id])
        .await
        .expect("link");
    let meetup = store
        .insert_event(published(db.site_id, "Meetup", "meetup"))
        .await
        .expect("meetup");
    let draft = store
        .insert_event(NewEvent::draft(db.site_id, ctx.user_id, "Draft"))
        .await
        .expect("draft");
    let mut scheduled = published(db.site_id, "Next Month", "next-month");
    scheduled.publish_date = Some(utc(2024, 7, 1, 0, 0));
    let scheduled = store.insert_event(scheduled).await.expect("scheduled");

    for event_id in [concert.id, meetup.id, draft.id, scheduled.id] {
        store
            .insert_occurrence(NewOccurrence::new(
                event_id,
                utc(2024, 6, 12, 19, 0),
                None,
                None,
                None,
            ))
            .await
            .expect("occurrence");
    }
    store
        .insert_occurrence(NewOccurrence::new(
            meetup.id,
            utc(2024, 6, 3, 18, 0),
            Some(utc(2024, 6, 3, 20, 0)),
            Some(Repeat::Weekly),
            Some(utc(2024, 6, 24, 18, 0)),
        ))
        .await
        .expect("weekly occurrence");

    let all = store
        .occurrence_records(&OccurrenceFilter::for_site(db.site_id))
        .await
        .expect("all records");
    assert_eq!(all.len(), 5);

    let visible = store
        .occurrence_records(&OccurrenceFilter::for_site(db.site_id).published_at(now))
        .await
        .expect("published records");
    let titles: Vec<&str> = visible.iter().map(|record| record.event.title.as_str()).collect();
    assert_eq!(titles, vec!["Concert", "Meetup", "Meetup"]);
    assert_eq!(visible[2].occurrence.repeat, Some(Repeat::Weekly));

    let in_music = store
        .occurrence_records(
            &OccurrenceFilter::for_site(db.site_id)
                .published_at(now)
                .in_categories(vec![music.id]),
        )
        .await
        .expect("music records");
    assert_eq!(in_music.len(), 1);
    assert_eq!(in_music[0].event.id, concert.id);
    assert_eq!(&*in_music[0].category_ids, &[music.id]);

    let other_site = store
        .occurrence_records(&OccurrenceFilter::for_site(db.site_id + 1))
        .await
        .expect("other site");
    assert!(other_site.is_empty());
}

#[test_log::test(tokio::test)]
async fn duplicate_slug_within_site_is_conflict() {
    let Some(db) = TestDb::connect().await else {
        return;
    };
    let mut conn = db.pool.get().await.expect("connection");
    let mut store = PgStore::new(&mut conn);

    store
        .insert_event(published(db.site_id, "Fair", "fair"))
        .await
        .expect("first");
    let err = store
        .insert_event(published(db.site_id, "Fair", "fair"))
        .await
        .expect_err("same slug on the same site");
    assert!(matches!(err, DbError::SlugConflict(ref slug) if slug == "fair"), "{err:?}");

    store
        .insert_event(published(db.site_id + 1, "Fair", "fair"))
        .await
        .expect("same slug on another site");
    assert!(store.event_slug_exists(db.site_id, "fair").await.expect("exists"));
}

#[test_log::test(tokio::test)]
async fn month_grid_from_postgres() {
    let Some(db) = TestDb::connect().await else {
        return;
    };
    let ctx = db.context_at(utc(2024, 6, 10, 12, 0));
    let mut conn = db.pool.get().await.expect("connection");
    let mut store = PgStore::new(&mut conn);

    let meetup = store
        .insert_event(published(db.site_id, "Meetup", "meetup"))
        .await
        .expect("meetup");
    store
        .insert_occurrence(NewOccurrence::new(
            meetup.id,
            utc(2024, 6, 3, 18, 0),
            None,
            Some(Repeat::Weekly),
            Some(utc(2024, 6, 24, 18, 0)),
        ))
        .await
        .expect("weekly occurrence");

    let options = ExpandOptions::new(chrono_tz::UTC, 1000);
    let grid = load_month_grid(&mut store, &ctx, &options, 2024, 6, &[])
        .await
        .expect("grid");

    let starts: Vec<_> = grid
        .weeks
        .iter()
        .flatten()
        .flat_map(|day| day.instances.iter().map(|instance| instance.start))
        .collect();
    assert_eq!(
        starts,
        vec![
            utc(2024, 6, 3, 18, 0),
            utc(2024, 6, 10, 18, 0),
            utc(2024, 6, 17, 18, 0),
            utc(2024, 6, 24, 18, 0)
        ]
    );
}
