//! Integration tests for the import pipeline.
//!
//! Tests:
//! - Importing a payload in the previous schema, with its image
//! - Failures before the commit leave the store untouched
//! - A failed image fetch or store only drops the image
//! - A failed commit deletes the image it stored
//! - Relative JSON links resolve against the page's final origin

use serde_json::json;

use almanac_core::types::RequestContext;
use almanac_db::db::enums::{ContentStatus, Repeat};
use almanac_db::db::store::CalendarStore;
use almanac_service::error::{ImportError, ServiceError};
use almanac_service::import::{ImportSettings, import_event};
use almanac_test::fixtures::{SITE_ID, context_at, event_page, utc};
use almanac_test::{MemoryAssets, MemoryStore, StubFetcher};

const PAGE_URL: &str = "https://other.example/calendar/event/summer-fair/";
const JSON_URL: &str = "https://other.example/calendar/event/7/json/";
const IMAGE_URL: &str = "https://other.example/static/media/uploads/events/fair%20poster.jpg";

fn ctx() -> RequestContext {
    context_at(utc(2024, 5, 1, 12, 0))
}

fn legacy_payload() -> String {
    json!({
        "model": "calendar.event",
        "pk": 7,
        "fields": {
            "title": "Summer Fair",
            "slug": "summer-fair",
            "status": 2,
            "location_title": "Town Hall",
            "address": "1 Main St",
            "featured": true,
            "featured_image": "uploads/events/fair%20poster.jpg",
            "categories": [1, 2],
            "related_events": [3],
            "description": "Stalls and music"
        },
        "dateandtimes": [
            {"model": "calendar.eventdatetime", "pk": 1,
             "fields": {"event": 7, "day": "2024-06-01", "start_time": "18:00:00", "end_time": "20:30:00"}},
            {"fields": {"event": 7, "day": "2024-06-08", "start_time": "10:00:00"}}
        ]
    })
    .to_string()
}

fn current_payload() -> String {
    json!({
        "model": "events.event",
        "pk": "0190a0e4-0000-7000-8000-000000000000",
        "fields": {
            "title": "Book Club",
            "status": "published",
            "location": "Library"
        },
        "occurrences": [
            {"fields": {
                "start": "2024-06-03T17:00:00+00:00",
                "end": "2024-06-03T18:00:00+00:00",
                "repeat": "RRULE:FREQ=WEEKLY",
                "repeat_until": "2024-07-01T17:00:00+00:00"
            }}
        ]
    })
    .to_string()
}

fn remote_site() -> StubFetcher {
    StubFetcher::new()
        .ok(PAGE_URL, event_page("Summer Fair", "/calendar/event/7/json/"))
        .ok(JSON_URL, legacy_payload())
        .ok(IMAGE_URL, b"\x89PNG fake".to_vec())
}

#[test_log::test(tokio::test)]
async fn imports_legacy_payload_with_image() {
    let mut store = MemoryStore::new();
    let fetcher = remote_site();
    let assets = MemoryAssets::new();
    let ctx = ctx();

    let event = import_event(&mut store, &fetcher, &assets, &ctx, &ImportSettings::default(), PAGE_URL)
        .await
        .expect("import should succeed");

    assert_eq!(event.title, "Summer Fair");
    assert_eq!(event.slug, "summer-fair");
    assert_eq!(event.site_id, SITE_ID);
    assert_eq!(event.user_id, ctx.user_id);
    assert_eq!(event.status, ContentStatus::Published);
    assert_eq!(event.location, "Town Hall");
    assert_eq!(event.address, "1 Main St");
    assert!(event.featured);
    assert_eq!(event.featured_image.as_deref(), Some("uploads/events/fair poster.jpg"));
    assert_eq!(event.metadata, json!({"description": "Stalls and music"}));

    assert_eq!(
        fetcher.requested(),
        vec![PAGE_URL.to_string(), JSON_URL.to_string(), IMAGE_URL.to_string()]
    );
    assert_eq!(
        assets.files().get("uploads/events/fair poster.jpg").map(Vec::as_slice),
        Some(&b"\x89PNG fake"[..])
    );

    let occurrences = store.occurrences_for_event(event.id).await.expect("occurrences");
    assert_eq!(occurrences.len(), 2);
    assert_eq!(occurrences[0].start, utc(2024, 6, 1, 18, 0));
    assert_eq!(occurrences[0].end, Some(utc(2024, 6, 1, 20, 30)));
    assert_eq!(occurrences[1].start, utc(2024, 6, 8, 10, 0));
    assert_eq!(occurrences[1].end, None);

    // Links to records of the other installation are not carried over
    assert!(store.event_category_ids(event.id).await.expect("categories").is_empty());
    assert!(store.related_event_ids(event.id).await.expect("related").is_empty());
}

#[test_log::test(tokio::test)]
async fn imports_current_payload_with_repeat() {
    let mut store = MemoryStore::new();
    let fetcher = StubFetcher::new()
        .ok("https://other.example/book-club/", event_page("Book Club", "https://other.example/book-club/json/"))
        .ok("https://other.example/book-club/json/", current_payload());

    let event = import_event(
        &mut store,
        &fetcher,
        &MemoryAssets::new(),
        &ctx(),
        &ImportSettings::default(),
        "https://other.example/book-club/",
    )
    .await
    .expect("import should succeed");

    assert_eq!(event.location, "Library");
    assert_eq!(event.featured_image, None);
    let occurrences = store.occurrences_for_event(event.id).await.expect("occurrences");
    assert_eq!(occurrences.len(), 1);
    assert_eq!(occurrences[0].repeat, Some(Repeat::Weekly));
    assert_eq!(occurrences[0].repeat_until, Some(utc(2024, 7, 1, 17, 0)));
}

#[test_log::test(tokio::test)]
async fn repeated_import_gets_fresh_slug() {
    let mut store = MemoryStore::new();
    let fetcher = remote_site();
    let assets = MemoryAssets::new();
    let settings = ImportSettings::default();

    let first = import_event(&mut store, &fetcher, &assets, &ctx(), &settings, PAGE_URL)
        .await
        .expect("first import");
    let second = import_event(&mut store, &fetcher, &assets, &ctx(), &settings, PAGE_URL)
        .await
        .expect("second import");

    assert_eq!(first.slug, "summer-fair");
    assert_eq!(second.slug, "summer-fair-1");
    assert_ne!(first.id, second.id);
    assert_eq!(second.featured_image.as_deref(), Some("uploads/events/fair poster_1.jpg"));
}

#[test_log::test(tokio::test)]
async fn page_without_json_link_writes_nothing() {
    let mut store = MemoryStore::new();
    let fetcher = StubFetcher::new().ok(PAGE_URL, "<html><head><title>Fair</title></head></html>");
    let assets = MemoryAssets::new();

    let err = import_event(&mut store, &fetcher, &assets, &ctx(), &ImportSettings::default(), PAGE_URL)
        .await
        .expect_err("import should fail");

    assert!(matches!(err, ServiceError::ImportError(ImportError::DiscoveryError(_))));
    assert_eq!(
        err.to_string(),
        "Couldn't find JSON URL for this event. Does the site support event importing?"
    );
    assert_eq!(store.write_count(), 0);
    assert!(assets.files().is_empty());
}

#[test_log::test(tokio::test)]
async fn unreachable_page_is_fetch_error() {
    let mut store = MemoryStore::new();
    let missing = StubFetcher::new().status(PAGE_URL, 404, "Not Found");
    let unreachable = StubFetcher::new().fail(PAGE_URL, "connection refused");

    let err = import_event(&mut store, &missing, &MemoryAssets::new(), &ctx(), &ImportSettings::default(), PAGE_URL)
        .await
        .expect_err("404 should fail");
    match err {
        ServiceError::ImportError(ImportError::FetchError(detail)) => {
            assert_eq!(detail, format!("HTTP status 404 for url {PAGE_URL}"));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let err = import_event(&mut store, &unreachable, &MemoryAssets::new(), &ctx(), &ImportSettings::default(), PAGE_URL)
        .await
        .expect_err("transport failure should fail");
    assert!(matches!(err, ServiceError::ImportError(ImportError::FetchError(_))));
    assert_eq!(store.write_count(), 0);
}

#[test_log::test(tokio::test)]
async fn malformed_payload_writes_nothing() {
    let mut store = MemoryStore::new();
    let fetcher = StubFetcher::new()
        .ok(PAGE_URL, event_page("Summer Fair", "/calendar/event/7/json/"))
        .ok(JSON_URL, "<html>not json</html>");

    let err = import_event(&mut store, &fetcher, &MemoryAssets::new(), &ctx(), &ImportSettings::default(), PAGE_URL)
        .await
        .expect_err("import should fail");

    assert!(matches!(err, ServiceError::ImportError(ImportError::PayloadParseError(_))));
    assert_eq!(err.to_string(), "Failed to parse JSON data for event.");
    assert_eq!(store.write_count(), 0);
}

#[test_log::test(tokio::test)]
async fn failing_json_request_is_payload_fetch_error() {
    let mut store = MemoryStore::new();
    let fetcher = StubFetcher::new()
        .ok(PAGE_URL, event_page("Summer Fair", "/calendar/event/7/json/"))
        .status(JSON_URL, 500, "oops");

    let err = import_event(&mut store, &fetcher, &MemoryAssets::new(), &ctx(), &ImportSettings::default(), PAGE_URL)
        .await
        .expect_err("import should fail");

    assert!(matches!(err, ServiceError::ImportError(ImportError::PayloadFetchError(_))));
    assert_eq!(store.write_count(), 0);
}

#[test_log::test(tokio::test)]
async fn bad_date_in_payload_writes_nothing() {
    let mut store = MemoryStore::new();
    let payload = json!({
        "model": "calendar.event",
        "fields": {"title": "Summer Fair"},
        "dateandtimes": [{"fields": {"day": "first of June"}}]
    });
    let fetcher = StubFetcher::new()
        .ok(PAGE_URL, event_page("Summer Fair", "/calendar/event/7/json/"))
        .ok(JSON_URL, payload.to_string());

    let err = import_event(&mut store, &fetcher, &MemoryAssets::new(), &ctx(), &ImportSettings::default(), PAGE_URL)
        .await
        .expect_err("import should fail");

    assert!(matches!(err, ServiceError::ImportError(ImportError::ParseError(_))));
    assert_eq!(store.write_count(), 0);
}

#[test_log::test(tokio::test)]
async fn missing_image_only_drops_image() {
    let mut store = MemoryStore::new();
    let fetcher = StubFetcher::new()
        .ok(PAGE_URL, event_page("Summer Fair", "/calendar/event/7/json/"))
        .ok(JSON_URL, legacy_payload())
        .status(IMAGE_URL, 404, "Not Found");

    let event = import_event(&mut store, &fetcher, &MemoryAssets::new(), &ctx(), &ImportSettings::default(), PAGE_URL)
        .await
        .expect("import should succeed without the image");

    assert_eq!(event.featured_image, None);
    assert_eq!(store.stored_occurrences().len(), 2);
}

#[test_log::test(tokio::test)]
async fn unwritable_media_root_only_drops_image() {
    let mut store = MemoryStore::new();

    let event = import_event(
        &mut store,
        &remote_site(),
        &MemoryAssets::failing(),
        &ctx(),
        &ImportSettings::default(),
        PAGE_URL,
    )
    .await
    .expect("import should succeed without the image");

    assert_eq!(event.featured_image, None);
    assert_eq!(store.stored_events().len(), 1);
}

#[test_log::test(tokio::test)]
async fn failed_commit_removes_stored_image() {
    let mut store = MemoryStore::rejecting_events();
    let fetcher = remote_site();
    let assets = MemoryAssets::new();

    let err = import_event(&mut store, &fetcher, &assets, &ctx(), &ImportSettings::default(), PAGE_URL)
        .await
        .expect_err("commit should fail");

    assert!(matches!(err, ServiceError::DatabaseError(_)), "unexpected error: {err:?}");
    assert!(fetcher.requested().contains(&IMAGE_URL.to_string()));
    assert!(assets.files().is_empty());
    assert_eq!(store.write_count(), 0);
}

#[test_log::test(tokio::test)]
async fn relative_link_resolves_against_final_origin() {
    let mut store = MemoryStore::new();
    let fetcher = StubFetcher::new()
        .redirect(
            "http://old.example/e/7",
            "https://new.example/calendar/event/summer-fair/",
            event_page("Summer Fair", "/calendar/event/7/json/"),
        )
        .ok("https://new.example/calendar/event/7/json/", current_payload());

    import_event(
        &mut store,
        &fetcher,
        &MemoryAssets::new(),
        &ctx(),
        &ImportSettings::default(),
        "http://old.example/e/7",
    )
    .await
    .expect("import should succeed");

    assert_eq!(
        fetcher.requested(),
        vec![
            "http://old.example/e/7".to_string(),
            "https://new.example/calendar/event/7/json/".to_string()
        ]
    );
}
