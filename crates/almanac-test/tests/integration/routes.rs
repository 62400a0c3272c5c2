//! Integration tests for the HTTP routes, through salvo's test client.
//!
//! Tests:
//! - Redirects, health and authentication without a database
//! - Discovery page, JSON export and conditional GET against Postgres
//! - The JSON route of an event id is matched before the slug route
//! - Staff endpoints create categories for the requesting user
//! - An event exported by this server imports back into it

use chrono::{Datelike, Utc};
use salvo::http::StatusCode;
use serde_json::json;

use almanac_db::db::enums::Repeat;
use almanac_db::db::pg_store::PgStore;
use almanac_db::db::store::CalendarStore;
use almanac_db::model::event::{Event, NewEvent};
use almanac_db::model::occurrence::NewOccurrence;
use almanac_interchange::discovery::find_alternate_json;
use almanac_service::export::entity_tag;
use almanac_service::import::{ImportSettings, import_event};
use almanac_test::fixtures::{published_event, utc};
use almanac_test::{MemoryAssets, StubFetcher};

use super::helpers::*;

const SITE_WITHOUT_DB: i32 = 1;

/// Seeds a published weekly event and a draft on the test site.
async fn seed_fair(db: &TestDb) -> (Event, Event) {
    let mut conn = db.pool.get().await.expect("connection");
    let mut store = PgStore::new(&mut conn);

    let mut fair = published_event("Summer Fair");
    fair.site_id = db.site_id;
    fair.location = "Town Hall".to_string();
    let fair = store.insert_event(fair).await.expect("fair");
    store
        .insert_occurrence(NewOccurrence::new(
            fair.id,
            utc(2024, 6, 1, 18, 0),
            Some(utc(2024, 6, 1, 20, 0)),
            Some(Repeat::Weekly),
            Some(utc(2024, 6, 29, 18, 0)),
        ))
        .await
        .expect("occurrence");

    let mut draft = NewEvent::draft(db.site_id, uuid::Uuid::now_v7(), "Draft");
    draft.slug = "draft".to_string();
    let draft = store.insert_event(draft).await.expect("draft");

    (fair, draft)
}

#[test_log::test(tokio::test)]
async fn calendar_root_redirects_to_list() {
    let service = create_test_service(test_config(SITE_WITHOUT_DB));

    let response = TestRequest::get("/api/calendar/")
        .send(&service)
        .await
        .assert_status(StatusCode::FOUND);
    assert_eq!(response.header("location"), Some("/api/calendar/list/"));
}

#[test_log::test(tokio::test)]
async fn month_redirect_points_at_current_month() {
    let service = create_test_service(test_config(SITE_WITHOUT_DB));
    let month_of = |at: chrono::DateTime<Utc>| format!("/api/calendar/{}/{:02}/", at.year(), at.month());

    let before = month_of(Utc::now());
    let response = TestRequest::get("/api/calendar/month/")
        .send(&service)
        .await
        .assert_status(StatusCode::FOUND);
    let after = month_of(Utc::now());

    let location = response.header("location").expect("location header");
    assert!(location == before || location == after, "unexpected location {location}");
}

#[test_log::test(tokio::test)]
async fn healthcheck_without_database_is_unavailable() {
    let service = create_test_service(test_config(SITE_WITHOUT_DB));

    let response = TestRequest::get("/api/healthcheck")
        .send(&service)
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        response.json(),
        json!({"status": "degraded", "database": "unavailable"})
    );
}

#[test_log::test(tokio::test)]
async fn staff_endpoints_need_a_user() {
    let service = create_test_service(test_config(SITE_WITHOUT_DB));

    let _response = TestRequest::post("/api/admin/import")
        .json_body(&json!({"event_url": "https://other.example/calendar/event/fair/"}))
        .send(&service)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let _response = TestRequest::post("/api/admin/categories")
        .header("x-remote-user", "admin")
        .json_body(&json!({"title": "Music"}))
        .send(&service)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[test_log::test(tokio::test)]
async fn discovery_page_leads_to_json_export() {
    let Some(db) = TestDb::connect().await else {
        return;
    };
    let (fair, _) = seed_fair(&db).await;
    let service = create_db_test_service(&db);

    let page = TestRequest::get("/api/calendar/event/summer-fair/")
        .send(&service)
        .await
        .assert_status(StatusCode::OK);
    let html = page.body_text();
    assert!(html.contains("Summer Fair"));

    let href = find_alternate_json(&html).expect("page advertises its JSON");
    assert_eq!(href, format!("/api/calendar/event/{}/json/", fair.id));

    let export = TestRequest::get(&href)
        .send(&service)
        .await
        .assert_status(StatusCode::OK);
    let etag = export.header("etag").expect("etag header").to_string();
    assert_eq!(etag, entity_tag(&export.body));
    let payload = export.json();
    assert_eq!(payload["fields"]["title"], "Summer Fair");
    assert_eq!(payload["occurrences"].as_array().map(Vec::len), Some(1));

    let unchanged = TestRequest::get(&href)
        .if_none_match(&etag)
        .send(&service)
        .await
        .assert_status(StatusCode::NOT_MODIFIED);
    assert!(unchanged.body.is_empty());
    assert_eq!(unchanged.header("etag"), Some(etag.as_str()));

    let _response = TestRequest::get(&href)
        .if_none_match("\"stale\"")
        .send(&service)
        .await
        .assert_status(StatusCode::OK);
}

#[test_log::test(tokio::test)]
async fn json_route_is_matched_before_slug_route() {
    let Some(db) = TestDb::connect().await else {
        return;
    };
    let (fair, draft) = seed_fair(&db).await;
    let service = create_db_test_service(&db);

    // An event whose slug is literally "json" is still reachable by slug
    let mut conn = db.pool.get().await.expect("connection");
    let mut store = PgStore::new(&mut conn);
    let mut literal = published_event("Json");
    literal.site_id = db.site_id;
    literal.slug = "json".to_string();
    let literal = store.insert_event(literal).await.expect("literal");

    let by_id = TestRequest::get(&format!("/api/calendar/event/{}/json/", fair.id))
        .send(&service)
        .await
        .assert_status(StatusCode::OK);
    assert_eq!(by_id.header("content-type"), Some("application/json"));

    let by_slug = TestRequest::get("/api/calendar/event/json/")
        .send(&service)
        .await
        .assert_status(StatusCode::OK);
    assert_eq!(
        find_alternate_json(&by_slug.body_text()),
        Some(format!("/api/calendar/event/{}/json/", literal.id))
    );

    let _response = TestRequest::get(&format!("/api/calendar/event/{}/json/", draft.id))
        .send(&service)
        .await
        .assert_status(StatusCode::NOT_FOUND);
    let _response = TestRequest::get("/api/calendar/event/summer-fair/json/")
        .send(&service)
        .await
        .assert_status(StatusCode::NOT_FOUND);
    let _response = TestRequest::get("/api/calendar/event/draft/")
        .send(&service)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[test_log::test(tokio::test)]
async fn healthcheck_with_database_is_ok() {
    let Some(db) = TestDb::connect().await else {
        return;
    };
    let service = create_db_test_service(&db);

    let response = TestRequest::get("/api/healthcheck")
        .send(&service)
        .await
        .assert_status(StatusCode::OK);
    assert_eq!(response.json(), json!({"status": "ok", "database": "ok"}));
}

#[test_log::test(tokio::test)]
async fn staff_create_and_delete_categories() {
    let Some(db) = TestDb::connect().await else {
        return;
    };
    let service = create_db_test_service(&db);
    let staff = uuid::Uuid::now_v7();

    let created = TestRequest::post("/api/admin/categories")
        .as_user(staff)
        .json_body(&json!({"title": "Live Music"}))
        .send(&service)
        .await
        .assert_status(StatusCode::CREATED)
        .json();
    assert_eq!(created["slug"], "live-music");
    assert_eq!(created["order"], 0);

    let _response = TestRequest::post("/api/admin/categories")
        .as_user(staff)
        .json_body(&json!({"title": "Theatre"}))
        .send(&service)
        .await
        .assert_status(StatusCode::CREATED);

    let id = created["id"].as_str().expect("category id");
    let _response = TestRequest::delete(&format!("/api/admin/categories/{id}"))
        .as_user(staff)
        .send(&service)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let listed = TestRequest::get("/api/admin/categories")
        .as_user(staff)
        .send(&service)
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(listed, json!([{
        "id": listed[0]["id"],
        "title": "Theatre",
        "slug": "theatre",
        "order": 0
    }]));
}

#[test_log::test(tokio::test)]
async fn exported_event_imports_back() {
    let Some(db) = TestDb::connect().await else {
        return;
    };
    let (fair, _) = seed_fair(&db).await;
    let service = create_db_test_service(&db);

    let page_path = "/api/calendar/event/summer-fair/";
    let page = TestRequest::get(page_path)
        .send(&service)
        .await
        .assert_status(StatusCode::OK);
    let href = find_alternate_json(&page.body_text()).expect("page advertises its JSON");
    let export = TestRequest::get(&href)
        .send(&service)
        .await
        .assert_status(StatusCode::OK);

    let page_url = format!("{TEST_ORIGIN}{page_path}");
    let fetcher = StubFetcher::new()
        .ok(&page_url, page.body)
        .ok(&format!("{TEST_ORIGIN}{href}"), export.body);

    let ctx = db.context_at(utc(2024, 6, 10, 12, 0));
    let mut conn = db.pool.get().await.expect("connection");
    let mut store = PgStore::new(&mut conn);
    let imported = import_event(
        &mut store,
        &fetcher,
        &MemoryAssets::new(),
        &ctx,
        &ImportSettings::default(),
        &page_url,
    )
    .await
    .expect("import should succeed");

    assert_ne!(imported.id, fair.id);
    assert_eq!(imported.title, "Summer Fair");
    assert_eq!(imported.slug, "summer-fair-1");
    assert_eq!(imported.location, "Town Hall");
    assert_eq!(imported.user_id, ctx.user_id);

    let original = store.occurrences_for_event(fair.id).await.expect("original");
    let copied = store.occurrences_for_event(imported.id).await.expect("copied");
    assert_eq!(copied.len(), 1);
    assert_eq!(copied[0].start, original[0].start);
    assert_eq!(copied[0].end, original[0].end);
    assert_eq!(copied[0].repeat, Some(Repeat::Weekly));
    assert_eq!(copied[0].repeat_until, original[0].repeat_until);
}
