//! Integration tests for event duplication and export.
//!
//! Tests:
//! - A duplicate is an unpublished copy with categories and occurrences
//! - The export carries occurrences and a stable entity tag
//! - Only published events of the site are exported publicly

use almanac_db::db::enums::{ContentStatus, Repeat};
use almanac_db::db::store::CalendarStore;
use almanac_interchange::payload::EventPayload;
use almanac_service::error::ServiceError;
use almanac_service::event::{duplicate_event, published_event_by_slug};
use almanac_service::export::{entity_tag, export_event, export_published_event};
use almanac_test::MemoryStore;
use almanac_test::fixtures::{
    SITE_ID, context_at, published_event, seed_category, seed_event, seed_occurrence, utc,
};

#[test_log::test(tokio::test)]
async fn duplicate_is_draft_copy() {
    let mut store = MemoryStore::new();
    let ctx = context_at(utc(2024, 6, 1, 9, 0));
    let music = seed_category(&mut store, "Music", "music").await.expect("category");

    let mut source = published_event("Summer Fair");
    source.publish_date = Some(utc(2024, 5, 1, 0, 0));
    source.expiry_date = Some(utc(2024, 9, 1, 0, 0));
    source.location = "Town Hall".to_string();
    source.featured = true;
    let source = seed_event(&mut store, source, &[music.id]).await.expect("event");
    seed_occurrence(&mut store, source.id, utc(2024, 6, 1, 18, 0), Some(utc(2024, 6, 1, 20, 0)), None, None)
        .await
        .expect("first occurrence");
    seed_occurrence(
        &mut store,
        source.id,
        utc(2024, 6, 3, 10, 0),
        None,
        Some(Repeat::Weekly),
        Some(utc(2024, 7, 1, 10, 0)),
    )
    .await
    .expect("second occurrence");

    let copy = duplicate_event(&mut store, &ctx, source.id).await.expect("duplicate");

    assert_ne!(copy.id, source.id);
    assert_eq!(copy.title, "[Duplicate] Summer Fair");
    assert_eq!(copy.slug, "duplicate-summer-fair");
    assert_eq!(copy.status, ContentStatus::Draft);
    assert_eq!(copy.publish_date, None);
    assert_eq!(copy.expiry_date, None);
    assert_eq!(copy.location, "Town Hall");
    assert!(copy.featured);
    assert_eq!(copy.user_id, source.user_id);

    assert_eq!(store.event_category_ids(copy.id).await.expect("links"), vec![music.id]);
    let copied = store.occurrences_for_event(copy.id).await.expect("occurrences");
    let original = store.occurrences_for_event(source.id).await.expect("occurrences");
    assert_eq!(copied.len(), 2);
    for (copy, original) in copied.iter().zip(&original) {
        assert_ne!(copy.id, original.id);
        assert_eq!(
            (copy.start, copy.end, copy.repeat, copy.repeat_until),
            (original.start, original.end, original.repeat, original.repeat_until)
        );
    }

    let again = duplicate_event(&mut store, &ctx, source.id).await.expect("second duplicate");
    assert_eq!(again.slug, "duplicate-summer-fair-1");

    // The draft copy is not visible publicly
    let err = published_event_by_slug(&mut store, &ctx, &copy.slug)
        .await
        .expect_err("draft is hidden");
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[test_log::test(tokio::test)]
async fn duplicating_unknown_event_is_not_found() {
    let mut store = MemoryStore::new();
    let ctx = context_at(utc(2024, 6, 1, 9, 0));

    let err = duplicate_event(&mut store, &ctx, uuid::Uuid::now_v7())
        .await
        .expect_err("no source");
    assert!(matches!(err, ServiceError::NotFound(_)));
    assert_eq!(store.write_count(), 0);
}

#[test_log::test(tokio::test)]
async fn export_carries_occurrences_and_tag() {
    let mut store = MemoryStore::new();
    let mut event = published_event("Book Club");
    event.metadata = serde_json::json!({"description": "Monthly reading"});
    let event = seed_event(&mut store, event, &[]).await.expect("event");
    seed_occurrence(
        &mut store,
        event.id,
        utc(2024, 6, 3, 17, 0),
        Some(utc(2024, 6, 3, 18, 0)),
        Some(Repeat::Monthly),
        None,
    )
    .await
    .expect("occurrence");

    let exported = export_event(&mut store, event.id).await.expect("export");

    assert_eq!(exported.etag, entity_tag(&exported.body));
    assert!(exported.etag.starts_with('"') && exported.etag.ends_with('"'));
    let parsed = EventPayload::from_slice(&exported.body).expect("body is a payload");
    assert_eq!(parsed.field_str("title"), Some("Book Club"));
    assert_eq!(parsed.field_str("description"), Some("Monthly reading"));
    assert_eq!(parsed.occurrences.len(), 1);
    assert_eq!(
        parsed.occurrences[0].fields.get("repeat"),
        Some(&serde_json::json!("RRULE:FREQ=MONTHLY"))
    );

    let again = export_event(&mut store, event.id).await.expect("export again");
    assert_eq!(again.etag, exported.etag);
}

#[test_log::test(tokio::test)]
async fn public_export_hides_drafts_and_other_sites() {
    let mut store = MemoryStore::new();
    let ctx = context_at(utc(2024, 6, 1, 9, 0));

    let mut draft = published_event("Rehearsal");
    draft.status = ContentStatus::Draft;
    let draft = seed_event(&mut store, draft, &[]).await.expect("draft");

    let mut elsewhere = published_event("Elsewhere");
    elsewhere.site_id = SITE_ID + 1;
    let elsewhere = seed_event(&mut store, elsewhere, &[]).await.expect("other site");

    let published = seed_event(&mut store, published_event("Concert"), &[])
        .await
        .expect("published");

    for hidden in [draft.id, elsewhere.id] {
        let err = export_published_event(&mut store, &ctx, hidden)
            .await
            .expect_err("not exported");
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
    let exported = export_published_event(&mut store, &ctx, published.id)
        .await
        .expect("published export");
    assert_eq!(exported.payload.field_str("slug"), Some("concert"));
}
