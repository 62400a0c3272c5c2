//! Integration tests for category administration.
//!
//! Tests:
//! - Positions stay dense across creation and deletion
//! - Title validation and slug de-duplication
//! - Deleting a category unlinks its events

use almanac_db::db::store::CalendarStore;
use almanac_service::category::{create_category, delete_category, list_categories, resolve_categories};
use almanac_service::error::ServiceError;
use almanac_test::MemoryStore;
use almanac_test::fixtures::{context_at, published_event, seed_event, utc};

#[test_log::test(tokio::test)]
async fn positions_close_gap_after_delete() {
    let mut store = MemoryStore::new();
    let ctx = context_at(utc(2024, 6, 1, 9, 0));

    let first = create_category(&mut store, &ctx, "Music").await.expect("create Music");
    let second = create_category(&mut store, &ctx, "Theatre").await.expect("create Theatre");
    let third = create_category(&mut store, &ctx, "Family").await.expect("create Family");
    assert_eq!(
        [first.sort_order, second.sort_order, third.sort_order],
        [Some(0), Some(1), Some(2)]
    );

    delete_category(&mut store, second.id).await.expect("delete Theatre");
    let fourth = create_category(&mut store, &ctx, "Outdoors").await.expect("create Outdoors");

    let listed = list_categories(&mut store, &ctx).await.expect("list");
    let order: Vec<(&str, Option<i32>)> = listed
        .iter()
        .map(|category| (category.title.as_str(), category.sort_order))
        .collect();
    assert_eq!(
        order,
        vec![("Music", Some(0)), ("Family", Some(1)), ("Outdoors", Some(2))]
    );
    assert_eq!(fourth.sort_order, Some(2));
    assert_eq!(store.stored_categories().len(), 3);
}

#[test_log::test(tokio::test)]
async fn blank_title_is_rejected() {
    let mut store = MemoryStore::new();
    let ctx = context_at(utc(2024, 6, 1, 9, 0));

    let err = create_category(&mut store, &ctx, "   ").await.expect_err("blank title");
    assert!(matches!(err, ServiceError::ValidationError(_)));
    assert_eq!(store.write_count(), 0);
}

#[test_log::test(tokio::test)]
async fn same_title_gets_suffixed_slug() {
    let mut store = MemoryStore::new();
    let ctx = context_at(utc(2024, 6, 1, 9, 0));

    let first = create_category(&mut store, &ctx, "Live Jazz").await.expect("first");
    let second = create_category(&mut store, &ctx, "Live Jazz").await.expect("second");
    assert_eq!(first.slug, "live-jazz");
    assert_eq!(second.slug, "live-jazz-1");
}

#[test_log::test(tokio::test)]
async fn deleting_unknown_category_is_not_found() {
    let mut store = MemoryStore::new();

    let err = delete_category(&mut store, uuid::Uuid::now_v7())
        .await
        .expect_err("nothing to delete");
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[test_log::test(tokio::test)]
async fn deleted_category_is_unlinked() {
    let mut store = MemoryStore::new();
    let ctx = context_at(utc(2024, 6, 1, 9, 0));
    let music = create_category(&mut store, &ctx, "Music").await.expect("create");
    let event = seed_event(&mut store, published_event("Concert"), &[music.id])
        .await
        .expect("seed event");

    delete_category(&mut store, music.id).await.expect("delete");

    assert!(store.event_category_ids(event.id).await.expect("links").is_empty());
    let resolved = resolve_categories(&mut store, ctx.site_id, &["music".to_string()])
        .await
        .expect("resolve");
    assert!(resolved.is_empty());
}
