//! Event lookup and duplication.

use almanac_core::types::RequestContext;
use almanac_core::util::slug::{generate_slug, slug_candidates};
use almanac_db::db::enums::ContentStatus;
use almanac_db::db::store::CalendarStore;
use almanac_db::model::event::{Event, NewEvent};
use almanac_db::model::occurrence::NewOccurrence;

use crate::error::{ServiceError, ServiceResult};

const DUPLICATE_PREFIX: &str = "[Duplicate] ";

/// ## Summary
/// Returns the first slug derived from `title` that no event of `site_id` uses.
///
/// ## Errors
/// Returns a database error if a lookup fails.
pub async fn unique_event_slug<S: CalendarStore>(
    store: &mut S,
    site_id: i32,
    title: &str,
) -> ServiceResult<String> {
    let base = generate_slug(title, "event");
    for candidate in slug_candidates(&base) {
        if !store.event_slug_exists(site_id, &candidate).await? {
            return Ok(candidate);
        }
        tracing::trace!(slug = %candidate, "Slug taken");
    }
    // slug_candidates never ends
    Err(ServiceError::ValidationError(format!("no free slug for '{base}'")))
}

/// ## Summary
/// The event with `slug` in the request's site, if it is published at the
/// request time.
///
/// ## Errors
/// Returns `NotFound` if there is no such event or it is not published.
pub async fn published_event_by_slug<S: CalendarStore>(
    store: &mut S,
    ctx: &RequestContext,
    slug: &str,
) -> ServiceResult<Event> {
    store
        .event_by_slug(ctx.site_id, slug)
        .await?
        .filter(|event| event.is_published(ctx.now))
        .ok_or_else(|| ServiceError::NotFound(format!("event '{slug}'")))
}

/// ## Summary
/// Copies an event so staff can quickly create a similar one.
///
/// The copy is titled `"[Duplicate] <title>"`, gets a fresh id and a free slug,
/// and starts as a draft without publish or expiry dates. It is placed in the
/// same categories and receives a copy of every occurrence, in order. Related
/// events are not carried over.
///
/// ## Side Effects
/// Inserts the event, its category links and its occurrences.
///
/// ## Errors
/// Returns `NotFound` if the source event does not exist, or a database error.
#[tracing::instrument(skip(store, ctx), fields(site_id = ctx.site_id))]
pub async fn duplicate_event<S: CalendarStore>(
    store: &mut S,
    ctx: &RequestContext,
    event_id: uuid::Uuid,
) -> ServiceResult<Event> {
    let source = store
        .event_by_id(event_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("event {event_id}")))?;

    let title = format!("{DUPLICATE_PREFIX}{}", source.title);
    let slug = unique_event_slug(store, source.site_id, &title).await?;
    let copy = NewEvent {
        id: uuid::Uuid::now_v7(),
        site_id: source.site_id,
        title,
        slug,
        content: source.content,
        status: ContentStatus::Draft,
        publish_date: None,
        expiry_date: None,
        location: source.location,
        address: source.address,
        link: source.link,
        featured: source.featured,
        featured_image: source.featured_image,
        user_id: source.user_id,
        metadata: source.metadata,
    };
    let duplicate = store.insert_event(copy).await?;

    let category_ids = store.event_category_ids(event_id).await?;
    store
        .link_event_categories(duplicate.id, &category_ids)
        .await?;

    let occurrences = store.occurrences_for_event(event_id).await?;
    let copied = occurrences.len();
    for occurrence in occurrences {
        let row = NewOccurrence::new(
            duplicate.id,
            occurrence.start,
            occurrence.end,
            occurrence.repeat,
            occurrence.repeat_until,
        );
        store.insert_occurrence(row).await?;
    }

    tracing::info!(
        duplicate_id = %duplicate.id,
        slug = %duplicate.slug,
        occurrences = copied,
        categories = category_ids.len(),
        "Event duplicated"
    );
    Ok(duplicate)
}
