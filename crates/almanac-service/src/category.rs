//! Event category administration.

use almanac_core::types::RequestContext;
use almanac_core::util::slug::{generate_slug, slug_candidates};
use almanac_db::db::store::CalendarStore;
use almanac_db::model::category::{EventCategory, NewEventCategory};

use crate::error::{ServiceError, ServiceResult};

/// ## Summary
/// Creates a category in the request's site, appended after the ordered ones.
///
/// The slug is derived from the title and suffixed (`-1`, `-2`, ...) until it is
/// unused within the site.
///
/// ## Side Effects
/// Inserts one category row.
///
/// ## Errors
/// Returns `ValidationError` for a blank title, or a database error.
#[tracing::instrument(skip(store), fields(site_id = ctx.site_id))]
pub async fn create_category<S: CalendarStore>(
    store: &mut S,
    ctx: &RequestContext,
    title: &str,
) -> ServiceResult<EventCategory> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ServiceError::ValidationError(
            "category title must not be empty".to_string(),
        ));
    }

    let base = generate_slug(title, "category");
    let mut slug = base.clone();
    for candidate in slug_candidates(&base) {
        if store.category_by_slug(ctx.site_id, &candidate).await?.is_none() {
            slug = candidate;
            break;
        }
    }

    let category = store
        .create_category(NewEventCategory::new(ctx.site_id, title, slug))
        .await?;
    tracing::info!(category_id = %category.id, slug = %category.slug, "Category created");
    Ok(category)
}

/// Categories of the request's site by position; unordered ones last.
///
/// ## Errors
/// Returns a database error if loading fails.
pub async fn list_categories<S: CalendarStore>(
    store: &mut S,
    ctx: &RequestContext,
) -> ServiceResult<Vec<EventCategory>> {
    Ok(store.categories(ctx.site_id).await?)
}

/// ## Summary
/// Deletes a category; the categories after it move up one position.
///
/// ## Errors
/// Returns `NotFound` if no such category exists.
#[tracing::instrument(skip(store))]
pub async fn delete_category<S: CalendarStore>(
    store: &mut S,
    category_id: uuid::Uuid,
) -> ServiceResult<()> {
    if store.delete_category(category_id).await? {
        tracing::info!("Category deleted");
        Ok(())
    } else {
        Err(ServiceError::NotFound(format!("category {category_id}")))
    }
}

/// ## Summary
/// Looks up categories of the site by slug, in the order given.
///
/// Unknown slugs and blanks are skipped, as are repeats.
///
/// ## Errors
/// Returns a database error if a lookup fails.
pub async fn resolve_categories<S: CalendarStore>(
    store: &mut S,
    site_id: i32,
    slugs: &[String],
) -> ServiceResult<Vec<EventCategory>> {
    let mut categories: Vec<EventCategory> = Vec::new();
    for slug in slugs.iter().map(|slug| slug.trim()).filter(|slug| !slug.is_empty()) {
        if categories.iter().any(|category| category.slug == slug) {
            continue;
        }
        match store.category_by_slug(site_id, slug).await? {
            Some(category) => categories.push(category),
            None => tracing::debug!(slug, "Ignoring unknown category"),
        }
    }
    Ok(categories)
}

/// Splits a comma separated category list as it arrives in a query string.
#[must_use]
pub fn split_slugs(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|slug| !slug.is_empty())
        .map(str::to_string)
        .collect()
}
