//! Slug generation utilities for human-readable record identifiers.
//!
//! ## Summary
//! Generates URL-safe slugs from titles. Slugs are lowercase, alphanumeric with
//! hyphens. Uniqueness is the caller's concern: [`slug_candidates`] yields the
//! sequence of alternatives to try.

/// Generate a URL-safe slug from a title.
///
/// Converts to lowercase, replaces spaces and special characters with hyphens,
/// collapses multiple hyphens, and trims edge hyphens. Falls back to `fallback`
/// when nothing usable remains.
///
/// Examples:
/// - "Summer Fair" -> "summer-fair"
/// - "Bach & Handel: Live!" -> "bach-handel-live"
#[must_use]
pub fn generate_slug(title: &str, fallback: &str) -> String {
    let slug = title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    if slug.is_empty() {
        fallback.to_string()
    } else {
        slug
    }
}

/// Yields `base`, then `base-1`, `base-2`, ... for uniqueness probing.
pub fn slug_candidates(base: &str) -> impl Iterator<Item = String> + '_ {
    std::iter::once(base.to_string()).chain((1_u32..).map(move |n| format!("{base}-{n}")))
}
