use chrono::{DateTime, Utc};

/// Ambient request state threaded explicitly through service entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    /// Site that new records are attached to and queries are scoped by.
    pub site_id: i32,
    /// User performing the request; becomes the owner of created records.
    pub user_id: uuid::Uuid,
    /// Instant the request is evaluated at.
    pub now: DateTime<Utc>,
}

impl RequestContext {
    #[must_use]
    pub const fn new(site_id: i32, user_id: uuid::Uuid, now: DateTime<Utc>) -> Self {
        Self {
            site_id,
            user_id,
            now,
        }
    }
}

/// Page sizing for paginated event listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingConfig {
    pub featured_per_page: usize,
    pub per_page: usize,
    pub max_paging_links: usize,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            featured_per_page: 10,
            per_page: 10,
            max_paging_links: 10,
        }
    }
}
