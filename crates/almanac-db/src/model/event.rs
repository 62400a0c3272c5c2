use chrono::{DateTime, Utc};
use diesel::{pg::Pg, prelude::*};

use crate::db::enums::ContentStatus;
use crate::db::schema;

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable)]
#[diesel(table_name = schema::event)]
#[diesel(check_for_backend(Pg))]
pub struct Event {
    pub id: uuid::Uuid,
    pub site_id: i32,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub status: ContentStatus,
    pub publish_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub location: String,
    pub address: String,
    pub link: String,
    pub featured: bool,
    /// Path of the featured image relative to the media root.
    pub featured_image: Option<String>,
    pub user_id: uuid::Uuid,
    /// CMS fields (SEO and sitemap settings) carried verbatim.
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// ## Summary
    /// Whether the event is publicly visible at `now`.
    ///
    /// The status must be published, and the publish/expiry window, where set,
    /// must contain `now`.
    #[must_use]
    pub fn is_published(&self, now: DateTime<Utc>) -> bool {
        self.status == ContentStatus::Published
            && self.publish_date.is_none_or(|date| date <= now)
            && self.expiry_date.is_none_or(|date| date >= now)
    }
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = schema::event)]
pub struct NewEvent {
    pub id: uuid::Uuid,
    pub site_id: i32,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub status: ContentStatus,
    pub publish_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub location: String,
    pub address: String,
    pub link: String,
    pub featured: bool,
    pub featured_image: Option<String>,
    pub user_id: uuid::Uuid,
    pub metadata: serde_json::Value,
}

impl NewEvent {
    /// A draft event with a fresh id and every optional field empty.
    #[must_use]
    pub fn draft(site_id: i32, user_id: uuid::Uuid, title: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::now_v7(),
            site_id,
            title: title.into(),
            slug: String::new(),
            content: String::new(),
            status: ContentStatus::Draft,
            publish_date: None,
            expiry_date: None,
            location: String::new(),
            address: String::new(),
            link: String::new(),
            featured: false,
            featured_image: None,
            user_id,
            metadata: serde_json::Value::Object(serde_json::Map::new()),
        }
    }

    /// The row as it reads back after insertion at `at`.
    #[must_use]
    pub fn into_event(self, at: DateTime<Utc>) -> Event {
        Event {
            id: self.id,
            site_id: self.site_id,
            title: self.title,
            slug: self.slug,
            content: self.content,
            status: self.status,
            publish_date: self.publish_date,
            expiry_date: self.expiry_date,
            location: self.location,
            address: self.address,
            link: self.link,
            featured: self.featured,
            featured_image: self.featured_image,
            user_id: self.user_id,
            metadata: self.metadata,
            created_at: at,
            updated_at: at,
        }
    }
}
