use diesel::{pg::Pg, prelude::*};

use crate::db::schema;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Queryable, Selectable, Identifiable)]
#[diesel(table_name = schema::event_category)]
#[diesel(check_for_backend(Pg))]
pub struct EventCategory {
    pub id: uuid::Uuid,
    pub site_id: i32,
    pub title: String,
    pub slug: String,
    /// Position among ordered categories; dense from 0.
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::event_category)]
pub struct NewEventCategory {
    pub id: uuid::Uuid,
    pub site_id: i32,
    pub title: String,
    pub slug: String,
    /// Left unset to append after the existing ordered categories.
    pub sort_order: Option<i32>,
}

impl NewEventCategory {
    #[must_use]
    pub fn new(site_id: i32, title: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::now_v7(),
            site_id,
            title: title.into(),
            slug: slug.into(),
            sort_order: None,
        }
    }

    #[must_use]
    pub fn into_category(self) -> EventCategory {
        EventCategory {
            id: self.id,
            site_id: self.site_id,
            title: self.title,
            slug: self.slug,
            sort_order: self.sort_order,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Insertable, Queryable)]
#[diesel(table_name = schema::event_category_link)]
pub struct EventCategoryLink {
    pub event_id: uuid::Uuid,
    pub category_id: uuid::Uuid,
}

/// One direction of a related-events pair. Both directions are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Insertable, Queryable)]
#[diesel(table_name = schema::related_event)]
pub struct RelatedEvent {
    pub event_id: uuid::Uuid,
    pub related_id: uuid::Uuid,
}
