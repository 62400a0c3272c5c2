//! The JSON representation of an event that other installations import.

use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};

use almanac_core::types::RequestContext;
use almanac_db::db::store::CalendarStore;
use almanac_db::model::event::Event;
use almanac_db::model::occurrence::Occurrence;
use almanac_interchange::payload::{EventPayload, OccurrencePayload, event_model, occurrence_model};
use almanac_interchange::timezone::to_isoformat;

use crate::error::{ServiceError, ServiceResult};

/// An exported event with its serialized body and entity tag.
#[derive(Debug, Clone)]
pub struct ExportedEvent {
    pub payload: EventPayload,
    pub body: Vec<u8>,
    /// Quoted SHA-256 hex digest of `body`.
    pub etag: String,
}

fn timestamp(value: Option<chrono::DateTime<chrono::Utc>>) -> Value {
    value.map_or(Value::Null, |dt| Value::String(to_isoformat(&dt)))
}

fn uuid_list(ids: &[uuid::Uuid]) -> Value {
    Value::Array(ids.iter().map(|id| json!(id)).collect())
}

/// ## Summary
/// Builds the fields of an exported event.
///
/// Metadata entries are merged in unless they collide with a column.
#[must_use]
pub fn event_fields(
    event: &Event,
    category_ids: &[uuid::Uuid],
    related_ids: &[uuid::Uuid],
) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("title".into(), json!(event.title));
    fields.insert("slug".into(), json!(event.slug));
    fields.insert("content".into(), json!(event.content));
    fields.insert("status".into(), json!(event.status));
    fields.insert("publish_date".into(), timestamp(event.publish_date));
    fields.insert("expiry_date".into(), timestamp(event.expiry_date));
    fields.insert("location".into(), json!(event.location));
    fields.insert("address".into(), json!(event.address));
    fields.insert("link".into(), json!(event.link));
    fields.insert("featured".into(), json!(event.featured));
    fields.insert("featured_image".into(), json!(event.featured_image));
    fields.insert("user".into(), json!(event.user_id));
    fields.insert("site".into(), json!(event.site_id));
    fields.insert("created".into(), timestamp(Some(event.created_at)));
    fields.insert("updated".into(), timestamp(Some(event.updated_at)));
    fields.insert("categories".into(), uuid_list(category_ids));
    fields.insert("related_events".into(), uuid_list(related_ids));

    if let Value::Object(metadata) = &event.metadata {
        for (key, value) in metadata {
            if !fields.contains_key(key) {
                fields.insert(key.clone(), value.clone());
            }
        }
    }
    fields
}

#[must_use]
pub fn occurrence_payload(occurrence: &Occurrence) -> OccurrencePayload {
    let mut fields = Map::new();
    fields.insert("event".into(), json!(occurrence.event_id));
    fields.insert("start".into(), timestamp(Some(occurrence.start)));
    fields.insert("end".into(), timestamp(occurrence.end));
    fields.insert("repeat".into(), json!(occurrence.repeat));
    fields.insert("repeat_until".into(), timestamp(occurrence.repeat_until));
    OccurrencePayload {
        model: Some(occurrence_model()),
        pk: json!(occurrence.id),
        fields,
    }
}

/// Quoted SHA-256 hex digest of `body`.
#[must_use]
pub fn entity_tag(body: &[u8]) -> String {
    format!("\"{}\"", hex::encode(Sha256::digest(body)))
}

/// ## Summary
/// Exports an event with its occurrences.
///
/// ## Errors
/// Returns `NotFound` if the event does not exist, or a database error.
#[tracing::instrument(skip(store))]
pub async fn export_event<S: CalendarStore>(
    store: &mut S,
    event_id: uuid::Uuid,
) -> ServiceResult<ExportedEvent> {
    let event = store
        .event_by_id(event_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("event {event_id}")))?;
    export_loaded(store, event).await
}

/// ## Summary
/// Exports an event of the request's site that is published at the request time.
///
/// ## Errors
/// Returns `NotFound` if there is no such event or it is not published.
#[tracing::instrument(skip(store, ctx), fields(site_id = ctx.site_id))]
pub async fn export_published_event<S: CalendarStore>(
    store: &mut S,
    ctx: &RequestContext,
    event_id: uuid::Uuid,
) -> ServiceResult<ExportedEvent> {
    let event = store
        .event_by_id(event_id)
        .await?
        .filter(|event| event.site_id == ctx.site_id && event.is_published(ctx.now))
        .ok_or_else(|| ServiceError::NotFound(format!("event {event_id}")))?;
    export_loaded(store, event).await
}

async fn export_loaded<S: CalendarStore>(store: &mut S, event: Event) -> ServiceResult<ExportedEvent> {
    let category_ids = store.event_category_ids(event.id).await?;
    let related_ids = store.related_event_ids(event.id).await?;
    let occurrences = store.occurrences_for_event(event.id).await?;

    let payload = EventPayload {
        model: Some(event_model()),
        pk: json!(event.id),
        fields: event_fields(&event, &category_ids, &related_ids),
        dateandtimes: Vec::new(),
        occurrences: occurrences.iter().map(occurrence_payload).collect(),
    };
    let body = serde_json::to_vec(&payload)
        .map_err(|e| ServiceError::ValidationError(format!("unserializable event: {e}")))?;
    let etag = entity_tag(&body);

    tracing::debug!(occurrences = occurrences.len(), %etag, "Event exported");
    Ok(ExportedEvent {
        payload,
        body,
        etag,
    })
}
