//! Fetch, discover, convert and materialize an event published elsewhere.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use reqwest::Url;
use serde_json::{Map, Value};

use almanac_core::config::Settings;
use almanac_core::constants::LEGACY_NAMESPACE;
use almanac_core::types::RequestContext;
use almanac_db::db::enums::{ContentStatus, Repeat};
use almanac_db::db::store::CalendarStore;
use almanac_db::model::event::{Event, NewEvent};
use almanac_db::model::occurrence::Occurrence;
use almanac_interchange::discovery::discover_json_url;
use almanac_interchange::legacy::Converter;
use almanac_interchange::payload::{EventPayload, occurrence_model};
use almanac_interchange::timezone::{parse_timestamp, resolve_timezone};

use crate::calendar::recurrence::Recurrence;
use crate::error::{ImportError, ServiceResult};
use crate::event::unique_event_slug;
use crate::import::assets::{AssetStorage, local_asset_name};
use crate::import::fetch::Fetcher;

/// Event fields that map onto columns. Every other field is kept as metadata.
const COLUMN_FIELDS: &[&str] = &[
    "title",
    "slug",
    "content",
    "status",
    "publish_date",
    "expiry_date",
    "location",
    "location_title",
    "address",
    "link",
    "featured",
    "featured_image",
    "user",
    "site",
    "categories",
    "related_events",
    "created",
    "updated",
];

/// Settings the pipeline needs from the installation.
#[derive(Debug, Clone)]
pub struct ImportSettings {
    /// Timezone for legacy wall-clock dates and naive timestamps.
    pub timezone: Tz,
    /// Path under the remote origin where the remote site serves media.
    pub media_prefix: String,
    /// Local directory, below the media root, that receives imported images.
    pub upload_dir: String,
}

impl ImportSettings {
    /// ## Errors
    /// Returns an error if `events.timezone` is not a known IANA name.
    pub fn from_settings(settings: &Settings) -> ServiceResult<Self> {
        Ok(Self {
            timezone: resolve_timezone(&settings.events.timezone)?,
            media_prefix: settings.import.media_prefix.clone(),
            upload_dir: settings.import.upload_dir.clone(),
        })
    }
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            timezone: Tz::UTC,
            media_prefix: "static/media/".to_string(),
            upload_dir: "uploads/events".to_string(),
        }
    }
}

/// The payload of a remote event and the URL it was finally served from.
#[derive(Debug, Clone)]
pub struct EventData {
    pub data_url: Url,
    pub payload: EventPayload,
}

/// ## Summary
/// Fetches the public page at `event_url`, discovers its JSON representation
/// and fetches and parses that.
///
/// Nothing is written.
///
/// ## Errors
/// - `FetchError` if the page cannot be fetched or answers with a non-2xx status
/// - `DiscoveryError` if the page advertises no usable JSON link
/// - `PayloadFetchError` if the JSON cannot be fetched or answers with a non-2xx status
/// - `PayloadParseError` if the JSON is not an event payload
#[tracing::instrument(skip(fetcher))]
pub async fn fetch_event_data<F: Fetcher>(
    fetcher: &F,
    event_url: &str,
) -> Result<EventData, ImportError> {
    let page_url = Url::parse(event_url.trim())
        .map_err(|e| ImportError::FetchError(format!("invalid URL '{event_url}': {e}")))?;

    let page = fetcher
        .get(&page_url)
        .await
        .map_err(|e| ImportError::FetchError(e.to_string()))?;
    if !page.is_success() {
        return Err(ImportError::FetchError(page.status_error()));
    }

    let json_url = discover_json_url(&page.url, &page.text())
        .map_err(|e| ImportError::DiscoveryError(e.to_string()))?;
    tracing::debug!(json_url = %json_url, "Discovered event data");

    let data = fetcher
        .get(&json_url)
        .await
        .map_err(|e| ImportError::PayloadFetchError(e.to_string()))?;
    if !data.is_success() {
        return Err(ImportError::PayloadFetchError(data.status_error()));
    }

    let payload = EventPayload::from_slice(&data.body)
        .map_err(|e| ImportError::PayloadParseError(e.to_string()))?;
    Ok(EventData {
        data_url: data.url,
        payload,
    })
}

/// An event ready to be written: validated fields, schedules and the local
/// featured image, if one was stored.
#[derive(Debug, Clone)]
pub struct PreparedImport {
    /// The event row. Its slug is assigned on commit.
    pub event: NewEvent,
    pub occurrences: Vec<Recurrence>,
}

fn field_str<'a>(fields: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    fields.get(name).and_then(Value::as_str)
}

fn optional_timestamp(
    fields: &Map<String, Value>,
    name: &str,
    tz: &Tz,
) -> Result<Option<DateTime<Utc>>, ImportError> {
    match fields.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(raw)) if raw.trim().is_empty() => Ok(None),
        Some(Value::String(raw)) => parse_timestamp(raw, tz)
            .map(Some)
            .map_err(|e| ImportError::ParseError(format!("{name}: {e}"))),
        Some(other) => Err(ImportError::ParseError(format!("{name}: {other}"))),
    }
}

/// The event fields in the current schema, whichever schema the payload used.
fn current_event_fields(
    converter: &Converter,
    payload: &EventPayload,
) -> Result<Map<String, Value>, ImportError> {
    let converted = converter
        .convert(&payload.event_record().into_value())
        .map_err(|e| ImportError::ParseError(e.to_string()))?;
    match converted.get("fields") {
        Some(Value::Object(fields)) => Ok(fields.clone()),
        _ => Ok(payload.fields.clone()),
    }
}

/// ## Summary
/// Builds the event row from the payload's fields.
///
/// `location` falls back to the legacy `location_title`. Fields without a
/// column are kept as metadata. The featured image is left unset.
fn materialize_event(
    fields: &Map<String, Value>,
    payload: &EventPayload,
    ctx: &RequestContext,
    tz: &Tz,
) -> Result<NewEvent, ImportError> {
    let mut event = NewEvent::draft(
        ctx.site_id,
        ctx.user_id,
        field_str(fields, "title").unwrap_or_default().trim(),
    );
    event.content = field_str(fields, "content").unwrap_or_default().to_string();
    event.status = fields
        .get("status")
        .and_then(ContentStatus::from_json)
        .unwrap_or_default();
    event.publish_date = optional_timestamp(fields, "publish_date", tz)?;
    event.expiry_date = optional_timestamp(fields, "expiry_date", tz)?;
    event.location = field_str(fields, "location")
        .filter(|location| !location.is_empty())
        .or_else(|| payload.field_str("location_title"))
        .unwrap_or_default()
        .to_string();
    event.address = field_str(fields, "address").unwrap_or_default().to_string();
    event.link = field_str(fields, "link").unwrap_or_default().to_string();
    event.featured = fields
        .get("featured")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let metadata: Map<String, Value> = fields
        .iter()
        .filter(|(name, _)| !COLUMN_FIELDS.contains(&name.as_str()))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    event.metadata = Value::Object(metadata);
    Ok(event)
}

/// Schedules of legacy `dateandtimes` entries, converted to the current schema.
fn legacy_schedules(
    converter: &Converter,
    entries: &[Value],
    tz: &Tz,
) -> Result<Vec<Recurrence>, ImportError> {
    let mut schedules = Vec::with_capacity(entries.len());
    for entry in entries {
        let mut entry = entry.clone();
        if let Value::Object(object) = &mut entry {
            object
                .entry("model")
                .or_insert_with(|| Value::String(format!("{LEGACY_NAMESPACE}.eventdatetime")));
        }

        let converted = converter
            .convert(&entry)
            .map_err(|e| ImportError::ParseError(e.to_string()))?;
        if converted.get("model").and_then(Value::as_str) != Some(occurrence_model().as_str()) {
            tracing::warn!(model = ?converted.get("model"), "Skipping unrecognized occurrence entry");
            continue;
        }
        let fields = converted
            .get("fields")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        schedules.push(schedule(&fields, tz)?);
    }
    Ok(schedules)
}

/// One schedule from current-schema occurrence fields. `event` is ignored.
fn schedule(fields: &Map<String, Value>, tz: &Tz) -> Result<Recurrence, ImportError> {
    let start = optional_timestamp(fields, "start", tz)?
        .ok_or_else(|| ImportError::ParseError("occurrence has no start".to_string()))?;
    let end = optional_timestamp(fields, "end", tz)?;
    let repeat = match field_str(fields, "repeat") {
        Some(raw) => Repeat::parse_optional(raw).map_err(|e| ImportError::ParseError(e.to_string()))?,
        None => None,
    };
    let repeat_until = optional_timestamp(fields, "repeat_until", tz)?;

    Recurrence::new(start, end, repeat, repeat_until).map_err(|e| ImportError::ParseError(e.to_string()))
}

/// ## Summary
/// Validates the payload and turns it into rows, then fetches the featured image.
///
/// The event gets the request's site and user and a fresh id; category and
/// related-event links are discarded. Schedules come from both `dateandtimes`
/// (converted from the legacy schema) and `occurrences`, in that order.
///
/// The featured image is fetched from the remote origin below `media_prefix`
/// and stored below `upload_dir`. Any failure there is logged and the event
/// is imported without an image.
///
/// ## Errors
/// Returns `ParseError` if a date, time or repeat rule is malformed. Nothing is
/// written in that case.
#[tracing::instrument(skip_all, fields(data_url = %data.data_url))]
pub async fn prepare_import<F: Fetcher, A: AssetStorage>(
    fetcher: &F,
    assets: &A,
    data: &EventData,
    ctx: &RequestContext,
    settings: &ImportSettings,
) -> Result<PreparedImport, ImportError> {
    let converter = Converter::new(settings.timezone);
    let payload = &data.payload;

    let fields = current_event_fields(&converter, payload)?;
    let mut event = materialize_event(&fields, payload, ctx, &settings.timezone)?;

    let mut occurrences = legacy_schedules(&converter, &payload.dateandtimes, &settings.timezone)?;
    for entry in &payload.occurrences {
        let mut fields = entry.fields.clone();
        fields.remove("event");
        occurrences.push(schedule(&fields, &settings.timezone)?);
    }

    if let Some(remote_path) = field_str(&fields, "featured_image").filter(|path| !path.is_empty()) {
        event.featured_image = fetch_featured_image(fetcher, assets, &data.data_url, remote_path, settings).await;
    }

    tracing::debug!(occurrences = occurrences.len(), "Import prepared");
    Ok(PreparedImport { event, occurrences })
}

/// Fetches and stores a remote image; `None` on any failure.
async fn fetch_featured_image<F: Fetcher, A: AssetStorage>(
    fetcher: &F,
    assets: &A,
    data_url: &Url,
    remote_path: &str,
    settings: &ImportSettings,
) -> Option<String> {
    let origin = data_url.origin();
    if !origin.is_tuple() {
        tracing::warn!(data_url = %data_url, "Data URL has no origin; skipping featured image");
        return None;
    }
    let image_url = match Url::parse(&origin.ascii_serialization())
        .and_then(|base| base.join(&format!("{}{}", settings.media_prefix, remote_path)))
    {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!(remote_path, error = %e, "Featured image path is not a URL");
            return None;
        }
    };

    let response = match fetcher.get(&image_url).await {
        Ok(response) if response.is_success() => response,
        Ok(response) => {
            tracing::warn!(status = response.status, url = %image_url, "Featured image unavailable");
            return None;
        }
        Err(e) => {
            tracing::warn!(error = %e, url = %image_url, "Featured image request failed");
            return None;
        }
    };

    let Some(name) = local_asset_name(&settings.upload_dir, remote_path) else {
        tracing::warn!(remote_path, "Featured image has no usable file name");
        return None;
    };
    match assets.save(&name, &response.body).await {
        Ok(stored) => Some(stored),
        Err(e) => {
            tracing::warn!(error = %e, name = %name, "Storing featured image failed");
            None
        }
    }
}

/// ## Summary
/// Writes a prepared import: the event with a unique slug first, then its
/// occurrences in order.
///
/// The caller provides atomicity, e.g. by running this inside a transaction.
///
/// ## Errors
/// Returns a database error if a write fails.
#[tracing::instrument(skip_all, fields(site_id = prepared.event.site_id))]
pub async fn commit_import<S: CalendarStore>(
    store: &mut S,
    prepared: PreparedImport,
) -> ServiceResult<(Event, Vec<Occurrence>)> {
    let PreparedImport {
        mut event,
        occurrences,
    } = prepared;
    event.slug = unique_event_slug(store, event.site_id, &event.title).await?;
    let event = store.insert_event(event).await?;

    let mut stored = Vec::with_capacity(occurrences.len());
    for schedule in occurrences {
        stored.push(store.insert_occurrence(schedule.into_new_occurrence(event.id)).await?);
    }

    tracing::info!(event_id = %event.id, slug = %event.slug, occurrences = stored.len(), "Event imported");
    Ok((event, stored))
}

/// ## Summary
/// Runs the whole pipeline against `store`.
///
/// ## Errors
/// Returns `ImportError` for the fetch, discovery and parse stages (with no
/// writes), or a database error from the commit.
pub async fn import_event<S: CalendarStore, F: Fetcher, A: AssetStorage>(
    store: &mut S,
    fetcher: &F,
    assets: &A,
    ctx: &RequestContext,
    settings: &ImportSettings,
    event_url: &str,
) -> ServiceResult<Event> {
    let data = fetch_event_data(fetcher, event_url).await?;
    let prepared = prepare_import(fetcher, assets, &data, ctx, settings).await?;
    let stored_image = prepared.event.featured_image.clone();
    match commit_import(store, prepared).await {
        Ok((event, _)) => Ok(event),
        Err(e) => {
            discard_featured_image(assets, stored_image.as_deref()).await;
            Err(e)
        }
    }
}

/// ## Summary
/// Deletes an image stored by [`prepare_import`] whose event was never written.
///
/// ## Side Effects
/// Removes the file from `assets`. A failed removal is logged with the stored
/// name and otherwise ignored.
pub async fn discard_featured_image<A: AssetStorage>(assets: &A, stored_image: Option<&str>) {
    let Some(name) = stored_image else {
        return;
    };
    match assets.remove(name).await {
        Ok(()) => tracing::info!(path = name, "Removed featured image of failed import"),
        Err(e) => tracing::warn!(path = name, error = %e, "Featured image of failed import left in place"),
    }
}
