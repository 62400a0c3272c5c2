//! Conversion of records written by the previous calendar schema.
//!
//! ## Summary
//! The previous schema stored events with a `location_title`, occurrences as a
//! `day` plus separate `start_time`/`end_time` strings, and categories with their
//! own sortable flag. [`Converter::convert`] maps each of those onto the current
//! schema. Records of any other model pass through untouched.

use chrono_tz::Tz;
use serde_json::{Map, Value};

use almanac_core::constants::{CURRENT_NAMESPACE, LEGACY_NAMESPACE};

use crate::error::{InterchangeError, InterchangeResult};
use crate::payload::Record;
use crate::timezone::{combine, to_isoformat};

/// How one field of the current schema is populated from a legacy record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldMap {
    Same(&'static str),
    Renamed { to: &'static str, from: &'static str },
}

impl FieldMap {
    const fn source(self) -> &'static str {
        match self {
            Self::Same(name) | Self::Renamed { from: name, .. } => name,
        }
    }

    const fn target(self) -> &'static str {
        match self {
            Self::Same(name) | Self::Renamed { to: name, .. } => name,
        }
    }
}

const EVENT_FIELDS: &[FieldMap] = &[
    FieldMap::Same("keywords_string"),
    FieldMap::Same("site"),
    FieldMap::Same("title"),
    FieldMap::Same("slug"),
    FieldMap::Same("_meta_title"),
    FieldMap::Same("description"),
    FieldMap::Same("gen_description"),
    FieldMap::Same("created"),
    FieldMap::Same("updated"),
    FieldMap::Same("status"),
    FieldMap::Same("publish_date"),
    FieldMap::Same("expiry_date"),
    FieldMap::Same("short_url"),
    FieldMap::Same("in_sitemap"),
    FieldMap::Same("content"),
    FieldMap::Same("user"),
    FieldMap::Renamed {
        to: "location",
        from: "location_title",
    },
    FieldMap::Same("address"),
    FieldMap::Same("link"),
    FieldMap::Same("featured"),
    FieldMap::Same("featured_image"),
    FieldMap::Same("categories"),
    FieldMap::Same("related_events"),
];

const CATEGORY_FIELDS: &[FieldMap] = &[
    FieldMap::Same("title"),
    FieldMap::Same("site"),
    FieldMap::Same("slug"),
];

const OCCURRENCE_FIELDS: &[FieldMap] = &[FieldMap::Same("event")];

/// Copies the mapped fields present in `source`; absent ones are left out.
fn project(source: &Map<String, Value>, mappings: &[FieldMap]) -> Map<String, Value> {
    mappings
        .iter()
        .filter_map(|mapping| {
            source
                .get(mapping.source())
                .map(|value| (mapping.target().to_string(), value.clone()))
        })
        .collect()
}

/// A serialized record classified by its model discriminator.
#[derive(Debug, Clone, PartialEq)]
pub enum LegacyRecord {
    Event(Record),
    Occurrence(Record),
    Category(Record),
    /// Anything else, kept verbatim.
    Unknown(Value),
}

impl LegacyRecord {
    /// Returns the discriminator of an unrecognized record, if it has one.
    #[must_use]
    pub fn unknown_model(&self) -> Option<&str> {
        match self {
            Self::Unknown(value) => value.get("model").and_then(Value::as_str),
            _ => None,
        }
    }
}

/// Maps legacy records onto the current schema.
#[derive(Debug, Clone)]
pub struct Converter {
    legacy_namespace: String,
    current_namespace: String,
    timezone: Tz,
}

impl Converter {
    /// Creates a converter for the default namespaces. Legacy date and time
    /// strings are read as wall-clock times in `timezone`.
    #[must_use]
    pub fn new(timezone: Tz) -> Self {
        Self::with_namespaces(LEGACY_NAMESPACE, CURRENT_NAMESPACE, timezone)
    }

    #[must_use]
    pub fn with_namespaces(legacy: &str, current: &str, timezone: Tz) -> Self {
        Self {
            legacy_namespace: legacy.to_string(),
            current_namespace: current.to_string(),
            timezone,
        }
    }

    fn legacy_model(&self, name: &str) -> String {
        format!("{}.{name}", self.legacy_namespace)
    }

    fn current_model(&self, name: &str) -> String {
        format!("{}.{name}", self.current_namespace)
    }

    /// ## Summary
    /// Classifies a serialized record by its `model` discriminator.
    ///
    /// Values that are not `{model, pk?, fields}` objects are `Unknown`.
    #[must_use]
    pub fn classify(&self, value: Value) -> LegacyRecord {
        let Some(model) = value.get("model").and_then(Value::as_str) else {
            return LegacyRecord::Unknown(value);
        };

        let kind: fn(Record) -> LegacyRecord = if model == self.legacy_model("event") {
            LegacyRecord::Event
        } else if model == self.legacy_model("eventdatetime") {
            LegacyRecord::Occurrence
        } else if model == self.legacy_model("eventcategory") {
            LegacyRecord::Category
        } else {
            return LegacyRecord::Unknown(value);
        };

        match serde_json::from_value::<Record>(value.clone()) {
            Ok(record) => kind(record),
            Err(e) => {
                tracing::debug!(model = %model, error = %e, "Legacy record has no usable fields");
                LegacyRecord::Unknown(value)
            }
        }
    }

    /// ## Summary
    /// Converts one serialized record to the current schema.
    ///
    /// ## Errors
    /// Returns `ParseError` if an occurrence carries a malformed date or time.
    pub fn convert(&self, value: &Value) -> InterchangeResult<Value> {
        self.convert_record(self.classify(value.clone()))
    }

    /// ## Summary
    /// Converts an already classified record.
    ///
    /// ## Errors
    /// Returns `ParseError` if an occurrence carries a malformed date or time.
    pub fn convert_record(&self, record: LegacyRecord) -> InterchangeResult<Value> {
        match record {
            LegacyRecord::Event(record) => Ok(self.convert_event(&record).into_value()),
            LegacyRecord::Occurrence(record) => Ok(self.convert_occurrence(&record)?.into_value()),
            LegacyRecord::Category(record) => Ok(self.convert_category(&record).into_value()),
            LegacyRecord::Unknown(value) => Ok(value),
        }
    }

    fn convert_event(&self, record: &Record) -> Record {
        Record::new(
            self.current_model("event"),
            record.pk.clone(),
            project(&record.fields, EVENT_FIELDS),
        )
    }

    fn convert_occurrence(&self, record: &Record) -> InterchangeResult<Record> {
        let mut fields = project(&record.fields, OCCURRENCE_FIELDS);

        let day = record
            .str_field("day")
            .ok_or_else(|| InterchangeError::ParseError("occurrence has no day".to_string()))?;

        let start = combine(day, record.str_field("start_time"), &self.timezone)?;
        fields.insert("start".to_string(), Value::String(to_isoformat(&start)));

        let end = match record.str_field("end_time") {
            Some(end_time) => Value::String(to_isoformat(&combine(
                day,
                Some(end_time),
                &self.timezone,
            )?)),
            None => Value::Null,
        };
        fields.insert("end".to_string(), end);

        Ok(Record::new(
            self.current_model("occurrence"),
            record.pk.clone(),
            fields,
        ))
    }

    fn convert_category(&self, record: &Record) -> Record {
        let mut fields = project(&record.fields, CATEGORY_FIELDS);
        fields.insert("order".to_string(), Value::Null);
        Record::new(
            self.current_model("eventcategory"),
            record.pk.clone(),
            fields,
        )
    }
}
