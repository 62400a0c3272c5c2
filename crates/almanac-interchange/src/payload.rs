//! Serialized record shapes exchanged between installations.
//!
//! The export endpoint produces an [`EventPayload`]; the import pipeline parses
//! the same shape back. Records follow the `{model, pk, fields}` envelope.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use almanac_core::constants::CURRENT_NAMESPACE;

use crate::error::{InterchangeError, InterchangeResult};

/// Model name of an event record in the current schema.
#[must_use]
pub fn event_model() -> String {
    format!("{CURRENT_NAMESPACE}.event")
}

/// Model name of an occurrence record in the current schema.
#[must_use]
pub fn occurrence_model() -> String {
    format!("{CURRENT_NAMESPACE}.occurrence")
}

/// Model name of a category record in the current schema.
#[must_use]
pub fn category_model() -> String {
    format!("{CURRENT_NAMESPACE}.eventcategory")
}

/// One serialized record: a model discriminator, primary key and field map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub model: String,
    #[serde(default)]
    pub pk: Value,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl Record {
    #[must_use]
    pub fn new(model: impl Into<String>, pk: Value, fields: Map<String, Value>) -> Self {
        Self {
            model: model.into(),
            pk,
            fields,
        }
    }

    /// Returns a string field, treating JSON `null` as absent.
    #[must_use]
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        serde_json::json!({
            "model": self.model,
            "pk": self.pk,
            "fields": Value::Object(self.fields),
        })
    }
}

/// An occurrence entry nested in an event payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccurrencePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub pk: Value,
    pub fields: Map<String, Value>,
}

/// The machine-readable representation of one event.
///
/// `dateandtimes` carries occurrences in the previous schema's date + time form;
/// `occurrences` carries them in the current form. Either may be absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub pk: Value,
    pub fields: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dateandtimes: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub occurrences: Vec<OccurrencePayload>,
}

impl EventPayload {
    /// ## Summary
    /// Parses a payload body.
    ///
    /// ## Errors
    /// Returns `PayloadParseError` if the body is not JSON or lacks a `fields` object.
    pub fn from_slice(body: &[u8]) -> InterchangeResult<Self> {
        serde_json::from_slice(body).map_err(|e| InterchangeError::PayloadParseError(e.to_string()))
    }

    /// The event part of the payload as a plain record. A payload without a
    /// discriminator is taken to be in the current schema.
    #[must_use]
    pub fn event_record(&self) -> Record {
        Record::new(
            self.model.clone().unwrap_or_else(event_model),
            self.pk.clone(),
            self.fields.clone(),
        )
    }

    /// A string field of the event, treating JSON `null` as absent.
    #[must_use]
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }
}
