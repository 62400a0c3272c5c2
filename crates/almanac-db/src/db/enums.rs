//! Database enum types with Diesel serialization.
//!
//! Each enum maps to a `TEXT` column guarded by a CHECK constraint (or validated
//! on write) and implements `ToSql`/`FromSql` for `PostgreSQL`.

use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use rrule::{RRule, Unvalidated};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::io::Write;
use std::str::FromStr;

use crate::error::DbError;

/// Publishing status of an event.
///
/// Maps to `event.status` CHECK constraint.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, AsExpression, FromSqlRow, Serialize, Deserialize,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum ContentStatus {
    #[default]
    Draft,
    Published,
}

impl ToSql<Text, Pg> for ContentStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for ContentStatus {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"draft" => Ok(Self::Draft),
            b"published" => Ok(Self::Published),
            _ => Err("Unrecognized enum variant".into()),
        }
    }
}

impl ContentStatus {
    /// Returns the database string representation of this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
        }
    }

    /// ## Summary
    /// Reads a status from a serialized record.
    ///
    /// Accepts the names used here as well as the numeric codes other
    /// installations export (`1` draft, `2` published).
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(1) => Some(Self::Draft),
                Some(2) => Some(Self::Published),
                _ => None,
            },
            serde_json::Value::String(s) => match s.to_ascii_lowercase().as_str() {
                "draft" | "1" => Some(Self::Draft),
                "published" | "2" => Some(Self::Published),
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for ContentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Repeat frequency of an occurrence.
///
/// Stored and serialized as RRULE text, e.g. `RRULE:FREQ=WEEKLY`. An occurrence
/// without a repeat is represented by `Option::None`, never by a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
pub enum Repeat {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

const RRULE_PREFIX: &str = "RRULE:";

impl Repeat {
    pub const ALL: [Self; 4] = [Self::Daily, Self::Weekly, Self::Monthly, Self::Yearly];

    /// The `FREQ` value of the rule.
    #[must_use]
    pub const fn frequency(self) -> &'static str {
        match self {
            Self::Daily => "DAILY",
            Self::Weekly => "WEEKLY",
            Self::Monthly => "MONTHLY",
            Self::Yearly => "YEARLY",
        }
    }

    /// Human readable name, e.g. `Weekly`.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Daily => "Daily",
            Self::Weekly => "Weekly",
            Self::Monthly => "Monthly",
            Self::Yearly => "Yearly",
        }
    }

    /// The stored representation, e.g. `RRULE:FREQ=WEEKLY`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "RRULE:FREQ=DAILY",
            Self::Weekly => "RRULE:FREQ=WEEKLY",
            Self::Monthly => "RRULE:FREQ=MONTHLY",
            Self::Yearly => "RRULE:FREQ=YEARLY",
        }
    }

    fn from_frequency(freq: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|repeat| repeat.frequency().eq_ignore_ascii_case(freq))
    }

    /// ## Summary
    /// Parses an optional repeat value as found in serialized records.
    ///
    /// An empty string means "does not repeat".
    ///
    /// ## Errors
    /// Returns `InvalidRepeat` for rules that are malformed or not a plain
    /// daily/weekly/monthly/yearly frequency.
    pub fn parse_optional(value: &str) -> Result<Option<Self>, DbError> {
        if value.trim().is_empty() {
            Ok(None)
        } else {
            value.parse().map(Some)
        }
    }
}

impl FromStr for Repeat {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(repeat) = Self::ALL
            .into_iter()
            .find(|repeat| repeat.label().eq_ignore_ascii_case(trimmed))
        {
            return Ok(repeat);
        }

        let rule = trimmed
            .strip_prefix(RRULE_PREFIX)
            .or_else(|| trimmed.strip_prefix("rrule:"))
            .unwrap_or(trimmed);

        rule.parse::<RRule<Unvalidated>>()
            .map_err(|e| DbError::InvalidRepeat(format!("'{s}': {e}")))?;

        // Only a bare frequency is representable; intervals, counts and by-rules are not.
        let mut parts = rule.split(';').filter(|part| !part.is_empty());
        match (parts.next(), parts.next()) {
            (Some(part), None) => part
                .split_once('=')
                .filter(|(key, _)| key.trim().eq_ignore_ascii_case("FREQ"))
                .and_then(|(_, freq)| Self::from_frequency(freq.trim()))
                .ok_or_else(|| DbError::InvalidRepeat(format!("unsupported rule '{s}'"))),
            _ => Err(DbError::InvalidRepeat(format!("unsupported rule '{s}'"))),
        }
    }
}

impl ToSql<Text, Pg> for Repeat {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for Repeat {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        let text = std::str::from_utf8(bytes.as_bytes())?;
        text.parse::<Self>().map_err(|e| e.to_string().into())
    }
}

impl fmt::Display for Repeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Repeat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Repeat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
