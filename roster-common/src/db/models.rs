//! Person and saved-filter models
//!
//! A person is stored across two tables (`persons` + `person_details`) but is
//! always handled as one [`PersonRecord`] aggregate.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

/// Optional per-person attributes (`person_details` row)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonDetail {
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub location: Option<String>,
}

/// Person joined with its detail row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonRecord {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub contact_number: String,
    #[serde(flatten)]
    pub detail: PersonDetail,
    pub created_at: DateTime<Utc>,
}

impl PersonRecord {
    /// Map a joined `persons p JOIN person_details d` row
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            contact_number: row.try_get("contact_number")?,
            detail: PersonDetail {
                age: row.try_get("age")?,
                gender: row.try_get("gender")?,
                location: row.try_get("location")?,
            },
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Person accepted by the import pipeline, not yet stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPerson {
    pub name: String,
    pub email: String,
    pub contact_number: String,
    pub detail: PersonDetail,
}

/// Partial update of a person and its detail row
///
/// Absent fields keep their stored value. For `age`, `gender` and `location`
/// an explicit `null` clears the value, which is why they are double options.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub contact_number: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub age: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub gender: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub location: Option<Option<String>>,
}

impl PersonUpdate {
    /// Reject present-but-empty required fields
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("name", &self.name),
            ("email", &self.email),
            ("contact_number", &self.contact_number),
        ] {
            if matches!(value, Some(v) if v.trim().is_empty()) {
                return Err(Error::Validation(format!("{} must not be empty", field)));
            }
        }
        Ok(())
    }

    /// Age to store when present: unparseable values become NULL
    pub fn age_value(&self) -> Option<Option<i64>> {
        self.age.as_ref().map(coerce_age)
    }

    pub fn gender_value(&self) -> Option<Option<String>> {
        self.gender.clone().map(non_empty)
    }

    pub fn location_value(&self) -> Option<Option<String>> {
        self.location.clone().map(non_empty)
    }
}

/// Export projection: no internal identifiers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    pub name: String,
    pub email: String,
    pub contact_number: String,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub location: Option<String>,
}

impl ExportRow {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            contact_number: row.try_get("contact_number")?,
            age: row.try_get("age")?,
            gender: row.try_get("gender")?,
            location: row.try_get("location")?,
        })
    }
}

/// Named filter snapshot; `filters` is opaque JSON
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavedFilter {
    pub id: i64,
    pub name: String,
    pub filters: Value,
    pub created_at: DateTime<Utc>,
}

impl SavedFilter {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        let filters: String = row.try_get("filters")?;
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            filters: serde_json::from_str(&filters)?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Request body for creating a saved filter
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewSavedFilter {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub filters: Option<Value>,
}

impl NewSavedFilter {
    /// Both fields are required; returns the trimmed name and the filters
    pub fn validate(self) -> Result<(String, Value)> {
        let name = self.name.map(|n| n.trim().to_string()).unwrap_or_default();
        match self.filters {
            Some(filters) if !name.is_empty() && !is_falsy(&filters) => Ok((name, filters)),
            _ => Err(Error::Validation(
                "Name and filters are required.".to_string(),
            )),
        }
    }
}

/// `null`, `false`, zero and the empty string count as missing filters
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Coerce a loosely-typed age into an integer
///
/// Integers pass through, whole floats are truncated to integers, strings use
/// their leading integer (`"42 years"` -> 42). Anything else is `None`.
pub fn coerce_age(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite())
                .map(|f| f.trunc() as i64)
        }),
        Value::String(s) => parse_int_prefix(s),
        _ => None,
    }
}

/// Parse the leading base-10 integer of a string, ignoring surrounding whitespace
///
/// Returns `None` when no digits lead the string.
pub fn parse_int_prefix(raw: &str) -> Option<i64> {
    let s = raw.trim();
    let (sign, digits) = match s.as_bytes().first() {
        Some(b'-') => (-1, &s[1..]),
        Some(b'+') => (1, &s[1..]),
        _ => (1, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    digits[..end].parse::<i64>().ok().map(|n| n * sign)
}

/// Lowercased copy kept alongside `name` and `location` for
/// case-insensitive substring search beyond ASCII
pub fn fold_case(value: &str) -> String {
    value.to_lowercase()
}

/// Render a spreadsheet or JSON number as stored text; whole values drop
/// the fractional part (`5551234.0` -> `"5551234"`)
pub fn number_to_text(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Marks a field as present even when its value is `null`
fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Contact numbers arrive as text or as bare JSON numbers
fn text_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(match n.as_f64() {
            Some(f) if !n.is_i64() && !n.is_u64() => number_to_text(f),
            _ => n.to_string(),
        })),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}
