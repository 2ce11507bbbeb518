//! Upstream record types
//!
//! Each source collection is deserialized into a raw struct, then checked
//! into one of the typed records here before any join runs.

use crate::types::{RankError, Result};
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Identifier as it appears upstream: either a JSON integer or a string.
///
/// Strings holding a canonical integer (`"10"`, not `"010"`) are read as
/// `Int`, so services disagreeing on the JSON type of an id still join.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl RecordId {
    fn from_text(s: String) -> Self {
        match s.parse::<i64>() {
            Ok(n) if n.to_string() == s => Self::Int(n),
            _ => Self::Text(s),
        }
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Int(i64),
            Text(String),
        }

        match RawId::deserialize(deserializer)? {
            RawId::Int(n) => Ok(Self::Int(n)),
            RawId::Text(s) if s.is_empty() => Err(D::Error::custom("empty identifier")),
            RawId::Text(s) => Ok(Self::from_text(s)),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RecordId {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self::from_text(s.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Appointment {
    pub appointment_id: RecordId,
    pub patient_id: RecordId,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Provider {
    pub provider_id: RecordId,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PatientProviderLink {
    pub patient_id: RecordId,
    pub provider_id: RecordId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rating {
    pub appointment_id: RecordId,
    pub value: f64,
}

/// Reads a field as `None` when it is null or of the wrong type; the caller
/// reports the field by name.
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

/// Upstream shape of an appointment; see [`FromRecord`]
#[derive(Deserialize)]
pub struct RawAppointment {
    #[serde(default, deserialize_with = "lenient")]
    id: Option<RecordId>,
    #[serde(default, deserialize_with = "lenient")]
    patient_id: Option<RecordId>,
}

#[derive(Deserialize)]
pub struct RawProvider {
    #[serde(default, deserialize_with = "lenient")]
    id: Option<RecordId>,
    #[serde(default, deserialize_with = "lenient", alias = "specialization")]
    category: Option<String>,
}

#[derive(Deserialize)]
pub struct RawPatientProviderLink {
    #[serde(default, deserialize_with = "lenient")]
    patient_id: Option<RecordId>,
    #[serde(default, deserialize_with = "lenient", alias = "councillor_id")]
    provider_id: Option<RecordId>,
}

#[derive(Deserialize)]
pub struct RawRating {
    #[serde(default, deserialize_with = "lenient")]
    appointment_id: Option<RecordId>,
    #[serde(default, deserialize_with = "lenient")]
    value: Option<f64>,
}

/// Checked conversion of one deserialized upstream object into a record
pub trait FromRecord: Sized {
    /// Record kind used in error messages (e.g. "appointment")
    const KIND: &'static str;

    type Raw: DeserializeOwned;

    fn from_raw(label: &str, raw: Self::Raw) -> Result<Self>;
}

fn required<T>(label: &str, value: Option<T>, field: &str) -> Result<T> {
    value.ok_or_else(|| RankError::schema(label, field))
}

impl FromRecord for Appointment {
    const KIND: &'static str = "appointment";
    type Raw = RawAppointment;

    fn from_raw(label: &str, raw: RawAppointment) -> Result<Self> {
        Ok(Self {
            appointment_id: required(label, raw.id, "id")?,
            patient_id: required(label, raw.patient_id, "patient_id")?,
        })
    }
}

impl FromRecord for Provider {
    const KIND: &'static str = "provider";
    type Raw = RawProvider;

    fn from_raw(label: &str, raw: RawProvider) -> Result<Self> {
        let category = raw.category.filter(|c| !c.is_empty());
        Ok(Self {
            category: required(label, category, "category")?,
            provider_id: required(label, raw.id, "id")?,
        })
    }
}

impl FromRecord for PatientProviderLink {
    const KIND: &'static str = "patient_provider_link";
    type Raw = RawPatientProviderLink;

    fn from_raw(label: &str, raw: RawPatientProviderLink) -> Result<Self> {
        Ok(Self {
            patient_id: required(label, raw.patient_id, "patient_id")?,
            provider_id: required(label, raw.provider_id, "provider_id")?,
        })
    }
}

impl FromRecord for Rating {
    const KIND: &'static str = "rating";
    type Raw = RawRating;

    fn from_raw(label: &str, raw: RawRating) -> Result<Self> {
        let value = raw.value.filter(|v| v.is_finite());
        Ok(Self {
            value: required(label, value, "value")?,
            appointment_id: required(label, raw.appointment_id, "appointment_id")?,
        })
    }
}

/// Decode a fetched collection into typed records.
///
/// Accepts a bare JSON array or an object wrapping the array under `data`.
/// The first malformed record aborts decoding.
pub fn decode_collection<T: FromRecord>(value: &Value) -> Result<Vec<T>> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(obj) => match obj.get("data") {
            Some(Value::Array(items)) => items,
            _ => return Err(RankError::schema(T::KIND, "data")),
        },
        _ => return Err(RankError::schema(T::KIND, "<collection>")),
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let label = format!("{}[{}]", T::KIND, i);
            if !item.is_object() {
                return Err(RankError::schema(label, "<object>"));
            }
            let raw = T::Raw::deserialize(item).map_err(|e| {
                tracing::debug!(record = %label, error = %e, "record rejected");
                RankError::schema(label.as_str(), "<object>")
            })?;
            T::from_raw(&label, raw)
        })
        .collect()
}
