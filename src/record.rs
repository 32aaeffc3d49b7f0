//! Typed prescription data flowing through the pipeline.
//!
//! Every optional field defaults to `None` (or an empty list) when the model
//! leaves it out, so a sparse answer still deserialises. Absent fields are
//! also skipped on serialisation: a failed extraction dumps as
//! `{"error": "..."}` and nothing else.
//!
//! Text fields accept any JSON scalar: models often answer `"dosage": 81`
//! instead of `"81"`. Numbers and booleans are kept as their text form;
//! objects and arrays in a text slot are dropped.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Suffix the extraction prompt asks the model to append to values it could
/// not read with confidence.
pub const UNCERTAIN_MARKER: &str = "(?)";

/// Structured fields extracted from one prescription image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrescriptionRecord {
    #[serde(
        default,
        deserialize_with = "scalar_as_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub patient_name: Option<String>,

    #[serde(
        default,
        deserialize_with = "scalar_as_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<String>,

    /// Medications in the order they appear on the prescription.
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub medications: Vec<MedicationEntry>,

    #[serde(
        default,
        deserialize_with = "scalar_as_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub doctor_name: Option<String>,

    /// Set only when extraction failed; all other fields are then empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PrescriptionRecord {
    /// A record that carries nothing but a failure description.
    pub fn from_error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Medications with a usable lookup key, in prescription order.
    pub fn named_medications(&self) -> impl Iterator<Item = &MedicationEntry> {
        self.medications.iter().filter(|m| m.has_name())
    }
}

/// One line item on a prescription.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicationEntry {
    /// Name as read from the prescription, including any uncertainty
    /// marker. Missing or `null` becomes an empty string.
    #[serde(default, deserialize_with = "name_as_text")]
    pub name: String,

    #[serde(
        default,
        deserialize_with = "scalar_as_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub dosage: Option<String>,

    #[serde(
        default,
        deserialize_with = "scalar_as_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub frequency: Option<String>,
}

impl MedicationEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// True when [`Self::lookup_key`] is non-empty.
    pub fn has_name(&self) -> bool {
        !self.lookup_key().is_empty()
    }

    /// The name to search drug databases for: trimmed, with trailing
    /// [`UNCERTAIN_MARKER`]s removed.
    pub fn lookup_key(&self) -> &str {
        let mut key = self.name.trim();
        while let Some(rest) = key.strip_suffix(UNCERTAIN_MARKER) {
            key = rest.trim_end();
        }
        key
    }
}

/// Lookup findings for one medication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentResult {
    pub medication: String,
    /// Free text from the lookup capability; may itself describe a failure.
    pub info: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn scalar_as_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

fn name_as_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_as_text(deserializer)?.unwrap_or_default())
}
