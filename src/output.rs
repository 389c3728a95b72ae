//! Extraction results and the typed ACORD 25 schema.
//!
//! The model's JSON is kept verbatim in [`Certificate::raw`] so callers get
//! back exactly what the model produced, and is also projected onto the
//! strongly-typed [`CertificateData`] for code that wants field access.
//! Every field of the projection is optional: certificates are frequently
//! incomplete and the model is told to emit `null` for blanks.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use tracing::warn;

/// Result of one successful model round trip.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub outcome: ExtractionOutcome,
    /// Identifier of the model that answered.
    pub model: String,
    /// Number of images sent to the model.
    pub files_processed: usize,
}

impl Extraction {
    /// Wire payload: the certificate object, or `null` when not recognised.
    pub fn data(&self) -> Value {
        match &self.outcome {
            ExtractionOutcome::Recognized(cert) => Value::Object(cert.raw().clone()),
            ExtractionOutcome::NotRecognized(_) => Value::Null,
        }
    }
}

/// What the model's answer amounted to.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome {
    Recognized(Certificate),
    NotRecognized(NotRecognizedReason),
}

impl ExtractionOutcome {
    pub fn is_recognized(&self) -> bool {
        matches!(self, ExtractionOutcome::Recognized(_))
    }

    pub fn certificate(&self) -> Option<&Certificate> {
        match self {
            ExtractionOutcome::Recognized(cert) => Some(cert),
            ExtractionOutcome::NotRecognized(_) => None,
        }
    }
}

/// Why an answer was treated as "not an ACORD 25".
///
/// All four reasons look the same to HTTP callers (`data: null`); they are
/// kept apart for logs and the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotRecognizedReason {
    /// The model answered with the `null` literal.
    ExplicitNull,
    /// No `{…}` span in the answer.
    NoJsonObject,
    /// A `{…}` span that is not valid JSON.
    Malformed,
    /// A valid but empty object.
    Empty,
}

impl NotRecognizedReason {
    pub fn as_str(self) -> &'static str {
        match self {
            NotRecognizedReason::ExplicitNull => "model reported the document is not an ACORD 25",
            NotRecognizedReason::NoJsonObject => "model answer contained no JSON object",
            NotRecognizedReason::Malformed => "model answer contained malformed JSON",
            NotRecognizedReason::Empty => "model answer was an empty object",
        }
    }
}

impl fmt::Display for NotRecognizedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recognised certificate: the model's object plus its typed projection.
#[derive(Debug, Clone, PartialEq)]
pub struct Certificate {
    raw: Map<String, Value>,
    data: CertificateData,
}

impl Certificate {
    /// Wrap a parsed JSON object.
    ///
    /// If the object does not fit the schema (e.g. `insurers` is a string)
    /// the typed projection falls back to its default and a warning is
    /// logged; the raw object is kept either way.
    pub fn from_object(raw: Map<String, Value>) -> Self {
        let data = match serde_json::from_value::<CertificateData>(Value::Object(raw.clone())) {
            Ok(data) => data,
            Err(e) => {
                warn!("Certificate does not match the typed schema: {}", e);
                CertificateData::default()
            }
        };
        Self { raw, data }
    }

    /// The object exactly as the model produced it.
    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }

    pub fn data(&self) -> &CertificateData {
        &self.data
    }
}

impl Serialize for Certificate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

// ── Schema ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateData {
    #[serde(default)]
    pub certificate_information: Option<CertificateInformation>,
    #[serde(default, deserialize_with = "vec_or_null")]
    pub insurers: Vec<Insurer>,
    #[serde(default, deserialize_with = "vec_or_null")]
    pub policies: Vec<Policy>,
    #[serde(default)]
    pub producer_information: Option<ProducerInformation>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateInformation {
    #[serde(default, deserialize_with = "lenient_string")]
    pub certificate_holder: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub certificate_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub revision_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub issue_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insurer {
    #[serde(default, deserialize_with = "lenient_string")]
    pub insurer_letter: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub insurer_name: Option<String>,
    /// NAIC registry code.
    #[serde(default, deserialize_with = "lenient_string")]
    pub naic_code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    #[serde(default)]
    pub policy_information: Option<PolicyInformation>,
    #[serde(default, deserialize_with = "vec_or_null")]
    pub coverages: Vec<Coverage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyInformation {
    #[serde(default, deserialize_with = "lenient_string")]
    pub type_of_insurance: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub insurer_letter: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub policy_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub policy_effective_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub policy_expiration_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coverage {
    #[serde(default, deserialize_with = "lenient_string")]
    pub limit_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub limit_value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerInformation {
    #[serde(default)]
    pub name: Option<ProducerName>,
    #[serde(default)]
    pub contact: Option<ProducerContact>,
    #[serde(default)]
    pub address: Option<Address>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerName {
    #[serde(default, deserialize_with = "lenient_string")]
    pub producer_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerContact {
    #[serde(default, deserialize_with = "lenient_string")]
    pub contact_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub fax: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default, deserialize_with = "lenient_string")]
    pub street: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub postal_code: Option<String>,
}

/// Accept strings, numbers and booleans as text; `null` as absent.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

fn vec_or_null<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn typed_projection_is_lenient() {
        let cert = Certificate::from_object(object(json!({
            "certificate_information": { "certificate_number": 1234, "issue_date": "01/02/2025" },
            "insurers": null,
            "policies": [{
                "policy_information": { "policy_number": "GL-99" },
                "coverages": [{ "limit_type": "EACH OCCURRENCE", "limit_value": 1000000 }]
            }]
        })));

        let data = cert.data();
        let info = data.certificate_information.as_ref().unwrap();
        assert_eq!(info.certificate_number.as_deref(), Some("1234"));
        assert!(info.certificate_holder.is_none());
        assert!(data.insurers.is_empty());
        assert_eq!(
            data.policies[0].coverages[0].limit_value.as_deref(),
            Some("1000000")
        );
        assert!(data.producer_information.is_none());
    }

    #[test]
    fn raw_object_survives_schema_mismatch() {
        let raw = object(json!({ "insurers": "Acme Mutual", "extra": true }));
        let cert = Certificate::from_object(raw.clone());
        assert_eq!(cert.data(), &CertificateData::default());
        assert_eq!(cert.raw(), &raw);
        assert_eq!(serde_json::to_value(&cert).unwrap(), Value::Object(raw));
    }

    #[test]
    fn not_recognized_serializes_as_null() {
        let extraction = Extraction {
            outcome: ExtractionOutcome::NotRecognized(NotRecognizedReason::Malformed),
            model: "m".into(),
            files_processed: 1,
        };
        assert_eq!(extraction.data(), Value::Null);
        assert!(!extraction.outcome.is_recognized());
    }
}
