use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ids::DocumentId;

/// Kind of threat indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorType {
    Ip,
    Domain,
    Url,
    FileHash,
}

impl IndicatorType {
    /// Returns the canonical string stored in indicator documents.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ip => "ip",
            Self::Domain => "domain",
            Self::Url => "url",
            Self::FileHash => "file_hash",
        }
    }
}

impl FromStr for IndicatorType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ip" => Ok(Self::Ip),
            "domain" => Ok(Self::Domain),
            "url" => Ok(Self::Url),
            "file_hash" => Ok(Self::FileHash),
            _ => Err(()),
        }
    }
}

/// Analyst confidence rating for an indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Returns the canonical lowercase string stored in indicator documents.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Read-time classification of a stored indicator.
///
/// Persisted as a hint on the document, but always re-derived on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorStatus {
    Valid,
    Corrupted,
}

/// Decrypted indicator payload: a JSON string or a JSON object.
///
/// Other JSON shapes (numbers, arrays, booleans) are rejected at the write
/// boundary, so readers can pattern-match instead of probing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndicatorPayload {
    Text(String),
    Object(Map<String, Value>),
}

impl IndicatorPayload {
    /// Builds a string payload.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }
}

/// In-memory value of an indicator after a read.
#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorValue {
    /// The decrypted, parsed payload of a readable record.
    Payload(IndicatorPayload),
    /// Diagnostic for a record whose value could not be decrypted or parsed.
    Corrupted(String),
}

/// A threat intelligence record as returned by a listing.
#[derive(Debug, Clone)]
pub struct ThreatIndicator {
    /// Stable identifier assigned by the store on creation.
    pub id: DocumentId,
    /// Indicator kind.
    pub kind: IndicatorType,
    /// Parsed payload, or a diagnostic string for corrupted records.
    pub value: IndicatorValue,
    /// Confidence rating; forced to `low` for corrupted records.
    pub confidence: Confidence,
    /// Whether an analyst has verified the indicator; forced to `false` for
    /// corrupted records.
    pub verified: bool,
    /// Read-time classification.
    pub status: IndicatorStatus,
    /// Timestamp of the most recent successful or attempted validation.
    pub last_validation: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indicator_type_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&IndicatorType::FileHash).unwrap(),
            "\"file_hash\""
        );
        assert_eq!(IndicatorType::from_str("url"), Ok(IndicatorType::Url));
        assert!(IndicatorType::from_str("md5").is_err());
    }

    #[test]
    fn payload_deserializes_untagged() {
        let text: IndicatorPayload = serde_json::from_str("\"1.2.3.4\"").unwrap();
        assert_eq!(text, IndicatorPayload::text("1.2.3.4"));

        let object: IndicatorPayload = serde_json::from_str("{\"cidr\":\"10.0.0.0/8\"}").unwrap();
        assert!(matches!(object, IndicatorPayload::Object(_)));

        // Bare numbers and arrays are not representable payloads.
        assert!(serde_json::from_str::<IndicatorPayload>("42").is_err());
        assert!(serde_json::from_str::<IndicatorPayload>("[1,2]").is_err());
    }
}
