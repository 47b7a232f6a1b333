use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::DocumentId;

/// Severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    /// Returns the canonical lowercase string stored in log documents.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

impl FromStr for Severity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(Self::Info),
            "warning" => Ok(Self::Warning),
            "critical" => Ok(Self::Critical),
            _ => Err(()),
        }
    }
}

/// A log record owned by the month partition it was written into.
///
/// Immutable after creation; ownership never transfers between partitions.
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Stable identifier assigned by the store on creation.
    pub id: DocumentId,
    /// Producing subsystem or sensor.
    pub source: String,
    /// Record severity.
    pub severity: Severity,
    /// Free-form message text.
    pub message: String,
    /// Server-assigned write timestamp.
    pub timestamp: DateTime<Utc>,
}
