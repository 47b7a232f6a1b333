use chrono::{DateTime, Utc};

use crate::ids::DocumentId;

/// A raw security event in the unsharded `events` feed.
#[derive(Debug, Clone)]
pub struct Event {
    /// Stable identifier assigned by the store on creation.
    pub id: DocumentId,
    /// Producing subsystem or sensor.
    pub source: String,
    /// Free-form message text.
    pub message: String,
    /// Server-assigned write timestamp.
    pub timestamp: DateTime<Utc>,
}
