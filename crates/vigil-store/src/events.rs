//! Unsharded raw security-event feed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use vigil_core::{CoreError, CoreResult, DocumentId, Event, QueryConfig};

use crate::document::{Document, DocumentStore, RangeQuery};

const EVENTS: &str = "events";
const TIMESTAMP_FIELD: &str = "timestamp";
const SOURCE_FIELD: &str = "source";

#[derive(Debug, Serialize, Deserialize)]
struct EventDocument {
    source: String,
    message: String,
    timestamp: DateTime<Utc>,
}

/// Append and range-query access to the `events` collection.
pub struct EventRepository {
    store: Arc<dyn DocumentStore>,
    page_size: usize,
}

impl EventRepository {
    pub fn new(store: Arc<dyn DocumentStore>, config: QueryConfig) -> Self {
        Self {
            store,
            page_size: config.page_size,
        }
    }

    /// Appends an event with a server-assigned timestamp.
    pub async fn add(
        &self,
        source: impl Into<String>,
        message: impl Into<String>,
    ) -> CoreResult<DocumentId> {
        let document = EventDocument {
            source: source.into(),
            message: message.into(),
            timestamp: Utc::now(),
        };
        self.store
            .insert(EVENTS, serde_json::to_value(&document)?)
            .await
    }

    /// Returns events in `[start, end]`, newest first, capped at the
    /// configured page size, optionally restricted to one source.
    pub async fn query(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        source: Option<&str>,
    ) -> CoreResult<Vec<Event>> {
        if start > end {
            return Err(CoreError::validation(format!(
                "query range start {start} is after end {end}"
            )));
        }

        let query = RangeQuery {
            field: TIMESTAMP_FIELD,
            start,
            end,
            eq: source.map(|source| (SOURCE_FIELD, Value::String(source.to_string()))),
            limit: self.page_size,
        };
        let documents = self.store.query_range(EVENTS, query).await?;

        let mut events = Vec::with_capacity(documents.len());
        for Document { id, value } in documents {
            let document: EventDocument = serde_json::from_value(value)?;
            events.push(Event {
                id,
                source: document.source,
                message: document.message,
                timestamp: document.timestamp,
            });
        }
        Ok(events)
    }
}
