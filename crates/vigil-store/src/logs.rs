//! Month-sharded log store.
//!
//! A single unbounded collection of all log history would force every range
//! query to scan the entire corpus; partitioning by calendar month bounds
//! each query's working set to one month of data and lets old partitions be
//! pruned or archived independently.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use vigil_core::{CoreError, CoreResult, DocumentId, LogEntry, QueryConfig, Severity};

use crate::document::{Document, DocumentStore, RangeQuery};
use crate::summary::SummaryAggregator;

const TIMESTAMP_FIELD: &str = "timestamp";
const SEVERITY_FIELD: &str = "severity";

/// One calendar-month shard of the log store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogPartition {
    pub year: i32,
    pub month: u32,
}

impl LogPartition {
    /// Partition owning records written at `instant`.
    #[must_use]
    pub fn containing(instant: DateTime<Utc>) -> Self {
        Self {
            year: instant.year(),
            month: instant.month(),
        }
    }

    /// Every partition overlapping the inclusive `[start, end]` range.
    #[must_use]
    pub fn covering(start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<Self> {
        let mut partitions = Vec::new();
        for year in start.year()..=end.year() {
            let first = if year == start.year() { start.month() } else { 1 };
            let last = if year == end.year() { end.month() } else { 12 };
            for month in first..=last {
                partitions.push(Self { year, month });
            }
        }
        partitions
    }

    /// Collection path of this partition.
    #[must_use]
    pub fn collection(&self) -> String {
        format!("logs/{}/{}", self.year, self.month)
    }
}

/// Persisted shape of a log document.
#[derive(Debug, Serialize, Deserialize)]
struct LogDocument {
    source: String,
    severity: Severity,
    message: String,
    timestamp: DateTime<Utc>,
}

/// Append and range-query access to the partitioned log store.
pub struct ShardedLogRepository {
    store: Arc<dyn DocumentStore>,
    summaries: Arc<SummaryAggregator>,
    page_size: usize,
}

impl ShardedLogRepository {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        summaries: Arc<SummaryAggregator>,
        config: QueryConfig,
    ) -> Self {
        Self {
            store,
            summaries,
            page_size: config.page_size,
        }
    }

    /// Appends a log record to the current month's partition.
    ///
    /// The per-day severity counter is then incremented best-effort: logs
    /// are the record of truth and the counters a derived aggregate, so an
    /// increment failure is logged and never rolls back the write.
    pub async fn add(
        &self,
        source: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
    ) -> CoreResult<DocumentId> {
        let now = Utc::now();
        let document = LogDocument {
            source: source.into(),
            severity,
            message: message.into(),
            timestamp: now,
        };

        let collection = LogPartition::containing(now).collection();
        let id = self
            .store
            .insert(&collection, serde_json::to_value(&document)?)
            .await?;

        if let Err(err) = self.summaries.increment(now.date_naive(), severity).await {
            warn!(
                date = %now.date_naive(),
                severity = severity.as_str(),
                error = %err,
                "summary increment failed after log write"
            );
        }

        Ok(id)
    }

    /// Queries every partition overlapping `[start, end]` concurrently.
    ///
    /// Each partition query is ordered newest-first and capped at the
    /// configured page size; partition results are concatenated in partition
    /// order without a global re-sort (callers needing global order sort the
    /// result themselves). Any partition failure fails the whole call.
    pub async fn query(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        severity: Option<Severity>,
    ) -> CoreResult<Vec<LogEntry>> {
        if start > end {
            return Err(CoreError::validation(format!(
                "query range start {start} is after end {end}"
            )));
        }

        let queries = LogPartition::covering(start, end).into_iter().map(|partition| {
            let store = Arc::clone(&self.store);
            let eq = severity
                .map(|severity| (SEVERITY_FIELD, Value::String(severity.as_str().to_string())));
            let query = RangeQuery {
                field: TIMESTAMP_FIELD,
                start,
                end,
                eq,
                limit: self.page_size,
            };
            async move { store.query_range(&partition.collection(), query).await }
        });

        let partitions = try_join_all(queries).await?;

        let mut entries = Vec::new();
        for Document { id, value } in partitions.into_iter().flatten() {
            let document: LogDocument = serde_json::from_value(value)?;
            entries.push(LogEntry {
                id,
                source: document.source,
                severity: document.severity,
                message: document.message,
                timestamp: document.timestamp,
            });
        }
        Ok(entries)
    }
}
