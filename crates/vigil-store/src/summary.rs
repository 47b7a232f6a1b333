//! Per-day severity counters.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::warn;

use vigil_core::{CoreError, CoreResult, RetryConfig, Severity, SummaryCounter};

use crate::document::{DocumentStore, Revision};

const SUMMARIES: &str = "summaries";

/// Maintains the day-keyed severity counter documents.
pub struct SummaryAggregator {
    store: Arc<dyn DocumentStore>,
    retry: RetryConfig,
}

impl SummaryAggregator {
    pub fn new(store: Arc<dyn DocumentStore>, retry: RetryConfig) -> Self {
        Self { store, retry }
    }

    /// Atomically increments the `severity` counter for `date`, creating the
    /// day's document on first write.
    ///
    /// Implemented as a compare-and-swap loop at the store boundary: read the
    /// counter with its revision, apply the increment (or build the day's
    /// first document with the triggering severity at 1), and write back
    /// guarded by that revision. Losing the race surfaces as `Conflict` and
    /// the loop retries with exponential backoff, so concurrent increments
    /// are never lost — a plain read-branch-write here would drop one of two
    /// racing first writes of a day.
    pub async fn increment(&self, date: NaiveDate, severity: Severity) -> CoreResult<()> {
        let key = date.to_string();
        let mut attempt: u32 = 0;

        loop {
            let (counter, expected) = match self.store.get_versioned(SUMMARIES, &key).await? {
                Some(doc) => {
                    let mut counter: SummaryCounter = serde_json::from_value(doc.value)?;
                    counter.bump(severity);
                    (counter, Revision::At(doc.revision))
                }
                None => (SummaryCounter::first(date, severity), Revision::Absent),
            };

            match self
                .store
                .put_versioned(SUMMARIES, &key, serde_json::to_value(&counter)?, expected)
                .await
            {
                Ok(()) => return Ok(()),
                Err(CoreError::Conflict { .. }) if attempt < self.retry.max_attempts => {
                    attempt += 1;
                    tokio::time::sleep(self.retry.backoff_for_attempt(attempt)).await;
                }
                Err(err) => {
                    if matches!(err, CoreError::Conflict { .. }) {
                        warn!(date = %key, attempts = attempt, "summary increment exhausted its retries");
                    }
                    return Err(err);
                }
            }
        }
    }

    /// Reads the counter document for `date`, if that day has any writes.
    pub async fn get(&self, date: NaiveDate) -> CoreResult<Option<SummaryCounter>> {
        match self.store.get_versioned(SUMMARIES, &date.to_string()).await? {
            Some(doc) => Ok(Some(serde_json::from_value(doc.value)?)),
            None => Ok(None),
        }
    }
}
