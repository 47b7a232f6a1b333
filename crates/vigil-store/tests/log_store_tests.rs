//! Integration tests for the month-sharded log store and its summary
//! counters.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use vigil_core::{CoreError, CoreResult, DocumentId, QueryConfig, RetryConfig, Severity};
use vigil_store::{
    Document, DocumentStore, MemoryDocumentStore, RangeQuery, Revision, ShardedLogRepository,
    SummaryAggregator, VersionedDocument,
};

fn at(rfc3339: &str) -> DateTime<Utc> {
    rfc3339.parse().unwrap()
}

fn repository(store: Arc<dyn DocumentStore>) -> ShardedLogRepository {
    let summaries = Arc::new(SummaryAggregator::new(
        Arc::clone(&store),
        RetryConfig::default(),
    ));
    ShardedLogRepository::new(store, summaries, QueryConfig::default())
}

/// Seeds a log document directly into a partition, bypassing the write path
/// so tests can populate past months.
async fn seed_log(
    store: &Arc<MemoryDocumentStore>,
    partition: &str,
    severity: &str,
    timestamp: &str,
) {
    store
        .insert(
            partition,
            json!({
                "source": "seed",
                "severity": severity,
                "message": "seeded entry",
                "timestamp": timestamp,
            }),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn add_writes_the_current_partition_and_counts_the_day() {
    let store = Arc::new(MemoryDocumentStore::new());
    let summaries = Arc::new(SummaryAggregator::new(
        Arc::clone(&store) as Arc<dyn DocumentStore>,
        RetryConfig::default(),
    ));
    let repo = ShardedLogRepository::new(
        Arc::clone(&store) as Arc<dyn DocumentStore>,
        Arc::clone(&summaries),
        QueryConfig::default(),
    );

    repo.add("auth", Severity::Critical, "brute force detected")
        .await
        .unwrap();

    let now = Utc::now();
    let entries = repo
        .query(now - chrono::Duration::hours(1), now + chrono::Duration::hours(1), None)
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].source, "auth");
    assert_eq!(entries[0].severity, Severity::Critical);

    let counter = summaries.get(now.date_naive()).await.unwrap().unwrap();
    assert_eq!(counter.critical_count, 1);
}

#[tokio::test]
async fn query_touches_only_overlapping_partitions() {
    let store = Arc::new(MemoryDocumentStore::new());
    seed_log(&store, "logs/2023/1", "info", "2023-01-10T08:00:00Z").await;
    seed_log(&store, "logs/2023/2", "info", "2023-02-10T08:00:00Z").await;
    seed_log(&store, "logs/2023/3", "info", "2023-03-10T08:00:00Z").await;
    // Same partition as the March hit, but past the range end.
    seed_log(&store, "logs/2023/3", "info", "2023-03-20T08:00:00Z").await;
    // Partition entirely outside the range.
    seed_log(&store, "logs/2023/4", "info", "2023-04-10T08:00:00Z").await;

    let repo = repository(Arc::clone(&store) as Arc<dyn DocumentStore>);
    let entries = repo
        .query(at("2023-01-01T00:00:00Z"), at("2023-03-15T23:59:59Z"), None)
        .await
        .unwrap();

    assert_eq!(entries.len(), 3);
    for entry in &entries {
        assert!(entry.timestamp >= at("2023-01-01T00:00:00Z"));
        assert!(entry.timestamp <= at("2023-03-15T23:59:59Z"));
    }
}

#[tokio::test]
async fn query_filters_by_severity() {
    let store = Arc::new(MemoryDocumentStore::new());
    seed_log(&store, "logs/2023/1", "info", "2023-01-10T08:00:00Z").await;
    seed_log(&store, "logs/2023/1", "critical", "2023-01-11T08:00:00Z").await;
    seed_log(&store, "logs/2023/2", "critical", "2023-02-10T08:00:00Z").await;

    let repo = repository(Arc::clone(&store) as Arc<dyn DocumentStore>);
    let entries = repo
        .query(
            at("2023-01-01T00:00:00Z"),
            at("2023-02-28T23:59:59Z"),
            Some(Severity::Critical),
        )
        .await
        .unwrap();

    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|entry| entry.severity == Severity::Critical));
}

#[tokio::test]
async fn query_orders_newest_first_within_a_partition() {
    let store = Arc::new(MemoryDocumentStore::new());
    seed_log(&store, "logs/2023/1", "info", "2023-01-10T08:00:00Z").await;
    seed_log(&store, "logs/2023/1", "info", "2023-01-12T08:00:00Z").await;
    seed_log(&store, "logs/2023/1", "info", "2023-01-11T08:00:00Z").await;

    let repo = repository(Arc::clone(&store) as Arc<dyn DocumentStore>);
    let entries = repo
        .query(at("2023-01-01T00:00:00Z"), at("2023-01-31T23:59:59Z"), None)
        .await
        .unwrap();

    let days: Vec<u32> = entries
        .iter()
        .map(|entry| entry.timestamp.format("%d").to_string().parse().unwrap())
        .collect();
    assert_eq!(days, vec![12, 11, 10]);
}

#[tokio::test]
async fn inverted_range_is_a_validation_error() {
    let store = Arc::new(MemoryDocumentStore::new());
    let repo = repository(store as Arc<dyn DocumentStore>);

    let err = repo
        .query(at("2023-03-01T00:00:00Z"), at("2023-01-01T00:00:00Z"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
}

/// Store wrapper that fails selected operations on selected collections.
struct FaultyStore {
    inner: Arc<MemoryDocumentStore>,
    fail_query_on: Option<&'static str>,
    fail_puts_on: Option<&'static str>,
}

#[async_trait]
impl DocumentStore for FaultyStore {
    async fn insert(&self, collection: &str, value: Value) -> CoreResult<DocumentId> {
        self.inner.insert(collection, value).await
    }

    async fn get(&self, collection: &str, id: &DocumentId) -> CoreResult<Option<Value>> {
        self.inner.get(collection, id).await
    }

    async fn merge(&self, collection: &str, id: &DocumentId, patch: Value) -> CoreResult<()> {
        self.inner.merge(collection, id, patch).await
    }

    async fn list(&self, collection: &str) -> CoreResult<Vec<Document>> {
        self.inner.list(collection).await
    }

    async fn query_range(&self, collection: &str, query: RangeQuery) -> CoreResult<Vec<Document>> {
        if self.fail_query_on == Some(collection) {
            return Err(CoreError::Storage(format!(
                "injected query failure for `{collection}`"
            )));
        }
        self.inner.query_range(collection, query).await
    }

    async fn get_versioned(
        &self,
        collection: &str,
        key: &str,
    ) -> CoreResult<Option<VersionedDocument>> {
        self.inner.get_versioned(collection, key).await
    }

    async fn put_versioned(
        &self,
        collection: &str,
        key: &str,
        value: Value,
        expected: Revision,
    ) -> CoreResult<()> {
        if self.fail_puts_on == Some(collection) {
            return Err(CoreError::Storage(format!(
                "injected write failure for `{collection}`"
            )));
        }
        self.inner.put_versioned(collection, key, value, expected).await
    }
}

#[tokio::test]
async fn one_failing_partition_fails_the_whole_query() {
    let inner = Arc::new(MemoryDocumentStore::new());
    seed_log(&inner, "logs/2023/1", "info", "2023-01-10T08:00:00Z").await;
    seed_log(&inner, "logs/2023/3", "info", "2023-03-10T08:00:00Z").await;

    let store = Arc::new(FaultyStore {
        inner,
        fail_query_on: Some("logs/2023/2"),
        fail_puts_on: None,
    });
    let repo = repository(store as Arc<dyn DocumentStore>);

    let err = repo
        .query(at("2023-01-01T00:00:00Z"), at("2023-03-31T23:59:59Z"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Storage(_)));
}

#[tokio::test]
async fn a_failing_summary_increment_never_fails_the_log_write() {
    let inner = Arc::new(MemoryDocumentStore::new());
    let store = Arc::new(FaultyStore {
        inner: Arc::clone(&inner),
        fail_query_on: None,
        fail_puts_on: Some("summaries"),
    });
    let repo = repository(Arc::clone(&store) as Arc<dyn DocumentStore>);

    repo.add("auth", Severity::Warning, "still recorded")
        .await
        .unwrap();

    let now = Utc::now();
    let entries = repo
        .query(now - chrono::Duration::hours(1), now + chrono::Duration::hours(1), None)
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].message, "still recorded");
}
