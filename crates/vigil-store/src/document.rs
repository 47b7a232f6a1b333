//! Abstract document store interface.
//!
//! Models the remote database as named collections of JSON documents. Two
//! addressing schemes coexist: append-style collections where the store
//! assigns a [`DocumentId`] on insert (indicators, logs, events), and keyed
//! documents under optimistic revision control (per-day summary counters).
//! The versioned get/put pair is the store-boundary primitive that makes the
//! summary increment atomic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use vigil_core::{CoreResult, DocumentId};

/// A stored document together with its store-assigned identifier.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: DocumentId,
    pub value: Value,
}

/// A keyed document together with its current revision.
#[derive(Debug, Clone)]
pub struct VersionedDocument {
    pub value: Value,
    pub revision: u64,
}

/// Revision expectation for an optimistic keyed write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Revision {
    /// The document must not exist yet (atomic create).
    Absent,
    /// The document must currently be at this revision.
    At(u64),
}

/// A timestamp range query over one collection.
#[derive(Debug, Clone)]
pub struct RangeQuery {
    /// Document field holding the RFC 3339 timestamp to filter and order by.
    pub field: &'static str,
    /// Inclusive lower bound.
    pub start: DateTime<Utc>,
    /// Inclusive upper bound.
    pub end: DateTime<Utc>,
    /// Optional `field == value` equality filter applied alongside the range.
    pub eq: Option<(&'static str, Value)>,
    /// Maximum number of documents returned.
    pub limit: usize,
}

/// Interface to the underlying document database.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Appends a document to a collection, assigning it a fresh identifier.
    async fn insert(&self, collection: &str, value: Value) -> CoreResult<DocumentId>;

    /// Fetches a document by identifier.
    async fn get(&self, collection: &str, id: &DocumentId) -> CoreResult<Option<Value>>;

    /// Shallow-merges `patch` fields into an existing document.
    ///
    /// Fails with `NotFound` when the document does not exist; existing
    /// fields not named in `patch` are left untouched.
    async fn merge(&self, collection: &str, id: &DocumentId, patch: Value) -> CoreResult<()>;

    /// Returns every document in a collection.
    async fn list(&self, collection: &str) -> CoreResult<Vec<Document>>;

    /// Returns documents matching a timestamp range, ordered by the range
    /// field descending and capped at `query.limit`.
    async fn query_range(&self, collection: &str, query: RangeQuery) -> CoreResult<Vec<Document>>;

    /// Fetches a keyed document and its revision.
    async fn get_versioned(
        &self,
        collection: &str,
        key: &str,
    ) -> CoreResult<Option<VersionedDocument>>;

    /// Writes a keyed document, guarded by a revision expectation.
    ///
    /// Fails with `Conflict` when the expectation does not hold, letting the
    /// caller re-read and retry.
    async fn put_versioned(
        &self,
        collection: &str,
        key: &str,
        value: Value,
        expected: Revision,
    ) -> CoreResult<()>;
}
