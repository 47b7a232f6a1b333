//! In-memory document store for tests and embedders.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::Value;

use vigil_core::{CoreError, CoreResult, DocumentId};

use crate::document::{Document, DocumentStore, RangeQuery, Revision, VersionedDocument};

#[derive(Debug, Clone)]
struct StoredDocument {
    value: Value,
    revision: u64,
}

/// In-memory document store backed by per-collection maps.
///
/// Every write path bumps the document revision, so the versioned get/put
/// pair behaves like a remote store's compare-and-swap primitive.
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    collections: Arc<RwLock<HashMap<String, BTreeMap<String, StoredDocument>>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn parse_timestamp(value: &Value, field: &str) -> Option<DateTime<Utc>> {
        value
            .get(field)
            .and_then(Value::as_str)
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|ts| ts.with_timezone(&Utc))
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn insert(&self, collection: &str, value: Value) -> CoreResult<DocumentId> {
        if !value.is_object() {
            return Err(CoreError::validation(format!(
                "document for collection `{collection}` must be a JSON object"
            )));
        }

        let id = DocumentId::new();
        let mut collections = self.collections.write();
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), StoredDocument { value, revision: 1 });
        Ok(id)
    }

    async fn get(&self, collection: &str, id: &DocumentId) -> CoreResult<Option<Value>> {
        let collections = self.collections.read();
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(&id.to_string()))
            .map(|doc| doc.value.clone()))
    }

    async fn merge(&self, collection: &str, id: &DocumentId, patch: Value) -> CoreResult<()> {
        let patch = match patch {
            Value::Object(map) => map,
            other => {
                return Err(CoreError::validation(format!(
                    "merge patch must be a JSON object, received {other}"
                )))
            }
        };

        let mut collections = self.collections.write();
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(&id.to_string()))
            .ok_or_else(|| CoreError::not_found("document", id.to_string()))?;

        let fields = doc.value.as_object_mut().ok_or_else(|| {
            CoreError::Storage(format!("document `{id}` in `{collection}` is not an object"))
        })?;
        for (field, value) in patch {
            fields.insert(field, value);
        }
        doc.revision += 1;
        Ok(())
    }

    async fn list(&self, collection: &str) -> CoreResult<Vec<Document>> {
        let collections = self.collections.read();
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        docs.iter()
            .map(|(key, doc)| {
                let id = DocumentId::from_str(key).map_err(|_| {
                    CoreError::Storage(format!("non-uuid key `{key}` in collection `{collection}`"))
                })?;
                Ok(Document {
                    id,
                    value: doc.value.clone(),
                })
            })
            .collect()
    }

    async fn query_range(&self, collection: &str, query: RangeQuery) -> CoreResult<Vec<Document>> {
        let mut matches: Vec<(DateTime<Utc>, Document)> = Vec::new();
        {
            let collections = self.collections.read();
            let Some(docs) = collections.get(collection) else {
                return Ok(Vec::new());
            };

            for (key, doc) in docs {
                let Some(ts) = Self::parse_timestamp(&doc.value, query.field) else {
                    continue;
                };
                if ts < query.start || ts > query.end {
                    continue;
                }
                if let Some((field, expected)) = &query.eq {
                    if doc.value.get(field) != Some(expected) {
                        continue;
                    }
                }

                let id = DocumentId::from_str(key).map_err(|_| {
                    CoreError::Storage(format!("non-uuid key `{key}` in collection `{collection}`"))
                })?;
                matches.push((
                    ts,
                    Document {
                        id,
                        value: doc.value.clone(),
                    },
                ));
            }
        }

        matches.sort_by(|a, b| b.0.cmp(&a.0));
        matches.truncate(query.limit);
        Ok(matches.into_iter().map(|(_, doc)| doc).collect())
    }

    async fn get_versioned(
        &self,
        collection: &str,
        key: &str,
    ) -> CoreResult<Option<VersionedDocument>> {
        let collections = self.collections.read();
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(key))
            .map(|doc| VersionedDocument {
                value: doc.value.clone(),
                revision: doc.revision,
            }))
    }

    async fn put_versioned(
        &self,
        collection: &str,
        key: &str,
        value: Value,
        expected: Revision,
    ) -> CoreResult<()> {
        let mut collections = self.collections.write();
        let docs = collections.entry(collection.to_string()).or_default();

        let revision = match (docs.get(key), expected) {
            (None, Revision::Absent) => 1,
            (Some(doc), Revision::At(rev)) if doc.revision == rev => rev + 1,
            (None, Revision::At(rev)) => {
                return Err(CoreError::conflict(format!(
                    "`{collection}/{key}` expected revision {rev} but the document is gone"
                )))
            }
            (Some(_), Revision::Absent) => {
                return Err(CoreError::conflict(format!(
                    "`{collection}/{key}` was created by a concurrent writer"
                )))
            }
            (Some(doc), Revision::At(rev)) => {
                return Err(CoreError::conflict(format!(
                    "`{collection}/{key}` expected revision {rev}, found {}",
                    doc.revision
                )))
            }
        };

        docs.insert(key.to_string(), StoredDocument { value, revision });
        Ok(())
    }
}
