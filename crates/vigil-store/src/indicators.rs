//! Encrypted threat-indicator store.
//!
//! Indicator payloads are persisted as ciphertext wrapping JSON text. The
//! read pipeline (decrypt, sanitize, parse) classifies every record as valid
//! or corrupted; corrupted records are always returned to the caller with a
//! diagnostic value instead of failing the listing, and each one is handed to
//! the background repair queue once per listing.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{error, warn};

use vigil_core::{
    Confidence, CoreError, CoreResult, DocumentId, IndicatorPayload, IndicatorStatus,
    IndicatorType, IndicatorValue, RepairConfig, ThreatIndicator,
};

use crate::crypto::EncryptionCodec;
use crate::document::{Document, DocumentStore};
use crate::repair::RepairQueue;
use crate::sanitize::sanitize;

pub(crate) const INDICATORS: &str = "indicators";

/// Persisted shape of an indicator document.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndicatorDocument {
    #[serde(rename = "type")]
    kind: IndicatorType,
    /// Ciphertext of the JSON-serialized payload.
    value: String,
    confidence: Confidence,
    #[serde(default)]
    verified: bool,
    /// Persisted classification hint; re-derived on every read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status: Option<IndicatorStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_validation: Option<chrono::DateTime<Utc>>,
}

/// Partial update for an existing indicator.
///
/// `status` is deliberately not part of this struct: a corrupted record
/// regains `valid` only through a successful repair, never by direct write.
#[derive(Debug, Clone, Default)]
pub struct IndicatorUpdate {
    pub kind: Option<IndicatorType>,
    pub value: Option<IndicatorPayload>,
    pub confidence: Option<Confidence>,
    pub verified: Option<bool>,
}

/// CRUD, corruption detection, and repair for threat indicators.
pub struct IndicatorRepository {
    store: Arc<dyn DocumentStore>,
    codec: Arc<EncryptionCodec>,
    repair_queue: RepairQueue,
}

impl IndicatorRepository {
    /// Builds the repository and starts its background repair worker.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        codec: Arc<EncryptionCodec>,
        repair: RepairConfig,
    ) -> Self {
        let repair_queue = RepairQueue::spawn(Arc::clone(&store), Arc::clone(&codec), repair);
        Self {
            store,
            codec,
            repair_queue,
        }
    }

    /// Returns every stored indicator, classifying each as valid or corrupted.
    ///
    /// Per-record decode failures are isolated: the failing record comes back
    /// with `status = corrupted`, a diagnostic value, confidence forced to
    /// `low`, and one repair job enqueued — the remaining records are
    /// unaffected and the listing itself never fails over record contents.
    pub async fn list(&self) -> CoreResult<Vec<ThreatIndicator>> {
        let documents = self.store.list(INDICATORS).await?;
        let now = Utc::now();

        let mut indicators = Vec::with_capacity(documents.len());
        for Document { id, value } in documents {
            let document: IndicatorDocument = match serde_json::from_value(value) {
                Ok(document) => document,
                Err(err) => {
                    warn!(id = %id, error = %err, "skipping indicator document with unreadable shape");
                    continue;
                }
            };

            match decode_stored_value(&self.codec, &document.value) {
                Ok((_, payload)) => indicators.push(ThreatIndicator {
                    id,
                    kind: document.kind,
                    value: IndicatorValue::Payload(payload),
                    confidence: document.confidence,
                    verified: document.verified,
                    status: IndicatorStatus::Valid,
                    last_validation: now,
                }),
                Err(err) => {
                    error!(id = %id, error = %err, "corrupted threat indicator");
                    indicators.push(ThreatIndicator {
                        id,
                        kind: document.kind,
                        value: IndicatorValue::Corrupted(format!("corrupted data ({id}): {err}")),
                        confidence: Confidence::Low,
                        verified: false,
                        status: IndicatorStatus::Corrupted,
                        last_validation: now,
                    });
                    self.repair_queue.enqueue(id);
                }
            }
        }

        Ok(indicators)
    }

    /// Encrypts and persists a new indicator. Returns the assigned id.
    pub async fn add(
        &self,
        kind: IndicatorType,
        payload: IndicatorPayload,
        confidence: Confidence,
    ) -> CoreResult<DocumentId> {
        let encrypted = encode_payload(&self.codec, &payload)?;
        let document = IndicatorDocument {
            kind,
            value: encrypted,
            confidence,
            verified: false,
            status: Some(IndicatorStatus::Valid),
            last_validation: Some(Utc::now()),
        };
        self.store
            .insert(INDICATORS, serde_json::to_value(&document)?)
            .await
    }

    /// Merges the given fields into an existing indicator.
    ///
    /// A new value is validated and re-encrypted exactly as in
    /// [`add`](Self::add); `last_validation` always refreshes.
    pub async fn update(&self, id: DocumentId, changes: IndicatorUpdate) -> CoreResult<()> {
        if self.store.get(INDICATORS, &id).await?.is_none() {
            return Err(CoreError::not_found("indicator", id.to_string()));
        }

        let mut patch = Map::new();
        if let Some(kind) = changes.kind {
            patch.insert("type".to_string(), serde_json::to_value(kind)?);
        }
        if let Some(payload) = &changes.value {
            let encrypted = encode_payload(&self.codec, payload)?;
            patch.insert("value".to_string(), Value::String(encrypted));
        }
        if let Some(confidence) = changes.confidence {
            patch.insert("confidence".to_string(), serde_json::to_value(confidence)?);
        }
        if let Some(verified) = changes.verified {
            patch.insert("verified".to_string(), Value::Bool(verified));
        }
        patch.insert("lastValidation".to_string(), serde_json::to_value(Utc::now())?);

        self.store.merge(INDICATORS, &id, Value::Object(patch)).await
    }

    /// Re-runs the read pipeline on one record and re-encrypts the result.
    ///
    /// The operator-facing counterpart of the background repair: on success
    /// the record is persisted as `valid`; on failure it is persisted as
    /// `corrupted` and the error propagates so the caller gets a definitive
    /// outcome.
    pub async fn repair(&self, id: DocumentId) -> CoreResult<()> {
        repair_indicator(self.store.as_ref(), &self.codec, id).await
    }

    /// Stops the repair worker and waits for in-flight jobs to finish.
    pub async fn shutdown(self) {
        self.repair_queue.shutdown().await;
    }
}

/// Runs the read pipeline on a stored value.
///
/// Values carrying the ciphertext header are decrypted; anything else is
/// treated as legacy plaintext. The result is sanitized and parsed as a
/// string-or-object payload. Returns both the sanitized JSON text (what a
/// repair re-encrypts) and the parsed payload.
fn decode_stored_value(
    codec: &EncryptionCodec,
    stored: &str,
) -> CoreResult<(String, IndicatorPayload)> {
    let plaintext = if codec.is_ciphertext(stored) {
        codec.decrypt(stored)?
    } else {
        stored.to_string()
    };

    let sanitized = sanitize(&plaintext);
    let payload: IndicatorPayload = serde_json::from_str(&sanitized).map_err(|err| {
        CoreError::validation(format!("payload is not a JSON string or object: {err}"))
    })?;
    Ok((sanitized, payload))
}

/// Serializes and encrypts a payload for persistence.
fn encode_payload(codec: &EncryptionCodec, payload: &IndicatorPayload) -> CoreResult<String> {
    let serialized = serde_json::to_string(payload)?;
    codec.encrypt(&serialized)
}

/// Shared repair routine used by both the explicit entrypoint and the
/// background worker: decode the stored value, re-encrypt the sanitized
/// form, and persist `status = valid`. Any failure persists
/// `status = corrupted` (except when the record does not exist at all) and
/// is returned to the caller.
pub(crate) async fn repair_indicator(
    store: &dyn DocumentStore,
    codec: &EncryptionCodec,
    id: DocumentId,
) -> CoreResult<()> {
    let outcome = try_repair(store, codec, id).await;

    if let Err(err) = &outcome {
        if !matches!(err, CoreError::NotFound { .. }) {
            let patch = json!({
                "status": IndicatorStatus::Corrupted,
                "lastValidation": Utc::now(),
            });
            if let Err(mark_err) = store.merge(INDICATORS, &id, patch).await {
                warn!(id = %id, error = %mark_err, "failed to mark indicator as corrupted");
            }
        }
    }

    outcome
}

async fn try_repair(
    store: &dyn DocumentStore,
    codec: &EncryptionCodec,
    id: DocumentId,
) -> CoreResult<()> {
    let document = store
        .get(INDICATORS, &id)
        .await?
        .ok_or_else(|| CoreError::not_found("indicator", id.to_string()))?;
    let stored = document
        .get("value")
        .and_then(Value::as_str)
        .ok_or_else(|| CoreError::validation(format!("indicator `{id}` has no value")))?;

    let (sanitized, _) = decode_stored_value(codec, stored)?;
    let encrypted = codec.encrypt(&sanitized)?;

    store
        .merge(
            INDICATORS,
            &id,
            json!({
                "value": encrypted,
                "status": IndicatorStatus::Valid,
                "lastValidation": Utc::now(),
            }),
        )
        .await
}
