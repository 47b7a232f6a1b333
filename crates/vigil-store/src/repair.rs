//! Bounded background repair of corrupted indicator records.

use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, warn};

use vigil_core::{DocumentId, RepairConfig};

use crate::crypto::EncryptionCodec;
use crate::document::DocumentStore;
use crate::indicators;

/// Queue of fire-and-forget repair jobs with bounded depth and concurrency.
///
/// Listing a corrupted record enqueues here without waiting; a dispatcher
/// task feeds jobs through a semaphore so at most `max_concurrency` repairs
/// run at once. Outcomes are only logged — nothing is reported back to the
/// listing caller, and a failed job is not retried until the corruption is
/// seen again.
pub struct RepairQueue {
    tx: mpsc::Sender<DocumentId>,
    dispatcher: JoinHandle<()>,
}

impl RepairQueue {
    /// Starts the dispatcher task and returns a handle for enqueueing.
    pub fn spawn(
        store: Arc<dyn DocumentStore>,
        codec: Arc<EncryptionCodec>,
        config: RepairConfig,
    ) -> Self {
        let (tx, mut rx) = mpsc::channel(config.queue_depth);
        let semaphore = Arc::new(Semaphore::new(config.max_concurrency));

        let dispatcher = tokio::spawn(async move {
            let mut tasks: JoinSet<()> = JoinSet::new();
            while let Some(id) = rx.recv().await {
                // Reap finished repairs so the set does not grow unbounded.
                while tasks.try_join_next().is_some() {}

                let permit = semaphore.clone().acquire_owned().await.unwrap();
                let store = Arc::clone(&store);
                let codec = Arc::clone(&codec);
                tasks.spawn(async move {
                    match indicators::repair_indicator(store.as_ref(), &codec, id).await {
                        Ok(()) => debug!(id = %id, "repaired corrupted indicator"),
                        Err(err) => warn!(id = %id, error = %err, "automatic repair failed"),
                    }
                    drop(permit);
                });
            }
            while tasks.join_next().await.is_some() {}
        });

        Self { tx, dispatcher }
    }

    /// Enqueues one repair attempt for `id` without waiting.
    ///
    /// When the queue is full the job is dropped with a warning; the next
    /// listing that still sees the corruption will enqueue it again.
    pub fn enqueue(&self, id: DocumentId) {
        match self.tx.try_send(id) {
            Ok(()) => {}
            Err(TrySendError::Full(id)) => {
                warn!(id = %id, "repair queue full, dropping job");
            }
            Err(TrySendError::Closed(id)) => {
                warn!(id = %id, "repair queue shut down, dropping job");
            }
        }
    }

    /// Stops accepting jobs and waits for in-flight repairs to finish.
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(err) = self.dispatcher.await {
            warn!(error = %err, "repair dispatcher terminated abnormally");
        }
    }
}
