// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sync orchestrator: replays the offline queue and refreshes read caches.

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::connectivity::ConnectivityMonitor;
use crate::error::{ApiError, ClientError};
use crate::sync::operations;
use crate::sync::queue::{OperationQueue, QueuedOperation};
use crate::sync::snapshot::{Snapshot, SnapshotStore};
use crate::sync::{FullSyncReport, SyncFailure, SyncReport};
use crate::transport::pipeline::{ApiRequest, RequestPipeline};

pub struct SyncOrchestrator {
    pipeline: Arc<RequestPipeline>,
    queue: Arc<OperationQueue>,
    snapshots: SnapshotStore,
    connectivity: Arc<ConnectivityMonitor>,
}

impl SyncOrchestrator {
    pub fn new(
        pipeline: Arc<RequestPipeline>,
        queue: Arc<OperationQueue>,
        snapshots: SnapshotStore,
        connectivity: Arc<ConnectivityMonitor>,
    ) -> Self {
        Self { pipeline, queue, snapshots, connectivity }
    }

    /// Replay every queued operation in enqueue order.
    ///
    /// One failed operation does not abort the batch: it is requeued at the
    /// tail, recorded in the report, and the drain moves on.
    pub async fn sync_up(&self) -> Result<SyncReport, ClientError> {
        let drained = self.queue.drain_all()?;
        let mut report = SyncReport::default();
        for operation in drained {
            match self.replay(&operation).await {
                Ok(()) => report.processed_count += 1,
                Err(e) => {
                    tracing::warn!(
                        id = %operation.id,
                        kind = %operation.kind,
                        err = %e,
                        "replay failed, requeueing"
                    );
                    report.failed_count += 1;
                    report.errors.push(SyncFailure {
                        operation_id: operation.id.clone(),
                        message: e.to_string(),
                    });
                    if let Err(persist_err) = self.queue.requeue(operation) {
                        tracing::warn!(err = %persist_err, "failed to persist requeued operation");
                    }
                }
            }
        }
        if report.processed_count > 0 || report.failed_count > 0 {
            tracing::info!(
                processed = report.processed_count,
                failed = report.failed_count,
                "offline queue drained"
            );
        }
        Ok(report)
    }

    /// Download fresh reference data, replacing the cached snapshot and its
    /// timestamp only on success.
    pub async fn sync_down(&self, region_filter: Option<&str>) -> Result<Snapshot, ClientError> {
        let path = match region_filter {
            Some(region) => format!("/sync/snapshot?region={region}"),
            None => "/sync/snapshot".to_owned(),
        };
        let resp = self.pipeline.send(&ApiRequest::get(path)).await?;
        let snapshot = Snapshot { data: resp.body, last_sync: Utc::now() };
        self.snapshots.save(&snapshot.data, snapshot.last_sync)?;
        tracing::info!("snapshot refreshed");
        Ok(snapshot)
    }

    /// The cached snapshot, if one has been downloaded.
    pub fn cached_snapshot(&self) -> Result<Option<Snapshot>, ClientError> {
        Ok(self.snapshots.load()?)
    }

    /// Replay queued work, then refresh read caches.
    ///
    /// Fails fast with [`ClientError::Offline`] when the monitor reports no
    /// connectivity. The snapshot download starts only after the upload pass
    /// has finished, and only when it actually processed something.
    pub async fn run_full_sync(&self) -> Result<FullSyncReport, ClientError> {
        if !self.connectivity.is_online() {
            return Err(ClientError::Offline);
        }
        let up = self.sync_up().await?;
        let snapshot =
            if up.processed_count > 0 { Some(self.sync_down(None).await?) } else { None };
        Ok(FullSyncReport { up, snapshot })
    }

    /// Run a full sync on every offline→online transition until `shutdown`
    /// fires.
    pub fn spawn_auto_sync(
        self: &Arc<Self>,
        shutdown: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let orchestrator = Arc::clone(self);
        // Subscribe and read the baseline before spawning so a transition
        // right after this call cannot slip past the task.
        let mut rx = self.connectivity.subscribe();
        let mut was_online = *rx.borrow_and_update();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => return,
                    changed = rx.changed() => {
                        if changed.is_err() {
                            return;
                        }
                    }
                }
                let online = *rx.borrow_and_update();
                if online && !was_online {
                    tracing::info!("connectivity restored, starting full sync");
                    if let Err(e) = orchestrator.run_full_sync().await {
                        tracing::warn!(err = %e, "automatic sync failed");
                    }
                }
                was_online = online;
            }
        })
    }

    async fn replay(&self, operation: &QueuedOperation) -> Result<(), ApiError> {
        let request = operations::request_for(&operation.kind, &operation.payload)?
            .with_idempotency_key(&operation.id);
        self.pipeline.send(&request).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
