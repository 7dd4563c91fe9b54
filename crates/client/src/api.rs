// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The facade consumed by UI code.
//!
//! Wires the token store, refresh coordinator, request pipeline, offline
//! queue, and sync orchestrator together over one storage backend and one
//! wire boundary, and exposes the business surface on top.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::connectivity::ConnectivityMonitor;
use crate::error::{ApiError, ClientError};
use crate::session::coordinator::RefreshCoordinator;
use crate::session::refresh;
use crate::session::store::TokenStore;
use crate::session::SessionEvent;
use crate::storage::{FileStorage, Storage};
use crate::sync::operations;
use crate::sync::orchestrator::SyncOrchestrator;
use crate::sync::queue::{OperationQueue, QueuedOperation};
use crate::sync::snapshot::{Snapshot, SnapshotStore};
use crate::sync::{FullSyncReport, SyncReport};
use crate::transport::exchange::{HttpExchange, ReqwestExchange};
use crate::transport::pipeline::{ApiRequest, RequestPipeline};

/// Result of an offline-safe mutation.
#[derive(Debug, Clone)]
pub enum MutationOutcome {
    /// The backend applied the change; carries the response body.
    Applied(serde_json::Value),
    /// Connectivity was down; the change is queued for replay.
    Queued { operation_id: String },
}

/// The resilient data-access client.
pub struct ApiClient {
    config: ClientConfig,
    exchange: Arc<dyn HttpExchange>,
    store: Arc<TokenStore>,
    coordinator: Arc<RefreshCoordinator>,
    pipeline: Arc<RequestPipeline>,
    connectivity: Arc<ConnectivityMonitor>,
    queue: Arc<OperationQueue>,
    orchestrator: Arc<SyncOrchestrator>,
    event_tx: broadcast::Sender<SessionEvent>,
}

impl ApiClient {
    /// Build a client over file-backed storage in the configured state
    /// directory, a real HTTP exchange, and an initially-online monitor.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let storage: Arc<dyn Storage> = Arc::new(FileStorage::create(config.state_dir())?);
        Ok(Self::with_parts(
            config,
            storage,
            Arc::new(ReqwestExchange::new()),
            Arc::new(ConnectivityMonitor::new(true)),
        ))
    }

    /// Build a client from explicit parts. Tests and embedders inject memory
    /// storage, a scripted exchange, or a shared monitor here.
    pub fn with_parts(
        config: ClientConfig,
        storage: Arc<dyn Storage>,
        exchange: Arc<dyn HttpExchange>,
        connectivity: Arc<ConnectivityMonitor>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(16);
        let store = Arc::new(TokenStore::open(Arc::clone(&storage)));
        let coordinator = Arc::new(RefreshCoordinator::new(
            Arc::clone(&exchange),
            Arc::clone(&store),
            config.clone(),
            event_tx.clone(),
        ));
        let pipeline = Arc::new(RequestPipeline::new(
            Arc::clone(&exchange),
            Arc::clone(&store),
            Arc::clone(&coordinator),
            config.clone(),
        ));
        let queue = Arc::new(OperationQueue::open(Arc::clone(&storage)));
        let orchestrator = Arc::new(SyncOrchestrator::new(
            Arc::clone(&pipeline),
            Arc::clone(&queue),
            SnapshotStore::new(storage),
            Arc::clone(&connectivity),
        ));
        Self {
            config,
            exchange,
            store,
            coordinator,
            pipeline,
            connectivity,
            queue,
            orchestrator,
            event_tx,
        }
    }

    // --- session ---

    /// Log in and store the granted credential.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), ClientError> {
        let grant =
            refresh::login(self.exchange.as_ref(), &self.config, username, password).await?;
        if let Err(e) = self.store.set_credential(
            &grant.token,
            grant.expires_in,
            grant.refresh_token.as_deref(),
        ) {
            tracing::warn!(err = %e, "failed to persist credential after login");
        }
        let _ = self.event_tx.send(SessionEvent::Refreshed);
        tracing::info!(username, "logged in");
        Ok(())
    }

    /// End the session and drop the stored credential.
    pub fn logout(&self) -> Result<(), ClientError> {
        self.coordinator.end_session("logout")?;
        Ok(())
    }

    /// Subscribe to session lifecycle events.
    pub fn session_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    // --- connectivity ---

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    /// Feed a platform connectivity signal into the monitor.
    pub fn set_online(&self, online: bool) {
        self.connectivity.set_online(online);
    }

    // --- reads ---

    pub async fn fetch_regions(&self) -> Result<serde_json::Value, ClientError> {
        let resp = self.pipeline.send(&ApiRequest::get("/regions")).await?;
        Ok(resp.body)
    }

    /// Farmers, optionally limited to one region.
    pub async fn fetch_farmers(
        &self,
        region: Option<&str>,
    ) -> Result<serde_json::Value, ClientError> {
        let path = match region {
            Some(region) => format!("/farmers?region={region}"),
            None => "/farmers".to_owned(),
        };
        let resp = self.pipeline.send(&ApiRequest::get(path)).await?;
        Ok(resp.body)
    }

    pub async fn fetch_alerts(&self) -> Result<serde_json::Value, ClientError> {
        let resp = self.pipeline.send(&ApiRequest::get("/alerts")).await?;
        Ok(resp.body)
    }

    // --- offline-safe mutations ---

    /// Update a farmer record, queueing the change when offline.
    pub async fn update_farmer(
        &self,
        farmer_id: &str,
        fields: serde_json::Value,
    ) -> Result<MutationOutcome, ClientError> {
        self.send_or_queue(operations::UPDATE_FARMER, with_id(fields, farmer_id)).await
    }

    /// Record a new delivery, queueing it when offline.
    pub async fn create_delivery(
        &self,
        delivery: serde_json::Value,
    ) -> Result<MutationOutcome, ClientError> {
        self.send_or_queue(operations::CREATE_DELIVERY, delivery).await
    }

    /// Update a contract, queueing the change when offline.
    pub async fn update_contract(
        &self,
        contract_id: &str,
        fields: serde_json::Value,
    ) -> Result<MutationOutcome, ClientError> {
        self.send_or_queue(operations::UPDATE_CONTRACT, with_id(fields, contract_id)).await
    }

    /// Acknowledge an alert, queueing the acknowledgement when offline.
    pub async fn acknowledge_alert(
        &self,
        alert_id: &str,
    ) -> Result<MutationOutcome, ClientError> {
        self.send_or_queue(operations::ACKNOWLEDGE_ALERT, serde_json::json!({ "id": alert_id }))
            .await
    }

    // --- sync ---

    pub async fn sync_up(&self) -> Result<SyncReport, ClientError> {
        self.orchestrator.sync_up().await
    }

    pub async fn sync_down(&self, region_filter: Option<&str>) -> Result<Snapshot, ClientError> {
        self.orchestrator.sync_down(region_filter).await
    }

    pub async fn run_full_sync(&self) -> Result<FullSyncReport, ClientError> {
        self.orchestrator.run_full_sync().await
    }

    /// Start the background task that runs a full sync on every reconnect.
    pub fn spawn_auto_sync(&self, shutdown: CancellationToken) -> tokio::task::JoinHandle<()> {
        self.orchestrator.spawn_auto_sync(shutdown)
    }

    /// The cached snapshot, if one has been downloaded.
    pub fn cached_snapshot(&self) -> Result<Option<Snapshot>, ClientError> {
        self.orchestrator.cached_snapshot()
    }

    /// Number of mutations awaiting replay.
    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    /// Read-only copy of the mutations awaiting replay, in replay order.
    pub fn pending_operations(&self) -> Vec<QueuedOperation> {
        self.queue.peek_all()
    }

    /// Deliver the mutation now, or record it for replay when the network is
    /// unavailable. A timeout is not queued; like a server fault it means the
    /// backend may already have applied the change.
    async fn send_or_queue(
        &self,
        kind: &str,
        payload: serde_json::Value,
    ) -> Result<MutationOutcome, ClientError> {
        if !self.connectivity.is_online() {
            let operation_id = self.queue.enqueue(kind, payload)?;
            return Ok(MutationOutcome::Queued { operation_id });
        }
        let request = operations::request_for(kind, &payload)?;
        match self.pipeline.send(&request).await {
            Ok(resp) => Ok(MutationOutcome::Applied(resp.body)),
            Err(ApiError::NetworkUnavailable { reason }) => {
                tracing::info!(kind, reason = %reason, "network down, queueing mutation");
                let operation_id = self.queue.enqueue(kind, payload)?;
                Ok(MutationOutcome::Queued { operation_id })
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Embed the record id in the payload so a queued copy replays standalone.
fn with_id(mut payload: serde_json::Value, id: &str) -> serde_json::Value {
    if let Some(object) = payload.as_object_mut() {
        object.insert("id".to_owned(), serde_json::Value::String(id.to_owned()));
    }
    payload
}

#[cfg(test)]
#[path = "api_tests.rs"]
mod tests;
