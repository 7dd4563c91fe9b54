// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: scripted network boundary and client builder.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::api::ApiClient;
use crate::config::ClientConfig;
use crate::connectivity::ConnectivityMonitor;
use crate::error::ApiError;
use crate::session::{epoch_secs, Credential};
use crate::storage::{MemoryStorage, Storage, CREDENTIAL_KEY};
use crate::transport::exchange::{HttpExchange, WireRequest, WireResponse};

/// Scripted [`HttpExchange`]: pops one canned reply per call and records
/// every request it sees, in order.
pub struct ScriptedExchange {
    replies: Mutex<VecDeque<Result<WireResponse, ApiError>>>,
    requests: Mutex<Vec<WireRequest>>,
}

impl ScriptedExchange {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { replies: Mutex::new(VecDeque::new()), requests: Mutex::new(Vec::new()) })
    }

    /// Queue a JSON reply.
    pub fn push_json(&self, status: u16, body: serde_json::Value) {
        self.replies.lock().push_back(Ok(WireResponse { status, body }));
    }

    /// Queue a token grant reply with a long-lived access token.
    pub fn push_grant(&self, access_token: &str, refresh_token: &str) {
        self.push_json(
            200,
            serde_json::json!({
                "token": access_token,
                "refreshToken": refresh_token,
                "expiresIn": 3600,
            }),
        );
    }

    /// Queue a transport failure.
    pub fn push_error(&self, err: ApiError) {
        self.replies.lock().push_back(Err(err));
    }

    /// Every request performed so far, in order.
    pub fn requests(&self) -> Vec<WireRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// How many recorded requests hit a URL ending in `suffix`.
    pub fn hits(&self, suffix: &str) -> usize {
        self.requests.lock().iter().filter(|r| r.url.ends_with(suffix)).count()
    }
}

#[async_trait]
impl HttpExchange for ScriptedExchange {
    async fn perform(&self, request: &WireRequest) -> Result<WireResponse, ApiError> {
        self.requests.lock().push(request.clone());
        // One yield so concurrent callers can pile up behind an in-flight
        // exchange the way they would on a real network.
        tokio::task::yield_now().await;
        self.replies.lock().pop_front().unwrap_or_else(|| {
            Err(ApiError::NetworkUnavailable { reason: "script exhausted".to_owned() })
        })
    }
}

/// Fully wired client over memory storage and a scripted exchange.
pub struct TestHarness {
    pub client: ApiClient,
    pub exchange: Arc<ScriptedExchange>,
    pub storage: Arc<MemoryStorage>,
    pub connectivity: Arc<ConnectivityMonitor>,
}

/// Builder for a [`TestHarness`] with sensible defaults: online, no stored
/// credential, base URL `http://backend.test`.
pub struct ClientBuilder {
    config: ClientConfig,
    online: bool,
    credential: Option<Credential>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self { config: ClientConfig::new("http://backend.test"), online: true, credential: None }
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn offline(mut self) -> Self {
        self.online = false;
        self
    }

    /// Seed a stored credential. Negative `expires_in_secs` yields an
    /// already-expired token.
    pub fn credential(
        mut self,
        access_token: &str,
        expires_in_secs: i64,
        refresh_token: &str,
    ) -> Self {
        self.credential = Some(Credential {
            access_token: access_token.to_owned(),
            expires_at: epoch_secs().saturating_add_signed(expires_in_secs),
            refresh_token: refresh_token.to_owned(),
        });
        self
    }

    pub fn build(self) -> TestHarness {
        let storage = Arc::new(MemoryStorage::new());
        if let Some(credential) = &self.credential {
            if let Ok(json) = serde_json::to_string(credential) {
                let _ = storage.save(CREDENTIAL_KEY, &json);
            }
        }
        let exchange = ScriptedExchange::new();
        let connectivity = Arc::new(ConnectivityMonitor::new(self.online));
        let client = ApiClient::with_parts(
            self.config,
            Arc::clone(&storage) as Arc<dyn Storage>,
            Arc::clone(&exchange) as Arc<dyn HttpExchange>,
            Arc::clone(&connectivity),
        );
        TestHarness { client, exchange, storage, connectivity }
    }
}
