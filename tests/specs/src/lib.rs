// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test harness for end-to-end client specs.
//!
//! Runs a mock coop backend (axum) on a loopback port and exercises the
//! real client against it over HTTP, with credential and queue state on
//! disk.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Once};

use axum::extract::{Path as UrlPath, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use fieldsync::api::ApiClient;
use fieldsync::config::ClientConfig;

static INIT: Once = Once::new();

/// Install the rustls crypto provider (needed for reqwest even on plain
/// HTTP) and a quiet tracing subscriber.
pub fn ensure_harness() {
    INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .try_init();
    });
}

/// Shared state behind the mock backend.
pub struct BackendState {
    /// Monotonic counter feeding issued token names.
    issued: AtomicU64,
    /// The access token the backend currently accepts.
    live_access: parking_lot::Mutex<Option<String>>,
    /// The refresh token the backend currently accepts.
    live_refresh: parking_lot::Mutex<Option<String>>,
    /// When set, the refresh endpoint rejects everything.
    refresh_revoked: AtomicBool,
    /// Lifetime in seconds granted with each issued token.
    grant_secs: AtomicU64,
    /// Per-route hit counters, keyed by the path without query.
    hits: parking_lot::Mutex<HashMap<String, usize>>,
    /// Mutation bodies in arrival order, keyed by route.
    received: parking_lot::Mutex<Vec<(String, Value)>>,
}

impl BackendState {
    fn new() -> Self {
        Self {
            issued: AtomicU64::new(0),
            live_access: parking_lot::Mutex::new(None),
            live_refresh: parking_lot::Mutex::new(None),
            refresh_revoked: AtomicBool::new(false),
            grant_secs: AtomicU64::new(3600),
            hits: parking_lot::Mutex::new(HashMap::new()),
            received: parking_lot::Mutex::new(Vec::new()),
        }
    }

    fn issue(&self) -> (String, String) {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let access = format!("access-{n}");
        let refresh = format!("refresh-{n}");
        *self.live_access.lock() = Some(access.clone());
        *self.live_refresh.lock() = Some(refresh.clone());
        (access, refresh)
    }

    fn count(&self, route: &str) {
        *self.hits.lock().entry(route.to_owned()).or_insert(0) += 1;
    }

    fn record(&self, route: &str, body: Value) {
        self.received.lock().push((route.to_owned(), body));
    }

    fn bearer_ok(&self, headers: &HeaderMap) -> bool {
        let Some(live) = self.live_access.lock().clone() else {
            return false;
        };
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == format!("Bearer {live}"))
    }
}

fn unauthorized(message: &str) -> (StatusCode, Json<Value>) {
    (StatusCode::UNAUTHORIZED, Json(json!({ "message": message })))
}

// -- Handlers -----------------------------------------------------------------

/// `POST /auth/login`
async fn login(
    State(s): State<Arc<BackendState>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    s.count("/auth/login");
    if body["password"] != "haymaker" {
        return unauthorized("invalid credentials");
    }
    let (access, refresh) = s.issue();
    let grant = s.grant_secs.load(Ordering::SeqCst);
    (
        StatusCode::OK,
        Json(json!({ "token": access, "refreshToken": refresh, "expiresIn": grant })),
    )
}

/// `POST /auth/refresh-token`
async fn refresh(
    State(s): State<Arc<BackendState>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    s.count("/auth/refresh-token");
    if s.refresh_revoked.load(Ordering::SeqCst) {
        return unauthorized("refresh token revoked");
    }
    let presented = body["refreshToken"].as_str().unwrap_or_default().to_owned();
    let live = s.live_refresh.lock().clone();
    if live.as_deref() != Some(presented.as_str()) {
        return unauthorized("unknown refresh token");
    }
    let n = s.issued.fetch_add(1, Ordering::SeqCst) + 1;
    let access = format!("access-{n}");
    *s.live_access.lock() = Some(access.clone());
    let grant = s.grant_secs.load(Ordering::SeqCst);
    (StatusCode::OK, Json(json!({ "token": access, "expiresIn": grant })))
}

/// `GET /regions`
async fn regions(
    State(s): State<Arc<BackendState>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    s.count("/regions");
    if !s.bearer_ok(&headers) {
        return unauthorized("token expired");
    }
    (StatusCode::OK, Json(json!({ "regions": ["north", "south"] })))
}

/// `GET /farmers`
async fn farmers(
    State(s): State<Arc<BackendState>>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    s.count("/farmers");
    if !s.bearer_ok(&headers) {
        return unauthorized("token expired");
    }
    let all = [json!({ "id": "f1", "region": "north" }), json!({ "id": "f2", "region": "south" })];
    let listed: Vec<Value> = match params.get("region") {
        Some(region) => all.iter().filter(|f| f["region"] == region.as_str()).cloned().collect(),
        None => all.to_vec(),
    };
    (StatusCode::OK, Json(json!({ "farmers": listed })))
}

/// `GET /alerts`
async fn alerts(
    State(s): State<Arc<BackendState>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    s.count("/alerts");
    if !s.bearer_ok(&headers) {
        return unauthorized("token expired");
    }
    (StatusCode::OK, Json(json!({ "alerts": [] })))
}

/// `PUT /farmers/{id}`
async fn update_farmer(
    State(s): State<Arc<BackendState>>,
    UrlPath(id): UrlPath<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    s.count("/farmers/{id}");
    if !s.bearer_ok(&headers) {
        return unauthorized("token expired");
    }
    s.record("/farmers/{id}", body);
    (StatusCode::OK, Json(json!({ "updated": true, "id": id })))
}

/// `POST /deliveries`
async fn create_delivery(
    State(s): State<Arc<BackendState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    s.count("/deliveries");
    if !s.bearer_ok(&headers) {
        return unauthorized("token expired");
    }
    s.record("/deliveries", body);
    (StatusCode::OK, Json(json!({ "created": true })))
}

/// `PUT /contracts/{id}`
async fn update_contract(
    State(s): State<Arc<BackendState>>,
    UrlPath(id): UrlPath<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    s.count("/contracts/{id}");
    if !s.bearer_ok(&headers) {
        return unauthorized("token expired");
    }
    s.record("/contracts/{id}", body);
    (StatusCode::OK, Json(json!({ "updated": true, "id": id })))
}

/// `POST /alerts/{id}/acknowledge`
async fn acknowledge_alert(
    State(s): State<Arc<BackendState>>,
    UrlPath(id): UrlPath<String>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    s.count("/alerts/{id}/acknowledge");
    if !s.bearer_ok(&headers) {
        return unauthorized("token expired");
    }
    s.record("/alerts/{id}/acknowledge", json!({ "id": id }));
    (StatusCode::OK, Json(json!({ "acknowledged": true })))
}

/// `GET /sync/snapshot`
async fn snapshot(
    State(s): State<Arc<BackendState>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    s.count("/sync/snapshot");
    if !s.bearer_ok(&headers) {
        return unauthorized("token expired");
    }
    (
        StatusCode::OK,
        Json(json!({
            "farmers": [{ "id": "f1", "region": "north" }],
            "contracts": [{ "id": "c1", "farmerId": "f1" }],
            "alerts": [],
        })),
    )
}

/// Build the axum `Router` for the mock backend.
fn build_router(state: Arc<BackendState>) -> Router {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/refresh-token", post(refresh))
        .route("/regions", get(regions))
        .route("/farmers", get(farmers))
        .route("/farmers/{id}", put(update_farmer))
        .route("/deliveries", post(create_delivery))
        .route("/contracts/{id}", put(update_contract))
        .route("/alerts", get(alerts))
        .route("/alerts/{id}/acknowledge", post(acknowledge_alert))
        .route("/sync/snapshot", get(snapshot))
        .with_state(state)
}

// -- Harness ------------------------------------------------------------------

/// A mock backend on a loopback port, stopped on drop.
pub struct MockBackend {
    state: Arc<BackendState>,
    addr: SocketAddr,
    shutdown: CancellationToken,
}

impl MockBackend {
    pub async fn start() -> anyhow::Result<Self> {
        ensure_harness();
        let state = Arc::new(BackendState::new());
        let router = build_router(Arc::clone(&state));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let server_shutdown = shutdown.clone();
        tokio::spawn(async move {
            let _ = axum::serve(listener, router)
                .with_graceful_shutdown(server_shutdown.cancelled_owned())
                .await;
        });
        Ok(Self { state, addr, shutdown })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Hits recorded for a route, keyed by path without query.
    pub fn hits(&self, route: &str) -> usize {
        self.state.hits.lock().get(route).copied().unwrap_or(0)
    }

    /// Mutation bodies received so far, in arrival order.
    pub fn received(&self) -> Vec<(String, Value)> {
        self.state.received.lock().clone()
    }

    /// Invalidate the live access token so the next bearer request gets 401.
    pub fn expire_access(&self) {
        *self.state.live_access.lock() = None;
    }

    /// Make the refresh endpoint reject every grant from now on.
    pub fn revoke_refresh(&self) {
        self.state.refresh_revoked.store(true, Ordering::SeqCst);
    }

    /// Lifetime in seconds attached to tokens issued from now on.
    pub fn grant_seconds(&self, secs: u64) {
        self.state.grant_secs.store(secs, Ordering::SeqCst);
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Build a client whose durable state lives under `dir`, pointed at `backend`.
pub fn client_for(backend: &MockBackend, dir: &Path) -> anyhow::Result<ApiClient> {
    let mut config = ClientConfig::new(backend.base_url());
    config.state_dir = Some(dir.to_path_buf());
    Ok(ApiClient::new(config)?)
}
