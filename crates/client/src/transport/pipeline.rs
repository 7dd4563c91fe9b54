// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authenticated request pipeline.
//!
//! Every business call goes through [`RequestPipeline::send`]: it attaches
//! the bearer token, renews an expiring session first, classifies non-2xx
//! responses, and retries exactly once after a 401.

use std::sync::Arc;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::session::coordinator::RefreshCoordinator;
use crate::session::store::TokenStore;
use crate::transport::exchange::{HttpExchange, WireRequest, WireResponse};

/// An outbound business request: method, path relative to the base URL, and
/// an optional JSON body.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: reqwest::Method,
    path: String,
    body: Option<serde_json::Value>,
    idempotency_key: Option<String>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self { method: reqwest::Method::GET, path: path.into(), body: None, idempotency_key: None }
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: reqwest::Method::POST,
            path: path.into(),
            body: Some(body),
            idempotency_key: None,
        }
    }

    pub fn put(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: reqwest::Method::PUT,
            path: path.into(),
            body: Some(body),
            idempotency_key: None,
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: reqwest::Method::DELETE,
            path: path.into(),
            body: None,
            idempotency_key: None,
        }
    }

    /// Tag the request so the backend can drop a duplicate submission.
    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    pub fn method(&self) -> &reqwest::Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }
}

/// Successful (2xx) response: status plus decoded JSON body.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

/// The single chokepoint for authenticated outbound calls.
pub struct RequestPipeline {
    exchange: Arc<dyn HttpExchange>,
    store: Arc<TokenStore>,
    coordinator: Arc<RefreshCoordinator>,
    config: ClientConfig,
}

impl RequestPipeline {
    pub fn new(
        exchange: Arc<dyn HttpExchange>,
        store: Arc<TokenStore>,
        coordinator: Arc<RefreshCoordinator>,
        config: ClientConfig,
    ) -> Self {
        Self { exchange, store, coordinator, config }
    }

    /// Send an authenticated request.
    ///
    /// A 401 on the first attempt forces one shared refresh and resubmits the
    /// request; a 401 on the resubmission surfaces as [`ApiError::AuthInvalid`]
    /// rather than looping.
    pub async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        if self.store.is_expiring_soon(self.config.refresh_margin()) {
            self.coordinator.ensure_fresh().await?;
        }

        let mut attempt: u8 = 0;
        loop {
            let wire = self.wire_request(request);
            let resp = self.exchange.perform(&wire).await?;
            if (200..300).contains(&resp.status) {
                return Ok(ApiResponse { status: resp.status, body: resp.body });
            }

            match classify_status(resp.status, &resp.body) {
                ApiError::AuthExpired if attempt == 0 => {
                    attempt = 1;
                    tracing::debug!(path = %request.path, "401, refreshing and retrying once");
                    self.coordinator.force_refresh().await?;
                }
                ApiError::AuthExpired => {
                    return Err(ApiError::AuthInvalid {
                        reason: rejection_reason(&resp, "unauthorized after token refresh"),
                    });
                }
                err => return Err(err),
            }
        }
    }

    fn wire_request(&self, request: &ApiRequest) -> WireRequest {
        WireRequest {
            method: request.method.clone(),
            url: format!("{}{}", self.config.base_url, request.path),
            bearer_token: self.store.access_token(),
            idempotency_key: request.idempotency_key.clone(),
            body: request.body.clone(),
            timeout: self.config.request_timeout(),
        }
    }
}

/// Map a non-2xx status and response body onto the error taxonomy.
pub(crate) fn classify_status(status: u16, body: &serde_json::Value) -> ApiError {
    match status {
        401 => ApiError::AuthExpired,
        403 => ApiError::PermissionDenied {
            message: body_message(body).unwrap_or_else(|| "permission denied".to_owned()),
        },
        404 => ApiError::NotFound {
            message: body_message(body).unwrap_or_else(|| "not found".to_owned()),
        },
        400 | 422 => ApiError::Validation {
            message: body_message(body).unwrap_or_else(|| "validation failed".to_owned()),
            fields: body.get("fields").filter(|v| !v.is_null()).cloned(),
        },
        _ => ApiError::ServerFault {
            status,
            message: body_message(body).unwrap_or_else(|| "server fault".to_owned()),
        },
    }
}

/// `message` field of an error response body, when the backend sent one.
pub(crate) fn body_message(body: &serde_json::Value) -> Option<String> {
    body.get("message").and_then(|v| v.as_str()).map(str::to_owned)
}

fn rejection_reason(resp: &WireResponse, fallback: &str) -> String {
    body_message(&resp.body).unwrap_or_else(|| fallback.to_owned())
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
