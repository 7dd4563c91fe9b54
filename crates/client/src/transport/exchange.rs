// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire boundary for outbound HTTP.
//!
//! Everything that leaves the process goes through [`HttpExchange`], so tests
//! can script responses without a listening server.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ApiError;

/// One outbound HTTP request, fully described before it touches the network.
#[derive(Debug, Clone)]
pub struct WireRequest {
    pub method: reqwest::Method,
    pub url: String,
    pub bearer_token: Option<String>,
    pub idempotency_key: Option<String>,
    pub body: Option<serde_json::Value>,
    pub timeout: Duration,
}

/// Status and decoded JSON body of a completed exchange. An empty or
/// non-JSON body decodes to `Value::Null`.
#[derive(Debug, Clone)]
pub struct WireResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

/// Performs a single HTTP exchange.
///
/// `Err` is reserved for transport failures (unreachable host, timed-out
/// request); a response with any HTTP status is `Ok`.
#[async_trait]
pub trait HttpExchange: Send + Sync {
    async fn perform(&self, request: &WireRequest) -> Result<WireResponse, ApiError>;
}

/// [`HttpExchange`] over a shared `reqwest` client.
pub struct ReqwestExchange {
    client: reqwest::Client,
}

impl ReqwestExchange {
    pub fn new() -> Self {
        let client = reqwest::Client::builder().build().unwrap_or_default();
        Self { client }
    }
}

#[async_trait]
impl HttpExchange for ReqwestExchange {
    async fn perform(&self, request: &WireRequest) -> Result<WireResponse, ApiError> {
        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .timeout(request.timeout);
        if let Some(token) = &request.bearer_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(key) = &request.idempotency_key {
            builder = builder.header("Idempotency-Key", key);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let resp = builder.send().await.map_err(|e| transport_error(e, request.timeout))?;
        let status = resp.status().as_u16();
        let bytes = resp.bytes().await.map_err(|e| transport_error(e, request.timeout))?;
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };
        Ok(WireResponse { status, body })
    }
}

fn transport_error(err: reqwest::Error, timeout: Duration) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout { seconds: timeout.as_secs() }
    } else {
        ApiError::NetworkUnavailable { reason: err.to_string() }
    }
}
