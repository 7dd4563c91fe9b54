// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire calls against the auth endpoints.
//!
//! These bypass the request pipeline: they carry no bearer token and must
//! never trigger the refresh-and-retry path themselves.

use serde::Deserialize;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::transport::exchange::{HttpExchange, WireRequest};
use crate::transport::pipeline::{body_message, classify_status};

/// Token grant returned by the login and refresh endpoints.
///
/// The refresh endpoint may omit `refreshToken` when it rotates only the
/// access token.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenGrant {
    pub token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_in: u64,
}

/// Exchange a username and password for a token grant.
pub async fn login(
    exchange: &dyn HttpExchange,
    config: &ClientConfig,
    username: &str,
    password: &str,
) -> Result<TokenGrant, ApiError> {
    let request = WireRequest {
        method: reqwest::Method::POST,
        url: format!("{}{}", config.base_url, config.login_path),
        bearer_token: None,
        idempotency_key: None,
        body: Some(serde_json::json!({ "username": username, "password": password })),
        timeout: config.request_timeout(),
    };
    let resp = exchange.perform(&request).await?;

    if (200..300).contains(&resp.status) {
        return parse_grant(resp.status, resp.body);
    }
    if resp.status == 401 || resp.status == 403 {
        return Err(ApiError::AuthInvalid {
            reason: body_message(&resp.body)
                .unwrap_or_else(|| "invalid username or password".to_owned()),
        });
    }
    Err(classify_status(resp.status, &resp.body))
}

/// Exchange a refresh token for a new access token.
pub async fn exchange_refresh_token(
    exchange: &dyn HttpExchange,
    config: &ClientConfig,
    refresh_token: &str,
) -> Result<TokenGrant, ApiError> {
    let request = WireRequest {
        method: reqwest::Method::POST,
        url: format!("{}{}", config.base_url, config.refresh_path),
        bearer_token: None,
        idempotency_key: None,
        body: Some(serde_json::json!({ "refreshToken": refresh_token })),
        timeout: config.request_timeout(),
    };
    let resp = exchange.perform(&request).await?;

    if (200..300).contains(&resp.status) {
        return parse_grant(resp.status, resp.body);
    }
    if resp.status == 401 || resp.status == 403 {
        return Err(ApiError::AuthInvalid {
            reason: body_message(&resp.body).unwrap_or_else(|| "refresh token rejected".to_owned()),
        });
    }
    Err(classify_status(resp.status, &resp.body))
}

fn parse_grant(status: u16, body: serde_json::Value) -> Result<TokenGrant, ApiError> {
    serde_json::from_value(body).map_err(|e| ApiError::ServerFault {
        status,
        message: format!("malformed token grant: {e}"),
    })
}

#[cfg(test)]
#[path = "refresh_tests.rs"]
mod tests;
