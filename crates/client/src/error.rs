// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types shared across the data-access layer.

use thiserror::Error;

/// Classified failure of an outbound API call.
///
/// Cloneable so a single refresh outcome can fan out to every caller waiting
/// on it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// 401 on a business endpoint that has not been retried yet. Consumed
    /// internally by the refresh-and-retry path; callers never see it.
    #[error("access token expired")]
    AuthExpired,
    /// The session cannot be renewed: 401 after a retry, a rejected login or
    /// refresh call, or a refresh that failed outright.
    #[error("session invalid: {reason}")]
    AuthInvalid { reason: String },
    /// 403. Surfaced as-is, no retry.
    #[error("permission denied: {message}")]
    PermissionDenied { message: String },
    /// 404. Surfaced as-is.
    #[error("not found: {message}")]
    NotFound { message: String },
    /// 400 or 422, with per-field detail when the response body carries any.
    #[error("validation failed: {message}")]
    Validation { message: String, fields: Option<serde_json::Value> },
    /// 5xx or an unclassified status.
    #[error("server fault ({status}): {message}")]
    ServerFault { status: u16, message: String },
    /// The request produced no response at all.
    #[error("network unavailable: {reason}")]
    NetworkUnavailable { reason: String },
    /// The request deadline elapsed before a response arrived.
    #[error("request timed out after {seconds}s")]
    Timeout { seconds: u64 },
}

impl ApiError {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthExpired => "AUTH_EXPIRED",
            Self::AuthInvalid { .. } => "AUTH_INVALID",
            Self::PermissionDenied { .. } => "PERMISSION_DENIED",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Validation { .. } => "VALIDATION",
            Self::ServerFault { .. } => "SERVER_FAULT",
            Self::NetworkUnavailable { .. } => "NETWORK_UNAVAILABLE",
            Self::Timeout { .. } => "TIMEOUT",
        }
    }

    /// Whether a caller-level retry with backoff is a reasonable response.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ServerFault { .. } | Self::Timeout { .. })
    }
}

/// Failure at the durable-storage boundary.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Union error for facade and sync surfaces, where both the network and the
/// durable store can fail.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Sync was requested while the Connectivity Monitor reports offline.
    #[error("offline: connectivity is down")]
    Offline,
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
