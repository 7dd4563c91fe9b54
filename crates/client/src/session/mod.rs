// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session credential state: durable token store, login/refresh wire calls,
//! and the single-flight refresh coordinator.

pub mod coordinator;
pub mod refresh;
pub mod store;

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// The access credential owned by the token store.
///
/// Serialized camelCase under the `session.credential` storage key; the
/// layout is stable across versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub access_token: String,
    /// Expiry as epoch seconds.
    pub expires_at: u64,
    pub refresh_token: String,
}

/// Session lifecycle events, broadcast to interested UI.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A login or refresh stored a new access credential.
    Refreshed,
    /// The session is over: credential cleared, re-authentication required.
    Ended { reason: String },
}

pub(crate) fn epoch_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}
