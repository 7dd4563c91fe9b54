// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable access-credential store.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::StorageError;
use crate::session::{epoch_secs, Credential};
use crate::storage::{Storage, CREDENTIAL_KEY};

/// Holds the current access credential and writes every mutation through to
/// durable storage before returning, so memory and storage never observably
/// diverge.
pub struct TokenStore {
    storage: Arc<dyn Storage>,
    current: Mutex<Option<Credential>>,
}

impl TokenStore {
    /// Open the store, recovering any persisted credential.
    ///
    /// A corrupt stored value is logged and treated as absent rather than
    /// failing construction.
    pub fn open(storage: Arc<dyn Storage>) -> Self {
        let current = match storage.load(CREDENTIAL_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Credential>(&raw) {
                Ok(credential) => Some(credential),
                Err(e) => {
                    tracing::warn!(err = %e, "failed to parse persisted credential, ignoring");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(err = %e, "failed to read persisted credential");
                None
            }
        };
        Self { storage, current: Mutex::new(current) }
    }

    pub fn access_token(&self) -> Option<String> {
        self.current.lock().as_ref().map(|c| c.access_token.clone())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.current.lock().as_ref().map(|c| c.refresh_token.clone())
    }

    /// Whether the access token expires within `threshold` (or is missing).
    pub fn is_expiring_soon(&self, threshold: Duration) -> bool {
        match self.current.lock().as_ref() {
            Some(credential) => credential.expires_at <= epoch_secs() + threshold.as_secs(),
            None => true,
        }
    }

    /// Store a fresh credential, persisting it before returning.
    ///
    /// A `None` refresh token keeps the previous one: refresh responses may
    /// omit it while rotating only the access token.
    pub fn set_credential(
        &self,
        access_token: &str,
        expires_in_secs: u64,
        refresh_token: Option<&str>,
    ) -> Result<(), StorageError> {
        let mut current = self.current.lock();
        let refresh_token = refresh_token
            .map(str::to_owned)
            .or_else(|| current.as_ref().map(|c| c.refresh_token.clone()))
            .unwrap_or_default();
        let credential = Credential {
            access_token: access_token.to_owned(),
            expires_at: epoch_secs() + expires_in_secs,
            refresh_token,
        };
        let json = serde_json::to_string_pretty(&credential)?;
        *current = Some(credential);
        self.storage.save(CREDENTIAL_KEY, &json)
    }

    /// Drop the credential from memory and storage.
    pub fn clear(&self) -> Result<(), StorageError> {
        *self.current.lock() = None;
        self.storage.clear(CREDENTIAL_KEY)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
