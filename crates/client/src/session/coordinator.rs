// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-flight refresh coordinator.
//!
//! At most one token refresh is in flight at any time. Callers arriving while
//! one is running park on the pending list and are released in registration
//! order with the shared outcome.

use std::sync::Arc;

use tokio::sync::{broadcast, oneshot, Mutex};

use crate::config::ClientConfig;
use crate::error::{ApiError, StorageError};
use crate::session::refresh::exchange_refresh_token;
use crate::session::store::TokenStore;
use crate::session::SessionEvent;
use crate::transport::exchange::HttpExchange;

/// Outcome shared by every caller of a settled refresh.
type RefreshOutcome = Result<String, ApiError>;

enum RefreshState {
    Idle,
    /// A refresh is in flight; parked callers are released in push order.
    Refreshing { waiters: Vec<oneshot::Sender<RefreshOutcome>> },
}

/// Guarantees the single-flight property for token refresh.
///
/// The first caller to observe `Idle` flips the state and starts the flight
/// as a detached task; everyone (the starter included) parks on the pending
/// list. The detached task settles the flight even if every caller has been
/// dropped mid-await, so the state can never wedge in `Refreshing`. All
/// callers of the same flight observe the same new token or the same
/// failure.
pub struct RefreshCoordinator {
    exchange: Arc<dyn HttpExchange>,
    store: Arc<TokenStore>,
    config: ClientConfig,
    state: Mutex<RefreshState>,
    event_tx: broadcast::Sender<SessionEvent>,
}

impl RefreshCoordinator {
    pub fn new(
        exchange: Arc<dyn HttpExchange>,
        store: Arc<TokenStore>,
        config: ClientConfig,
        event_tx: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self { exchange, store, config, state: Mutex::new(RefreshState::Idle), event_tx }
    }

    /// Subscribe to session lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Renew the credential unless it is already fresh.
    ///
    /// The freshness recheck makes a caller that lost the race to a refresh
    /// which already settled return immediately instead of starting another.
    pub async fn ensure_fresh(self: &Arc<Self>) -> Result<(), ApiError> {
        if !self.store.is_expiring_soon(self.config.refresh_margin()) {
            return Ok(());
        }
        self.refresh_shared().await?;
        Ok(())
    }

    /// Renew the credential unconditionally, sharing any in-flight refresh.
    ///
    /// Used after a 401: the server rejected the token regardless of what
    /// local expiry math says.
    pub async fn force_refresh(self: &Arc<Self>) -> RefreshOutcome {
        self.refresh_shared().await
    }

    /// End the session deliberately: clear the credential and notify.
    pub fn end_session(&self, reason: &str) -> Result<(), StorageError> {
        self.store.clear()?;
        let _ = self.event_tx.send(SessionEvent::Ended { reason: reason.to_owned() });
        tracing::info!(reason, "session ended");
        Ok(())
    }

    async fn refresh_shared(self: &Arc<Self>) -> RefreshOutcome {
        let rx = {
            let mut state = self.state.lock().await;
            let (tx, rx) = oneshot::channel();
            match &mut *state {
                RefreshState::Refreshing { waiters } => waiters.push(tx),
                RefreshState::Idle => {
                    *state = RefreshState::Refreshing { waiters: vec![tx] };
                    let flight = Arc::clone(self);
                    tokio::spawn(async move {
                        let outcome = flight.perform_refresh().await;
                        flight.settle(outcome).await;
                    });
                }
            }
            rx
        };

        match rx.await {
            Ok(outcome) => outcome,
            // The flight task died without settling.
            Err(_) => Err(ApiError::AuthInvalid { reason: "refresh abandoned".to_owned() }),
        }
    }

    /// The one network call. Runs only on the detached flight task.
    async fn perform_refresh(&self) -> RefreshOutcome {
        let refresh_token = self
            .store
            .refresh_token()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::AuthInvalid { reason: "no refresh token".to_owned() })?;

        let grant =
            exchange_refresh_token(self.exchange.as_ref(), &self.config, &refresh_token).await?;
        if let Err(e) = self.store.set_credential(
            &grant.token,
            grant.expires_in,
            grant.refresh_token.as_deref(),
        ) {
            tracing::warn!(err = %e, "failed to persist refreshed credential");
        }
        Ok(grant.token)
    }

    /// Apply the outcome's side effects, flip back to `Idle`, and release
    /// every parked caller in registration order.
    async fn settle(&self, outcome: RefreshOutcome) {
        match &outcome {
            Ok(_) => {
                let _ = self.event_tx.send(SessionEvent::Refreshed);
                tracing::info!("access credential refreshed");
            }
            Err(e) => {
                if let Err(clear_err) = self.store.clear() {
                    tracing::warn!(err = %clear_err, "failed to clear credential on teardown");
                }
                let _ = self.event_tx.send(SessionEvent::Ended { reason: e.to_string() });
                tracing::warn!(err = %e, "refresh failed, session ended");
            }
        }

        let waiters = {
            let mut state = self.state.lock().await;
            match std::mem::replace(&mut *state, RefreshState::Idle) {
                RefreshState::Refreshing { waiters } => waiters,
                RefreshState::Idle => Vec::new(),
            }
        };
        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
