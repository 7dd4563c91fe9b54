// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end specs that run the real client against a mock backend over
//! HTTP: login, transparent refresh, offline queueing, replay, and session
//! teardown.

use std::time::Duration;

use futures_util::future::join_all;
use tokio_util::sync::CancellationToken;

use fieldsync::api::MutationOutcome;
use fieldsync::error::{ApiError, ClientError};
use fieldsync::session::SessionEvent;
use fieldsync_specs::{client_for, MockBackend};

const TIMEOUT: Duration = Duration::from_secs(10);

// -- Auth ---------------------------------------------------------------------

#[tokio::test]
async fn login_then_fetch_roundtrip() -> anyhow::Result<()> {
    let backend = MockBackend::start().await?;
    let dir = tempfile::tempdir()?;
    let client = client_for(&backend, dir.path())?;

    client.login("ada", "haymaker").await?;
    let farmers = client.fetch_farmers(None).await?;
    assert_eq!(farmers["farmers"].as_array().map(Vec::len), Some(2));

    let north = client.fetch_farmers(Some("north")).await?;
    assert_eq!(north["farmers"].as_array().map(Vec::len), Some(1));
    assert_eq!(north["farmers"][0]["id"], "f1");

    assert_eq!(backend.hits("/auth/login"), 1);
    assert_eq!(backend.hits("/farmers"), 2);
    Ok(())
}

#[tokio::test]
async fn wrong_password_is_rejected() -> anyhow::Result<()> {
    let backend = MockBackend::start().await?;
    let dir = tempfile::tempdir()?;
    let client = client_for(&backend, dir.path())?;

    let err = client.login("ada", "pitchfork").await.expect_err("bad password");
    assert!(matches!(err, ClientError::Api(ApiError::AuthInvalid { .. })));
    Ok(())
}

#[tokio::test]
async fn expired_token_refreshes_transparently() -> anyhow::Result<()> {
    let backend = MockBackend::start().await?;
    let dir = tempfile::tempdir()?;
    let client = client_for(&backend, dir.path())?;

    client.login("ada", "haymaker").await?;
    backend.expire_access();

    let regions = client.fetch_regions().await?;
    assert_eq!(regions["regions"][0], "north");

    // One rejected attempt, one refresh, one retried attempt.
    assert_eq!(backend.hits("/auth/refresh-token"), 1);
    assert_eq!(backend.hits("/regions"), 2);
    Ok(())
}

#[tokio::test]
async fn concurrent_callers_share_one_renewal() -> anyhow::Result<()> {
    let backend = MockBackend::start().await?;
    let dir = tempfile::tempdir()?;
    let client = client_for(&backend, dir.path())?;

    // A short grant makes the stored token count as expiring from the start;
    // the renewed one is long-lived so no second renewal can follow.
    backend.grant_seconds(30);
    client.login("ada", "haymaker").await?;
    backend.grant_seconds(3600);

    let fetches = join_all((0..8).map(|_| client.fetch_regions())).await;
    for fetched in fetches {
        fetched?;
    }

    assert_eq!(backend.hits("/auth/refresh-token"), 1);
    Ok(())
}

#[tokio::test]
async fn revoked_refresh_ends_the_session() -> anyhow::Result<()> {
    let backend = MockBackend::start().await?;
    let dir = tempfile::tempdir()?;
    let client = client_for(&backend, dir.path())?;

    client.login("ada", "haymaker").await?;
    let mut events = client.session_events();
    backend.revoke_refresh();
    backend.expire_access();

    let err = client.fetch_regions().await.expect_err("refresh revoked");
    assert!(matches!(err, ClientError::Api(ApiError::AuthInvalid { .. })));

    let event = events.recv().await?;
    assert!(matches!(event, SessionEvent::Ended { reason } if reason.contains("revoked")));

    // The credential is gone; later calls fail without touching the wire.
    let err = client.fetch_regions().await.expect_err("session over");
    assert!(matches!(err, ClientError::Api(ApiError::AuthInvalid { .. })));
    Ok(())
}

// -- Offline ------------------------------------------------------------------

#[tokio::test]
async fn offline_mutations_replay_on_reconnect() -> anyhow::Result<()> {
    let backend = MockBackend::start().await?;
    let dir = tempfile::tempdir()?;
    let client = client_for(&backend, dir.path())?;

    client.login("ada", "haymaker").await?;
    client.set_online(false);

    let outcome = client.update_farmer("f1", serde_json::json!({ "needsSupport": true })).await?;
    assert!(matches!(outcome, MutationOutcome::Queued { .. }));
    client.create_delivery(serde_json::json!({ "farmerId": "f1", "weightKg": 80 })).await?;
    assert_eq!(client.pending_count(), 2);
    assert_eq!(backend.received().len(), 0);

    let shutdown = CancellationToken::new();
    let watcher = client.spawn_auto_sync(shutdown.clone());
    client.set_online(true);

    let deadline = tokio::time::Instant::now() + TIMEOUT;
    loop {
        if tokio::time::Instant::now() > deadline {
            anyhow::bail!("queued mutations never replayed");
        }
        if client.cached_snapshot()?.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }

    assert_eq!(client.pending_count(), 0);
    let routes: Vec<String> = backend.received().into_iter().map(|(route, _)| route).collect();
    assert_eq!(routes, vec!["/farmers/{id}", "/deliveries"]);

    shutdown.cancel();
    watcher.await?;
    Ok(())
}

#[tokio::test]
async fn full_sync_fails_fast_offline() -> anyhow::Result<()> {
    let backend = MockBackend::start().await?;
    let dir = tempfile::tempdir()?;
    let client = client_for(&backend, dir.path())?;

    client.login("ada", "haymaker").await?;
    client.set_online(false);

    let err = client.run_full_sync().await.expect_err("offline");
    assert!(matches!(err, ClientError::Offline));
    assert_eq!(backend.received().len(), 0);
    Ok(())
}

// -- Durability ---------------------------------------------------------------

#[tokio::test]
async fn queued_work_survives_restart() -> anyhow::Result<()> {
    let backend = MockBackend::start().await?;
    let dir = tempfile::tempdir()?;

    {
        let client = client_for(&backend, dir.path())?;
        client.login("ada", "haymaker").await?;
        client.set_online(false);
        client.update_farmer("f2", serde_json::json!({ "phone": "+254700000001" })).await?;
        assert_eq!(client.pending_count(), 1);
    }

    // A fresh process over the same state directory: credential and queue
    // both come back without another login.
    let client = client_for(&backend, dir.path())?;
    assert_eq!(client.pending_count(), 1);

    let report = client.run_full_sync().await?;
    assert_eq!(report.up.processed_count, 1);
    assert_eq!(report.up.failed_count, 0);
    assert!(report.snapshot.is_some());

    assert_eq!(client.pending_count(), 0);
    assert_eq!(backend.received().len(), 1);
    assert_eq!(backend.hits("/auth/login"), 1);
    Ok(())
}
