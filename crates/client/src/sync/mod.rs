// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Offline synchronization: the durable operation queue, kind routing for
//! replay, the cached snapshot, and the orchestrator tying them to the
//! connectivity monitor.

pub mod operations;
pub mod orchestrator;
pub mod queue;
pub mod snapshot;

use serde::Serialize;

/// One operation that failed replay, as reported to the host application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncFailure {
    pub operation_id: String,
    pub message: String,
}

/// Outcome of one queue-draining pass.
///
/// Failures are partial: a failed operation is counted and requeued while
/// the rest of the batch proceeds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub processed_count: usize,
    pub failed_count: usize,
    pub errors: Vec<SyncFailure>,
}

/// Outcome of a full upload-then-download pass.
#[derive(Debug, Clone)]
pub struct FullSyncReport {
    pub up: SyncReport,
    /// Present when the pass refreshed the cached snapshot.
    pub snapshot: Option<snapshot::Snapshot>,
}
