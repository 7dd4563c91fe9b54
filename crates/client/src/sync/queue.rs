// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable FIFO queue of mutations recorded while offline.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StorageError;
use crate::storage::{Storage, QUEUE_KEY};

/// A mutation awaiting replay.
///
/// Serialized camelCase under the `sync.queue` storage key; the layout is
/// stable across versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedOperation {
    pub id: String,
    pub kind: String,
    pub payload: serde_json::Value,
    pub enqueued_at: DateTime<Utc>,
}

/// Durable, ordered list of pending mutations.
///
/// Every mutating method writes the full queue to storage before returning,
/// so the in-memory and durable views never observably diverge. Operations
/// are replayed strictly in enqueue order.
pub struct OperationQueue {
    storage: Arc<dyn Storage>,
    entries: Mutex<Vec<QueuedOperation>>,
}

impl OperationQueue {
    /// Open the queue, recovering any persisted entries.
    ///
    /// A corrupt stored value is logged and treated as empty rather than
    /// failing construction.
    pub fn open(storage: Arc<dyn Storage>) -> Self {
        let entries = match storage.load(QUEUE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<QueuedOperation>>(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(err = %e, "failed to parse persisted queue, starting empty");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(err = %e, "failed to read persisted queue");
                Vec::new()
            }
        };
        Self { storage, entries: Mutex::new(entries) }
    }

    /// Record a mutation at the tail of the queue and return its id.
    ///
    /// If the durable write fails the entry is removed again and the error
    /// propagated, so memory never claims work that storage lost.
    pub fn enqueue(
        &self,
        kind: &str,
        payload: serde_json::Value,
    ) -> Result<String, StorageError> {
        let operation = QueuedOperation {
            id: Uuid::new_v4().to_string(),
            kind: kind.to_owned(),
            payload,
            enqueued_at: Utc::now(),
        };
        let id = operation.id.clone();
        let mut entries = self.entries.lock();
        entries.push(operation);
        if let Err(e) = self.persist(&entries) {
            entries.pop();
            return Err(e);
        }
        tracing::debug!(kind, id = %id, pending = entries.len(), "operation queued");
        Ok(id)
    }

    /// Remove and return every entry, persisting the now-empty queue first.
    ///
    /// A drained operation exists nowhere durable until a failed replay
    /// requeues it, so a crash mid-replay loses exactly the operations that
    /// were in flight at that moment.
    pub fn drain_all(&self) -> Result<Vec<QueuedOperation>, StorageError> {
        let mut entries = self.entries.lock();
        let drained = std::mem::take(&mut *entries);
        if let Err(e) = self.persist(&entries) {
            *entries = drained;
            return Err(e);
        }
        Ok(drained)
    }

    /// Reinsert a drained operation at the tail, preserving its original
    /// `enqueued_at`.
    ///
    /// The entry stays in memory even when the durable write fails; a queued
    /// operation must never be dropped.
    pub fn requeue(&self, operation: QueuedOperation) -> Result<(), StorageError> {
        let mut entries = self.entries.lock();
        entries.push(operation);
        self.persist(&entries)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Read-only copy of the queue, in replay order.
    pub fn peek_all(&self) -> Vec<QueuedOperation> {
        self.entries.lock().clone()
    }

    fn persist(&self, entries: &[QueuedOperation]) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(entries)?;
        self.storage.save(QUEUE_KEY, &json)
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
