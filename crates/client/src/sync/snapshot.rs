// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cached read-only snapshot of reference data for offline use.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::StorageError;
use crate::storage::{Storage, LAST_SYNC_KEY, SNAPSHOT_KEY};

/// Point-in-time copy of reference data, replaced wholesale on every
/// successful download.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub data: serde_json::Value,
    pub last_sync: DateTime<Utc>,
}

/// Persists the snapshot blob under `sync.snapshot` and its timestamp under
/// `sync.lastSyncTimestamp`.
pub struct SnapshotStore {
    storage: Arc<dyn Storage>,
}

impl SnapshotStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Replace the cached snapshot.
    pub fn save(
        &self,
        data: &serde_json::Value,
        last_sync: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(data)?;
        self.storage.save(SNAPSHOT_KEY, &json)?;
        self.storage.save(LAST_SYNC_KEY, &last_sync.to_rfc3339())
    }

    /// Load the cached snapshot. A missing or unreadable blob or timestamp
    /// makes the whole snapshot count as absent.
    pub fn load(&self) -> Result<Option<Snapshot>, StorageError> {
        let Some(raw) = self.storage.load(SNAPSHOT_KEY)? else {
            return Ok(None);
        };
        let data: serde_json::Value = match serde_json::from_str(&raw) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(err = %e, "failed to parse cached snapshot, ignoring");
                return Ok(None);
            }
        };
        let Some(stamp) = self.storage.load(LAST_SYNC_KEY)? else {
            return Ok(None);
        };
        match DateTime::parse_from_rfc3339(&stamp) {
            Ok(t) => Ok(Some(Snapshot { data, last_sync: t.with_timezone(&Utc) })),
            Err(e) => {
                tracing::warn!(err = %e, "failed to parse last-sync timestamp, ignoring snapshot");
                Ok(None)
            }
        }
    }
}
