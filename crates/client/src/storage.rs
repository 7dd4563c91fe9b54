// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable key/value storage behind one narrow interface.
//!
//! Every persisted value (credential, offline queue, snapshot) is routed
//! through [`Storage`] so the backend can be swapped without touching the
//! components above it: [`FileStorage`] in production, [`MemoryStorage`] in
//! tests and for ephemeral sessions.

use std::collections::HashMap;
use std::path::PathBuf;

use parking_lot::Mutex;

use crate::error::StorageError;

/// Logical key for the serialized access credential.
pub const CREDENTIAL_KEY: &str = "session.credential";

/// Logical key for the offline operation queue (JSON array).
pub const QUEUE_KEY: &str = "sync.queue";

/// Logical key for the cached reference-data snapshot (JSON blob).
pub const SNAPSHOT_KEY: &str = "sync.snapshot";

/// Logical key for the last successful sync timestamp (RFC 3339 string).
pub const LAST_SYNC_KEY: &str = "sync.lastSyncTimestamp";

/// Narrow persistence interface.
///
/// Keys are the logical names above and must remain stable across versions:
/// a user's queued offline work survives upgrades only as long as the layout
/// does.
pub trait Storage: Send + Sync {
    /// Read the value stored under `key`. Missing keys are `Ok(None)`.
    fn load(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write `value` under `key`, replacing any previous value. The write is
    /// fully applied before this returns.
    fn save(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove the value under `key`. Clearing a missing key succeeds.
    fn clear(&self, key: &str) -> Result<(), StorageError>;
}

/// File-backed storage: one file per logical key inside a state directory.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Open storage rooted at `dir`, creating the directory if needed.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl Storage for FileStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Atomic write: unique temp file (PID + counter) then rename.
    ///
    /// The unique temp name avoids corruption when concurrent saves race on
    /// the same `.tmp` file, where a shorter write can leave trailing bytes
    /// from a longer previous write.
    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        use std::sync::atomic::{AtomicU32, Ordering};
        static COUNTER: AtomicU32 = AtomicU32::new(0);

        let path = self.path_for(key);
        let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
        let tmp_name = format!("{key}.{}.{seq}.tmp", std::process::id());
        let tmp_path = path.with_file_name(tmp_name);
        std::fs::write(&tmp_path, value)?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory storage backend.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.lock().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
#[path = "storage_tests.rs"]
mod tests;
