// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default per-request deadline in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default margin before expiry at which a token counts as expiring soon.
pub const DEFAULT_REFRESH_MARGIN_SECS: u64 = 60;

/// Configuration for the fieldsync data-access layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the remote service, without a trailing slash.
    pub base_url: String,

    /// Per-request deadline in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Seconds before expiry at which the access token is refreshed
    /// proactively.
    #[serde(default = "default_refresh_margin_secs")]
    pub refresh_margin_secs: u64,

    /// Login endpoint path.
    #[serde(default = "default_login_path")]
    pub login_path: String,

    /// Refresh endpoint path.
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,

    /// Durable state directory. Falls back to the env chain when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<PathBuf>,
}

impl ClientConfig {
    /// Config for `base_url` with default timeouts and paths.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            refresh_margin_secs: DEFAULT_REFRESH_MARGIN_SECS,
            login_path: default_login_path(),
            refresh_path: default_refresh_path(),
            state_dir: None,
        }
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }

    pub fn refresh_margin(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.refresh_margin_secs)
    }

    /// Resolve the durable state directory.
    ///
    /// Uses the explicit override when set, then `FIELDSYNC_STATE_DIR`, then
    /// `$XDG_STATE_HOME/fieldsync`, then `$HOME/.local/state/fieldsync`.
    pub fn state_dir(&self) -> PathBuf {
        if let Some(ref dir) = self.state_dir {
            return dir.clone();
        }
        if let Ok(dir) = std::env::var("FIELDSYNC_STATE_DIR") {
            return PathBuf::from(dir);
        }
        if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
            return PathBuf::from(xdg).join("fieldsync");
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(".local/state/fieldsync");
        }
        PathBuf::from(".fieldsync")
    }
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_refresh_margin_secs() -> u64 {
    DEFAULT_REFRESH_MARGIN_SECS
}

fn default_login_path() -> String {
    "/auth/login".to_owned()
}

fn default_refresh_path() -> String {
    "/auth/refresh-token".to_owned()
}
