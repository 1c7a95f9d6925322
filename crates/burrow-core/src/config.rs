//! Queue configuration: filesystem root and timing knobs.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::QueueError;

pub const ENV_ROOT: &str = "BURROW_ROOT";
pub const ENV_SWEEP_INTERVAL_MS: &str = "BURROW_SWEEP_INTERVAL_MS";
pub const ENV_LOCK_BACKOFF_MS: &str = "BURROW_LOCK_BACKOFF_MS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Directory holding one sub-directory per queue.
    pub root: PathBuf,

    /// Period of the visibility refresh while a queue is active.
    pub sweep_interval_ms: u64,

    /// Delay between attempts to take a contended queue lock.
    pub lock_backoff_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("sqs"),
            sweep_interval_ms: 1000,
            lock_backoff_ms: 50,
        }
    }
}

impl QueueConfig {
    /// Defaults overlaid with `BURROW_*` environment variables.
    ///
    /// Unparsable numeric values are ignored.
    pub fn from_env() -> Self {
        Self::default().overlay(|key| std::env::var(key).ok())
    }

    pub fn from_json(json: &str) -> Result<Self, QueueError> {
        Ok(serde_json::from_str(json)?)
    }

    fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(root) = lookup(ENV_ROOT).filter(|v| !v.is_empty()) {
            self.root = PathBuf::from(root);
        }
        if let Some(ms) = lookup(ENV_SWEEP_INTERVAL_MS).and_then(|v| v.parse().ok()) {
            self.sweep_interval_ms = ms;
        }
        if let Some(ms) = lookup(ENV_LOCK_BACKOFF_MS).and_then(|v| v.parse().ok()) {
            self.lock_backoff_ms = ms;
        }
        self
    }

    pub fn sweep_interval(&self) -> Duration {
        // interval() panics on zero
        Duration::from_millis(self.sweep_interval_ms.max(1))
    }

    pub fn lock_backoff(&self) -> Duration {
        Duration::from_millis(self.lock_backoff_ms)
    }
}
