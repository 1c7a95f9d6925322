//! QueueBuilder - キューハンドルの構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）: キュー名は open 時に検証する
//! - ports の差し替え（lock / clock / id generator）

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::config::QueueConfig;
use crate::domain::{QueueName, VisibilityPolicy};
use crate::error::QueueError;
use crate::impls::DirLock;
use crate::ports::{Clock, IdGenerator, QueueLock, SystemClock, UlidGenerator};
use crate::queue::store::{QueueStore, StoreParts};
use crate::queue::{FileQueue, QueuePaths};

/// QueueBuilder は FileQueue を構築
///
/// # 使用例
/// ```ignore
/// let queue = QueueBuilder::new("orders")
///     .config(QueueConfig::from_env())
///     .open()
///     .await?;
/// ```
///
/// # デフォルト
/// - lock: `DirLock`（root と lock_backoff から作成）
/// - clock: `SystemClock`
/// - id generator: `UlidGenerator`（上記 clock を使用）
pub struct QueueBuilder {
    name: String,
    config: QueueConfig,
    lock: Option<Arc<dyn QueueLock>>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
    policy: VisibilityPolicy,
}

impl QueueBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: QueueConfig::default(),
            lock: None,
            clock: None,
            ids: None,
            policy: VisibilityPolicy::standard(),
        }
    }

    /// Builder for the queue named by the last segment of a queue URL.
    pub fn from_url(url: &str) -> Result<Self, QueueError> {
        let name = QueueName::from_url(url).ok_or_else(|| QueueError::InvalidQueueName {
            name: url.to_string(),
            reason: "no queue name after the last '/'",
        })?;
        Ok(Self::new(name.as_str()))
    }

    pub fn config(mut self, config: QueueConfig) -> Self {
        self.config = config;
        self
    }

    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.root = root.into();
        self
    }

    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.config.sweep_interval_ms = interval.as_millis().try_into().unwrap_or(u64::MAX);
        self
    }

    pub fn lock(mut self, lock: Arc<dyn QueueLock>) -> Self {
        self.lock = Some(lock);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn policy(mut self, policy: VisibilityPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Validate the name, wire the ports and return a handle.
    ///
    /// If the queue already has a message file (another handle or process
    /// pushed to it), its sweeper is started right away.
    pub async fn open(self) -> Result<FileQueue, QueueError> {
        let name = QueueName::new(self.name)?;
        let paths = QueuePaths::new(&self.config.root, &name);

        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(SystemClock),
        };
        let ids: Arc<dyn IdGenerator> = match self.ids {
            Some(ids) => ids,
            None => Arc::new(UlidGenerator::new(Arc::clone(&clock))),
        };
        let lock: Arc<dyn QueueLock> = match self.lock {
            Some(lock) => lock,
            None => Arc::new(DirLock::with_backoff(
                self.config.root.clone(),
                self.config.lock_backoff(),
            )),
        };

        let store = Arc::new(QueueStore::new(StoreParts {
            name,
            paths,
            lock,
            clock,
            ids,
            policy: self.policy,
            sweep_interval: self.config.sweep_interval(),
        }));

        let populated = tokio::fs::try_exists(store.paths().message())
            .await
            .map_err(|e| QueueError::io("probe message file", e))?;
        if populated {
            store.activate();
        }

        debug!(
            queue = %store.name(),
            root = %self.config.root.display(),
            populated,
            "queue opened"
        );
        Ok(FileQueue::new(store))
    }
}
