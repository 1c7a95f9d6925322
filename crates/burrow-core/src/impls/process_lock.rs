//! ProcessLock - プロセス内だけで有効なキュー単位ロック
//!
//! # 学習ポイント
//! - キー（キュー名）ごとの保持状態を 1 つの Mutex<HashSet> で管理
//! - Notify による release 通知（ポーリングしない）
//! - `Notified::enable` で「確認してから待つ」間の取りこぼしを防ぐ
//!
//! 1 つのプロセスだけが root を使う組み込み用途向け。別プロセスとは排他しません。

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::domain::QueueName;
use crate::error::QueueError;
use crate::ports::QueueLock;

/// ProcessLock は同一プロセス内のキー付きロック
///
/// # 実装詳細
/// - `held`: 現在ロック中のキュー名
/// - `released`: release 時に全待機者を起こす
#[derive(Default)]
pub struct ProcessLock {
    held: Mutex<HashSet<String>>,
    released: Notify,
}

impl ProcessLock {
    pub fn new() -> Self {
        Self::default()
    }

    fn try_acquire(&self, queue: &QueueName) -> bool {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        held.insert(queue.as_str().to_owned())
    }
}

#[async_trait]
impl QueueLock for ProcessLock {
    async fn acquire(&self, queue: &QueueName) -> Result<(), QueueError> {
        loop {
            let notified = self.released.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.try_acquire(queue) {
                return Ok(());
            }
            notified.await;
        }
    }

    async fn release(&self, queue: &QueueName) -> Result<(), QueueError> {
        {
            let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
            held.remove(queue.as_str());
        }
        self.released.notify_waiters();
        Ok(())
    }
}
