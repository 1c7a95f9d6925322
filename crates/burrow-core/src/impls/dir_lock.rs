//! DirLock - ディレクトリ作成によるプロセス間ロック
//!
//! # 仕組み
//! 1. `<root>/<queue>/` を用意（`create_dir_all`）
//! 2. `<root>/<queue>/.lock/` を `create_dir` で作成 → 成功したら保持
//! 3. `AlreadyExists` なら `backoff` だけ sleep して 2 に戻る（無期限）
//! 4. release でディレクトリを削除
//!
//! `create_dir` は「無ければ作る」を原子的に行うので、同じ root を共有する
//! 全プロセス間で排他になります。
//!
//! # 制約
//! - lease / 期限はない。保持したままプロセスが落ちると `.lock/` が残り、
//!   手で消すまでそのキューは止まったままになる
//! - 待機はポーリング（ブロッキング待ちではない）

use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tracing::trace;

use crate::domain::QueueName;
use crate::error::QueueError;
use crate::ports::QueueLock;
use crate::queue::QueuePaths;

pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(50);

pub struct DirLock {
    root: PathBuf,
    backoff: Duration,
}

impl DirLock {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_backoff(root, DEFAULT_BACKOFF)
    }

    pub fn with_backoff(root: impl Into<PathBuf>, backoff: Duration) -> Self {
        Self {
            root: root.into(),
            backoff,
        }
    }
}

#[async_trait]
impl QueueLock for DirLock {
    async fn acquire(&self, queue: &QueueName) -> Result<(), QueueError> {
        let paths = QueuePaths::new(&self.root, queue);
        tokio::fs::create_dir_all(paths.dir()).await.map_err(|e| {
            QueueError::io(format!("create queue dir {}", paths.dir().display()), e)
        })?;

        let mut attempts: u64 = 0;
        loop {
            match tokio::fs::create_dir(paths.lock()).await {
                Ok(()) => {
                    trace!(queue = %queue, attempts, "lock acquired");
                    return Ok(());
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    attempts += 1;
                    tokio::time::sleep(self.backoff).await;
                }
                Err(e) => {
                    return Err(QueueError::io(
                        format!("create lock marker {}", paths.lock().display()),
                        e,
                    ));
                }
            }
        }
    }

    async fn release(&self, queue: &QueueName) -> Result<(), QueueError> {
        let paths = QueuePaths::new(&self.root, queue);
        match tokio::fs::remove_dir(paths.lock()).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(QueueError::io(
                format!("remove lock marker {}", paths.lock().display()),
                e,
            )),
        }
    }
}
