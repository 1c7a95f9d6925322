//! Sweeper - 可視性期限切れの回収ループ
//!
//! キューにメッセージがある間（Active）だけ、一定間隔で refresh トランザクションを
//! 実行し、期限切れの claim を Visible に戻します。
//!
//! # 状態遷移
//! - Dormant -> Active: 空のキューへの最初の push（または既存キューを open）
//! - Active -> Dormant: delete でキューが空になった時
//!
//! # 停止
//! - `watch` チャネルで停止シグナルを送る（共有参照を null にするのではない）
//! - Sender を drop してもタスクは止まる
//! - 実行中の refresh は中断しない（ロックを持ったまま止まらないように）

use std::sync::Weak;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::queue::store::QueueStore;

/// Scheduler state of one queue handle.
pub(crate) enum Lifecycle {
    Dormant,
    Active(Sweeper),
}

/// Handle to a running sweep task.
pub(crate) struct Sweeper {
    stop_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl Sweeper {
    /// Spawn the periodic refresh. The first sweep runs one `interval` after
    /// activation.
    pub(crate) fn spawn(store: Weak<QueueStore>, interval: Duration) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        let join = tokio::spawn(sweep_loop(store, interval, stop_rx));
        Self { stop_tx, join }
    }

    /// Request the task to exit. Does not wait: the caller may be holding the
    /// queue lock the task is waiting for.
    pub(crate) fn stop(self) {
        // ignore send error: the task may already have exited
        let _ = self.stop_tx.send(true);
        drop(self.join);
    }
}

async fn sweep_loop(
    store: Weak<QueueStore>,
    interval: Duration,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            changed = stop_rx.changed() => {
                // Err: sender dropped together with the queue handle
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                let Some(store) = store.upgrade() else {
                    break;
                };
                if let Err(e) = store.refresh().await {
                    warn!(queue = %store.name(), error = %e, "visibility sweep failed");
                }
            }
        }
    }

    debug!("visibility sweeper exited");
}
