//! QueueLock port - キュー単位の相互排他
//!
//! ストアのトランザクション（push / pull / delete / refresh）はすべて
//! `acquire` → 読み書き → `release` の形をとります。排他の実現方法
//! （ディレクトリ作成、プロセス内ロック、OS のファイルロック…）はこの trait の
//! 実装に閉じ込め、トランザクション側は差し替えを意識しません。
//!
//! # 実装
//! - **DirLock**: `<root>/<queue>/.lock/` の作成／削除（プロセス間で有効）
//! - **ProcessLock**: 同一プロセス内だけで有効なキー付きロック

use async_trait::async_trait;

use crate::domain::QueueName;
use crate::error::QueueError;

/// QueueLock はキュー名をキーにした排他ロック
///
/// # 契約
/// - `acquire` は取得できるまで待つ（タイムアウトなし、競合はエラーにしない）
/// - `release` は `acquire` に成功した呼び出し元だけが呼ぶ
/// - 異なるキュー名同士は互いに影響しない
#[async_trait]
pub trait QueueLock: Send + Sync {
    async fn acquire(&self, queue: &QueueName) -> Result<(), QueueError>;

    async fn release(&self, queue: &QueueName) -> Result<(), QueueError>;
}
