//! IdGenerator port - receipt handle 生成の抽象化
//!
//! 複数プロセスが同じキューに push しても衝突しない handle が必要です。
//! テスト容易性のために、trait として抽象化しています。
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース（本番用）

use crate::domain::ReceiptHandle;
use crate::ports::Clock;
use ulid::Ulid;

/// IdGenerator は receipt handle を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（スケジューラのタスクと呼び出し元で共有する）
pub trait IdGenerator: Send + Sync {
    fn generate_receipt_handle(&self) -> ReceiptHandle;
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// Clock を使って現在時刻ベースの ULID を生成します。
/// これにより、テスト時に FixedClock を使って timestamp 部分を固定できます。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_receipt_handle(&self) -> ReceiptHandle {
        let timestamp_ms = self.clock.now().timestamp_millis().max(0) as u64;
        let ulid = Ulid::from_parts(timestamp_ms, rand::random());
        ReceiptHandle::from(ulid)
    }
}
