//! Ports - 抽象化レイヤー
//!
//! キューエンジンが外部（時刻、ID 生成、排他制御）に依存する箇所を trait として
//! 定義します。ストアはこれらを `Arc<dyn ...>` で受け取り、実装の詳細を知りません。

pub mod clock;
pub mod id_generator;
pub mod queue_lock;

// 主要な trait を再エクスポート
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::queue_lock::QueueLock;
