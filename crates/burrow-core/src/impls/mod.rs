//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **DirLock**: デフォルトの QueueLock（`.lock/` ディレクトリ、プロセス間）
//! - **ProcessLock**: プロセス内だけの QueueLock

pub mod dir_lock;
pub mod process_lock;

// 主要な型を再エクスポート
pub use self::dir_lock::DirLock;
pub use self::process_lock::ProcessLock;
