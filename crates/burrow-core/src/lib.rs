//! burrow-core
//!
//! Local, file-persisted message queue with visibility timeouts.
//!
//! # モジュール構成
//! - **domain**: 値オブジェクト（QueueName, ReceiptHandle, Message, Visibility, VisibilityPolicy）
//! - **ports**: 抽象化レイヤー（QueueLock, Clock, IdGenerator）
//! - **impls**: ports の実装（DirLock, ProcessLock）
//! - **queue**: レコード形式とファイルキュー本体（push / pull / delete）
//! - **app**: QueueBuilder と可視性スイーパー
//! - config / error / observability

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod queue;

pub use app::QueueBuilder;
pub use config::QueueConfig;
pub use domain::{Message, QueueName, ReceiptHandle, Visibility, VisibilityPolicy};
pub use error::QueueError;
pub use observability::QueueStats;
pub use queue::FileQueue;
