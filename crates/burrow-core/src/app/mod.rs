//! App - アプリケーション層
//!
//! ports と queue を組み合わせて、利用者が手にするハンドルを組み立てます。
//!
//! # 主要コンポーネント
//! - **QueueBuilder**: FileQueue の構築とワイヤリング
//! - **Sweeper**: Active なキューの可視性期限切れを定期回収

pub mod builder;
pub(crate) mod sweeper;

// 主要な型を再エクスポート
pub use self::builder::QueueBuilder;
