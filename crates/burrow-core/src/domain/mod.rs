//! Domain model (queue name, receipt handle, message, visibility, policy).
//!
//! ファイル形式やロックには依存しない値オブジェクトだけを置きます。

pub mod ids;
pub mod message;
pub mod policy;
pub mod queue_name;
pub mod visibility;

pub use ids::ReceiptHandle;
pub use message::Message;
pub use policy::VisibilityPolicy;
pub use queue_name::QueueName;
pub use visibility::Visibility;
