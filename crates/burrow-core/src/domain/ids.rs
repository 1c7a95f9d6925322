//! Receipt handle (message identity + delete token).
//!
//! 新規 push 時に一度だけ ULID から生成され、以後 pull を何度繰り返しても変わりません。
//! ファイルから読み戻した handle は任意の文字列なので、`String` の newtype として保持します。
//!
//! ## ULID を使う理由
//! - **衝突しない**: 128-bit、プロセス間で調整不要
//! - **区切り文字を含まない**: Crockford base32 なので `$` や改行が入らない

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Opaque, stable identifier of a message within one queue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReceiptHandle(String);

impl ReceiptHandle {
    /// Wrap a handle read back from disk or supplied by a caller.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Ulid> for ReceiptHandle {
    fn from(ulid: Ulid) -> Self {
        Self(ulid.to_string())
    }
}

impl fmt::Display for ReceiptHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<str> for ReceiptHandle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
