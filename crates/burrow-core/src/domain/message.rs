use serde::{Deserialize, Serialize};

use chrono::{DateTime, Utc};

use super::{ReceiptHandle, Visibility};

/// One queued message: identity + visibility + payload.
///
/// This is both the value handed to callers by `pull` and the in-memory form
/// of one line of the message file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    receipt_handle: ReceiptHandle,
    visibility: Visibility,
    content: String,
}

impl Message {
    /// A freshly enqueued message starts out visible.
    pub fn new(receipt_handle: ReceiptHandle, content: impl Into<String>) -> Self {
        Self {
            receipt_handle,
            visibility: Visibility::Visible,
            content: content.into(),
        }
    }

    pub(crate) fn with_visibility(
        receipt_handle: ReceiptHandle,
        visibility: Visibility,
        content: String,
    ) -> Self {
        Self {
            receipt_handle,
            visibility,
            content,
        }
    }

    pub fn receipt_handle(&self) -> &ReceiptHandle {
        &self.receipt_handle
    }

    pub fn set_receipt_handle(&mut self, receipt_handle: ReceiptHandle) {
        self.receipt_handle = receipt_handle;
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Instant at which a claimed message becomes eligible for redelivery.
    pub fn visible_at(&self) -> Option<DateTime<Utc>> {
        self.visibility.visible_at()
    }

    pub fn set_visible_at(&mut self, visible_at: Option<DateTime<Utc>>) {
        self.visibility = Visibility::from(visible_at);
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn into_content(self) -> String {
        self.content
    }
}
