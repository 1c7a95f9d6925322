use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::QueueError;
use crate::queue::codec::DELIMITER;

/// Name of a queue; used only as one filesystem path component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QueueName(String);

impl QueueName {
    pub fn new(name: impl Into<String>) -> Result<Self, QueueError> {
        let name = name.into();
        let reason = if name.is_empty() {
            Some("must not be empty")
        } else if name == "." || name == ".." {
            Some("must not be a relative directory")
        } else if name.contains(['/', '\\']) {
            Some("must not contain path separators")
        } else if name.contains(DELIMITER) {
            Some("must not contain the record delimiter")
        } else if name.contains(['\n', '\r', '\0']) {
            Some("must not contain control characters")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(QueueError::InvalidQueueName { name, reason }),
            None => Ok(Self(name)),
        }
    }

    /// Extract the queue name from a queue URL: the segment after the last `/`.
    ///
    /// Returns `None` when the string has no `/` or the trailing segment is not
    /// a valid name (e.g. a URL ending in `/`).
    pub fn from_url(url: &str) -> Option<Self> {
        let (_, name) = url.rsplit_once('/')?;
        Self::new(name).ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueueName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for QueueName {
    type Error = QueueError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<QueueName> for String {
    fn from(value: QueueName) -> Self {
        value.0
    }
}
