use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("I/O failure: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid queue name {name:?}: {reason}")]
    InvalidQueueName { name: String, reason: &'static str },

    #[error("message content must not contain line breaks")]
    InvalidContent,

    #[error("queue transaction aborted: {0}")]
    Interrupted(String),

    #[error("invalid queue config: {0}")]
    InvalidConfig(#[from] serde_json::Error),
}

impl QueueError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, QueueError>;
