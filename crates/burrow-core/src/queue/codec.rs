//! Record codec: one message <-> one line of the message file.
//!
//! Grammar (line terminator excluded):
//!
//! ```text
//! <receipt_handle> $ <visible_epoch_millis> $ <content>
//! ```
//!
//! `visible_epoch_millis` is `0` for a visible message, otherwise the instant
//! at which the claim lapses. Content is everything after the second `$`, so
//! it may itself contain `$`.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{Message, ReceiptHandle, Visibility};

pub const DELIMITER: char = '$';

#[cfg(windows)]
pub const LINE_ENDING: &str = "\r\n";
#[cfg(not(windows))]
pub const LINE_ENDING: &str = "\n";

/// Why a line could not be decoded. Malformed lines are dropped by rewrites.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Malformed {
    #[error("missing field delimiter")]
    MissingDelimiter,

    #[error("empty receipt handle")]
    EmptyReceiptHandle,

    #[error("invalid visibility field {0:?}")]
    InvalidVisibility(String),
}

pub fn encode(message: &Message) -> String {
    let visible_millis = match message.visibility() {
        Visibility::Visible => 0,
        Visibility::InvisibleUntil(until) => until.timestamp_millis(),
    };
    format!(
        "{handle}{DELIMITER}{visible_millis}{DELIMITER}{content}",
        handle = message.receipt_handle(),
        content = message.content(),
    )
}

pub fn decode(line: &str) -> Result<Message, Malformed> {
    let line = line.strip_suffix('\r').unwrap_or(line);

    // Only the first two delimiters are structural.
    let (handle, rest) = line
        .split_once(DELIMITER)
        .ok_or(Malformed::MissingDelimiter)?;
    let (visibility, content) = rest
        .split_once(DELIMITER)
        .ok_or(Malformed::MissingDelimiter)?;

    if handle.is_empty() {
        return Err(Malformed::EmptyReceiptHandle);
    }

    Ok(Message::with_visibility(
        ReceiptHandle::new(handle),
        decode_visibility(visibility)?,
        content.to_owned(),
    ))
}

fn decode_visibility(field: &str) -> Result<Visibility, Malformed> {
    let invalid = || Malformed::InvalidVisibility(field.to_owned());

    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let millis: i64 = field.parse().map_err(|_| invalid())?;
    if millis == 0 {
        return Ok(Visibility::Visible);
    }
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(Visibility::InvisibleUntil)
        .ok_or_else(invalid)
}
