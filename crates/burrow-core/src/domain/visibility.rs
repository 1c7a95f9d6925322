//! Visibility state of a stored message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Visibility of a message record.
///
/// State transitions:
/// - Visible -> InvisibleUntil(t)   (pull claims the message)
/// - InvisibleUntil(t) -> Visible   (refresh, once `t` has passed)
/// - InvisibleUntil(t) -> removed   (delete)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Visibility {
    /// Can be claimed by the next pull.
    Visible,

    /// Claimed; hidden from pulls until the instant passes and a refresh runs.
    InvisibleUntil(DateTime<Utc>),
}

impl Visibility {
    pub fn is_visible(self) -> bool {
        matches!(self, Visibility::Visible)
    }

    /// Is this message claimed (eligible for delete)?
    pub fn is_in_flight(self) -> bool {
        matches!(self, Visibility::InvisibleUntil(_))
    }

    /// Has the claim lapsed at `now`?
    pub fn is_expired_at(self, now: DateTime<Utc>) -> bool {
        match self {
            Visibility::Visible => false,
            Visibility::InvisibleUntil(until) => until < now,
        }
    }

    pub fn visible_at(self) -> Option<DateTime<Utc>> {
        match self {
            Visibility::Visible => None,
            Visibility::InvisibleUntil(until) => Some(until),
        }
    }
}

impl From<Option<DateTime<Utc>>> for Visibility {
    fn from(value: Option<DateTime<Utc>>) -> Self {
        match value {
            None => Visibility::Visible,
            Some(until) => Visibility::InvisibleUntil(until),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};

    #[test]
    fn expiry_is_strictly_after_deadline() {
        let deadline = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let state = Visibility::InvisibleUntil(deadline);

        assert!(!state.is_expired_at(deadline - TimeDelta::seconds(1)));
        assert!(!state.is_expired_at(deadline));
        assert!(state.is_expired_at(deadline + TimeDelta::milliseconds(1)));
    }

    #[test]
    fn visible_never_expires() {
        let now = Utc::now();
        assert!(!Visibility::Visible.is_expired_at(now));
        assert!(Visibility::Visible.is_visible());
        assert!(!Visibility::Visible.is_in_flight());
    }
}
