//! Visibility policy: bounds and defaults for the visibility timeout.

use chrono::{DateTime, TimeDelta, Utc};

use crate::ports::Clock;

/// Visibility timeout bounds (seconds).
///
/// Matches the managed-queue limits: 0s .. 12h, 30s when unspecified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityPolicy {
    pub min_timeout_secs: i64,
    pub default_timeout_secs: i64,
    pub max_timeout_secs: i64,
}

impl VisibilityPolicy {
    pub const MIN_TIMEOUT_SECS: i64 = 0;
    pub const DEFAULT_TIMEOUT_SECS: i64 = 30;
    pub const MAX_TIMEOUT_SECS: i64 = 43_200;

    pub const fn standard() -> Self {
        Self {
            min_timeout_secs: Self::MIN_TIMEOUT_SECS,
            default_timeout_secs: Self::DEFAULT_TIMEOUT_SECS,
            max_timeout_secs: Self::MAX_TIMEOUT_SECS,
        }
    }

    /// Resolve the effective timeout for a pull.
    ///
    /// A value inside `[min, max]` is used as is. `None` and any value outside
    /// the range fall back to the default; out-of-range values are not
    /// saturated to the nearest bound.
    pub fn clamp(&self, timeout_secs: Option<i64>) -> i64 {
        match timeout_secs {
            Some(secs) if (self.min_timeout_secs..=self.max_timeout_secs).contains(&secs) => secs,
            _ => self.default_timeout_secs,
        }
    }

    /// Absolute instant `timeout_secs` after the clock's current time.
    pub fn expiry_from_now(&self, clock: &dyn Clock, timeout_secs: i64) -> DateTime<Utc> {
        clock.now() + TimeDelta::seconds(timeout_secs)
    }
}

impl Default for VisibilityPolicy {
    fn default() -> Self {
        Self::standard()
    }
}
