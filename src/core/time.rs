//! Millisecond timestamps for access tracking.
//!
//! The access tracker orders observations by wall-clock milliseconds rather
//! than `Instant` so that records are comparable across workers, cheap to
//! serialize into stats reports, and easy to fabricate in tests.

use serde::{Deserialize, Serialize};

/// A millisecond wall-clock timestamp.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Timestamp {
    /// Milliseconds since the Unix epoch.
    pub ms: u64,
}

impl Timestamp {
    /// Create a timestamp from a millisecond value.
    pub const fn from_ms(ms: u64) -> Self {
        Self { ms }
    }

    /// Sample the current wall clock.
    pub fn now() -> Self {
        let ms = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Self { ms }
    }

    /// The start of a lookback window of `window_ms` ending at this
    /// timestamp, saturating at zero.
    pub const fn window_start(self, window_ms: u64) -> Self {
        Self {
            ms: self.ms.saturating_sub(window_ms),
        }
    }

    /// Add milliseconds.
    pub const fn add_ms(self, ms: u64) -> Self {
        Self { ms: self.ms + ms }
    }

    /// Check whether this timestamp falls at or after `other`.
    pub const fn is_at_or_after(self, other: Timestamp) -> bool {
        self.ms >= other.ms
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ms", self.ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_start_saturates() {
        assert_eq!(Timestamp::from_ms(100).window_start(40).ms, 60);
        assert_eq!(Timestamp::from_ms(10).window_start(40).ms, 0);
    }

    #[test]
    fn ordering_is_by_ms() {
        assert!(Timestamp::from_ms(5) < Timestamp::from_ms(6));
        assert!(Timestamp::from_ms(6).is_at_or_after(Timestamp::from_ms(6)));
    }
}
