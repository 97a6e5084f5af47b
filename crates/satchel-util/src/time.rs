//! Time utilities for satchel
//!
//! Provides monotonic time (for deadline and grace-window enforcement) and
//! wall-clock time (for human-facing timestamps on observations and
//! snapshots). Correctness decisions never use the wall clock.

use chrono::{DateTime, Local};
use std::time::Duration;
use tokio::time::Instant;

/// Get the current local time for display and record-keeping.
pub fn now() -> DateTime<Local> {
    Local::now()
}

/// Represents a point in monotonic time for deadline enforcement.
/// Immune to wall-clock changes; backed by the tokio clock so paused-time
/// tests control it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MonotonicInstant(Instant);

impl MonotonicInstant {
    pub fn now() -> Self {
        Self(Instant::now())
    }

    pub fn elapsed(&self) -> Duration {
        self.0.elapsed()
    }

    pub fn duration_since(&self, earlier: MonotonicInstant) -> Duration {
        self.0.duration_since(earlier.0)
    }

    pub fn checked_add(&self, duration: Duration) -> Option<MonotonicInstant> {
        self.0.checked_add(duration).map(MonotonicInstant)
    }

    /// Returns duration until `self`, or zero if `self` is in the past
    pub fn saturating_duration_until(&self, from: MonotonicInstant) -> Duration {
        if self.0 > from.0 {
            self.0.duration_since(from.0)
        } else {
            Duration::ZERO
        }
    }

    /// The underlying tokio instant, for sleep_until
    pub fn into_instant(self) -> Instant {
        self.0
    }
}

impl From<Instant> for MonotonicInstant {
    fn from(instant: Instant) -> Self {
        Self(instant)
    }
}

impl std::ops::Add<Duration> for MonotonicInstant {
    type Output = MonotonicInstant;

    fn add(self, rhs: Duration) -> Self::Output {
        MonotonicInstant(self.0 + rhs)
    }
}

/// Helper to format durations in human-readable form
pub fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(Duration::from_secs(3661)), "1h 1m 1s");
    }

    #[tokio::test(start_paused = true)]
    async fn test_monotonic_instant_ordering() {
        let t1 = MonotonicInstant::now();
        tokio::time::advance(Duration::from_millis(10)).await;
        let t2 = MonotonicInstant::now();

        assert!(t2 > t1);
        assert_eq!(t2.duration_since(t1), Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_saturating_duration_until() {
        let t1 = MonotonicInstant::now();
        let deadline = t1 + Duration::from_secs(30);

        assert_eq!(
            deadline.saturating_duration_until(t1),
            Duration::from_secs(30)
        );
        // A past deadline saturates to zero
        assert_eq!(t1.saturating_duration_until(deadline), Duration::ZERO);
    }

    #[test]
    fn test_now_returns_time() {
        let t = now();
        assert!(t.year() >= 2020);
        assert!(t.year() <= 2100);
    }
}
