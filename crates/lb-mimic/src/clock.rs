//! Time source for lifecycle aging

use chrono::{DateTime, Duration, Utc};
use std::fmt::Debug;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Source of the current time
pub trait Clock: Send + Sync + Debug {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock
///
/// Time only moves when [`ManualClock::advance`] is called, so tests can
/// step a load balancer through its timers without sleeping.
#[derive(Debug, Clone)]
pub struct ManualClock {
    current_time_ms: Arc<AtomicI64>,
}

impl ManualClock {
    /// Create a new clock starting at the given time
    pub fn new(start_time: DateTime<Utc>) -> Self {
        Self {
            current_time_ms: Arc::new(AtomicI64::new(start_time.timestamp_millis())),
        }
    }

    /// Advance time by the given duration
    pub fn advance(&self, duration: Duration) {
        debug_assert!(duration >= Duration::zero(), "cannot go back in time");
        self.current_time_ms
            .fetch_add(duration.num_milliseconds(), Ordering::SeqCst);
    }

    /// Advance time by whole seconds
    pub fn advance_secs(&self, secs: i64) {
        self.advance(Duration::seconds(secs));
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        // 2024-01-01T00:00:00Z
        Self {
            current_time_ms: Arc::new(AtomicI64::new(1_704_067_200_000)),
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let ms = self.current_time_ms.load(Ordering::SeqCst);
        DateTime::from_timestamp_millis(ms).unwrap_or(DateTime::UNIX_EPOCH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::default();
        let initial = clock.now();

        clock.advance_secs(10);
        assert_eq!(clock.now() - initial, Duration::seconds(10));

        clock.advance(Duration::milliseconds(500));
        assert_eq!(clock.now() - initial, Duration::milliseconds(10_500));
    }

    #[test]
    fn test_manual_clock_shared() {
        let clock = ManualClock::default();
        let other = clock.clone();
        other.advance_secs(3600);
        assert_eq!(clock.now(), other.now());
    }
}
