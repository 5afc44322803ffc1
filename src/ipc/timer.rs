//! Cancellable repeating timer driven by an external clock.
//!
//! The timer never spawns anything: whoever owns it asks `take_due(now)` from
//! its own loop. Ticks follow a fixed grid anchored at `arm`. A tick arriving
//! within the tolerance keeps the grid; a later one skips every missed tick
//! and re-anchors the grid at `now`, so a stalled loop fires once, not in a
//! burst.

use std::time::{Duration, Instant};

use super::TIMER_TOLERANCE_PERCENT;

/// Shortest accepted interval
const MIN_INTERVAL: Duration = Duration::from_millis(1);
/// Longest accepted interval; keeps deadline arithmetic far from overflow
const MAX_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct RepeatingTimer {
    interval: Duration,
    tolerance: Duration,
    next_deadline: Option<Instant>,
}

impl RepeatingTimer {
    /// Create a disarmed timer. The interval is clamped to 1ms..=1 day.
    pub fn new(interval: Duration) -> Self {
        let interval = interval.clamp(MIN_INTERVAL, MAX_INTERVAL);
        Self {
            interval,
            tolerance: interval * TIMER_TOLERANCE_PERCENT / 100,
            next_deadline: None,
        }
    }

    /// Clamped tick interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Lateness still treated as on time
    pub fn tolerance(&self) -> Duration {
        self.tolerance
    }

    /// Whether a tick is scheduled
    pub fn is_armed(&self) -> bool {
        self.next_deadline.is_some()
    }

    /// Arm the timer so its first tick is due one interval after `now`
    pub fn arm(&mut self, now: Instant) {
        self.next_deadline = Some(now + self.interval);
    }

    /// Drop the scheduled tick. Safe to call when disarmed.
    pub fn cancel(&mut self) {
        self.next_deadline = None;
    }

    /// Returns true (at most once per grid slot) if a tick is due at `now`
    pub fn take_due(&mut self, now: Instant) -> bool {
        let Some(deadline) = self.next_deadline else {
            return false;
        };
        if now < deadline {
            return false;
        }

        let lateness = now - deadline;
        self.next_deadline = Some(if lateness <= self.tolerance {
            deadline + self.interval
        } else {
            tracing::debug!("Timer tick late by {:?}, skipping missed ticks", lateness);
            now + self.interval
        });
        true
    }

    /// Time left until the next tick, or None when disarmed
    pub fn time_until_next(&self, now: Instant) -> Option<Duration> {
        self.next_deadline
            .map(|deadline| deadline.saturating_duration_since(now))
    }
}
