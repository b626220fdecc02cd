//! Rest countdown between sets.
//!
//! Remaining time is always derived from the start instant minus time spent
//! paused, never by subtracting one per tick, so late or dropped ticks do not
//! make the countdown drift.

pub mod controller;

pub use controller::{RestTimerController, TickHandle, TimerEvent};

use std::time::{Duration, Instant};

use crate::model::SetRef;

#[derive(Debug, Clone, PartialEq)]
pub struct RestTimer {
    pub exercise_id: String,
    pub set_id: String,
    pub remaining_seconds: u32,
    pub total_seconds: u32,
    pub is_paused: bool,
    started_at: Instant,
    paused_at: Option<Instant>,
    paused_for: Duration,
    /// Remaining seconds at zero active elapsed time; shifted by manual adjustments
    base_seconds: u64,
}

impl RestTimer {
    pub fn start(set: SetRef, seconds: u32, now: Instant) -> Self {
        Self {
            exercise_id: set.exercise_id,
            set_id: set.set_id,
            remaining_seconds: seconds,
            total_seconds: seconds,
            is_paused: false,
            started_at: now,
            paused_at: None,
            paused_for: Duration::ZERO,
            base_seconds: u64::from(seconds),
        }
    }

    pub fn set_ref(&self) -> SetRef {
        SetRef::new(self.exercise_id.clone(), self.set_id.clone())
    }

    pub fn refers_to(&self, set: &SetRef) -> bool {
        self.exercise_id == set.exercise_id && self.set_id == set.set_id
    }

    /// Wall-clock time spent running, excluding pauses
    fn active_elapsed(&self, now: Instant) -> Duration {
        let end = self.paused_at.unwrap_or(now);
        end.saturating_duration_since(self.started_at)
            .saturating_sub(self.paused_for)
    }

    /// Whole seconds left at `now`; frozen while paused
    pub fn remaining_at(&self, now: Instant) -> u32 {
        let elapsed = self.active_elapsed(now).as_secs();
        u32::try_from(self.base_seconds.saturating_sub(elapsed)).unwrap_or(u32::MAX)
    }

    /// Continuous 0..=1 progress for smooth indicators, independent of ticks
    pub fn progress(&self, now: Instant) -> f64 {
        if self.total_seconds == 0 {
            return 1.0;
        }
        let remaining = self.base_seconds as f64 - self.active_elapsed(now).as_secs_f64();
        (1.0 - remaining / f64::from(self.total_seconds)).clamp(0.0, 1.0)
    }

    /// Refreshes the displayed seconds. None once the countdown reaches zero.
    pub fn tick(&self, now: Instant) -> Option<RestTimer> {
        if self.is_paused {
            return Some(self.clone());
        }
        match self.remaining_at(now) {
            0 => None,
            remaining => Some(RestTimer {
                remaining_seconds: remaining,
                ..self.clone()
            }),
        }
    }

    pub fn pause(&self, now: Instant) -> RestTimer {
        if self.is_paused {
            return self.clone();
        }
        RestTimer {
            remaining_seconds: self.remaining_at(now),
            is_paused: true,
            paused_at: Some(now),
            ..self.clone()
        }
    }

    pub fn resume(&self, now: Instant) -> RestTimer {
        let Some(paused_at) = self.paused_at else {
            return self.clone();
        };
        RestTimer {
            is_paused: false,
            paused_at: None,
            paused_for: self.paused_for + now.saturating_duration_since(paused_at),
            ..self.clone()
        }
    }

    /// Adds or removes seconds. Additions grow the total as well so progress
    /// stays proportional; removals never leave less than one second.
    pub fn adjust(&self, delta_seconds: i32, now: Instant) -> RestTimer {
        let current = self.remaining_at(now);
        let step = delta_seconds.unsigned_abs();
        let (remaining, total) = if delta_seconds >= 0 {
            (
                current.saturating_add(step),
                self.total_seconds.saturating_add(step),
            )
        } else {
            (current.saturating_sub(step).max(1), self.total_seconds)
        };
        let elapsed = self.active_elapsed(now).as_secs();
        RestTimer {
            remaining_seconds: remaining,
            total_seconds: total,
            base_seconds: u64::from(remaining) + elapsed,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn timer(seconds: u32, now: Instant) -> RestTimer {
        RestTimer::start(SetRef::new("ex", "s1"), seconds, now)
    }

    #[test]
    fn test_counts_down_to_zero_at_total() {
        let t0 = Instant::now();
        let t = timer(3, t0);
        let mut last = t.remaining_seconds;
        for ms in (0..3000).step_by(250) {
            let r = t.tick(t0 + Duration::from_millis(ms)).unwrap().remaining_seconds;
            assert!(r <= last);
            last = r;
        }
        assert_eq!(last, 1);
        assert_eq!(t.tick(t0 + secs(3)), None);
    }

    #[test]
    fn test_late_ticks_do_not_drift() {
        let t0 = Instant::now();
        let t = timer(60, t0);
        // a single tick arriving very late still reports wall-clock remaining
        let t = t.tick(t0 + Duration::from_millis(10_700)).unwrap();
        assert_eq!(t.remaining_seconds, 50);
    }

    #[test]
    fn test_pause_preserves_remaining() {
        let t0 = Instant::now();
        let t = timer(90, t0).pause(t0 + secs(30));
        assert!(t.is_paused);
        assert_eq!(t.remaining_seconds, 60);
        // ticks while paused change nothing, however long the pause
        let t = t.tick(t0 + secs(500)).unwrap();
        assert_eq!(t.remaining_seconds, 60);
        let t = t.resume(t0 + secs(600));
        assert_eq!(t.tick(t0 + secs(600)).unwrap().remaining_seconds, 60);
        assert_eq!(t.tick(t0 + secs(610)).unwrap().remaining_seconds, 50);
        assert_eq!(t.tick(t0 + secs(660)), None);
    }

    #[test]
    fn test_repeated_pauses_accumulate() {
        let t0 = Instant::now();
        let t = timer(100, t0)
            .pause(t0 + secs(10))
            .resume(t0 + secs(20))
            .pause(t0 + secs(30))
            .resume(t0 + secs(50));
        assert_eq!(t.remaining_at(t0 + secs(50)), 80);
    }

    #[test]
    fn test_adjust_add_extends_total() {
        let t0 = Instant::now();
        let t = timer(60, t0).adjust(15, t0 + secs(10));
        assert_eq!(t.remaining_seconds, 65);
        assert_eq!(t.total_seconds, 75);
        assert_eq!(t.tick(t0 + secs(20)).unwrap().remaining_seconds, 55);
    }

    #[test]
    fn test_adjust_subtract_clamps_to_one() {
        let t0 = Instant::now();
        let t = timer(30, t0).adjust(-100, t0 + secs(5));
        assert_eq!(t.remaining_seconds, 1);
        assert_eq!(t.total_seconds, 30);
        assert!(t.tick(t0 + Duration::from_millis(5_500)).is_some());
        assert_eq!(t.tick(t0 + secs(6)), None);
    }

    #[test]
    fn test_adjust_while_paused() {
        let t0 = Instant::now();
        let t = timer(60, t0).pause(t0 + secs(20)).adjust(-10, t0 + secs(40));
        assert_eq!(t.remaining_seconds, 30);
        let t = t.resume(t0 + secs(50));
        assert_eq!(t.tick(t0 + secs(55)).unwrap().remaining_seconds, 25);
    }

    #[test]
    fn test_progress_is_continuous() {
        let t0 = Instant::now();
        let t = timer(10, t0);
        assert_eq!(t.progress(t0), 0.0);
        assert!((t.progress(t0 + Duration::from_millis(2_500)) - 0.25).abs() < 1e-9);
        assert_eq!(t.progress(t0 + secs(20)), 1.0);
    }
}
