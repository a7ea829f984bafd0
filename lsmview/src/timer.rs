//! Timer
//!
//! A single-slot deadline. Nothing fires on its own: the owner polls it from
//! its loop with the current `Instant`. Scheduling always replaces whatever
//! was pending, so there is never more than one outstanding deadline.

use std::time::{Duration, Instant};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Timer {
    deadline: Option<Instant>,
}

impl Timer {
    pub fn new() -> Timer {
        Timer { deadline: None }
    }

    /// Arm the timer to fire `delay` after `now`, replacing any pending deadline.
    pub fn schedule(&mut self, now: Instant, delay: Duration) {
        self.deadline = Some(now + delay);
    }

    /// Disarm the timer. Returns whether a deadline was pending.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns true, and disarms, if the deadline has been reached.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_at_deadline() {
        let start = Instant::now();
        let mut timer = Timer::new();
        timer.schedule(start, Duration::from_secs(3));

        assert!(!timer.fire(start + Duration::from_millis(2999)));
        assert!(timer.fire(start + Duration::from_secs(3)));
        assert!(!timer.fire(start + Duration::from_secs(10)));
        assert_eq!(timer.deadline(), None);
    }

    #[test]
    fn schedule_replaces_pending_deadline() {
        let start = Instant::now();
        let mut timer = Timer::new();
        timer.schedule(start, Duration::from_secs(3));
        timer.schedule(start + Duration::from_secs(2), Duration::from_secs(3));

        assert!(!timer.fire(start + Duration::from_secs(3)));
        assert!(timer.fire(start + Duration::from_secs(5)));
    }

    #[test]
    fn cancel_reports_pending() {
        let start = Instant::now();
        let mut timer = Timer::new();
        assert!(!timer.cancel());

        timer.schedule(start, Duration::from_secs(1));
        assert!(timer.cancel());
        assert!(!timer.fire(start + Duration::from_secs(5)));
    }
}
