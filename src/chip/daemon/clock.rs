use std::convert::TryFrom;
use std::time::{Duration, Instant};

use crate::chip::chip8::constants::CHIP8_TIMER_FREQUENCY;

/// Counts the whole timer periods (1/60 s) that passed since it was last read.
#[derive(Debug, Clone, Copy)]
pub(super) struct TimerClock {
    reference: Instant,
    period: Duration,
}

impl TimerClock {
    pub(super) fn new(now: Instant) -> Self {
        TimerClock {
            reference: now,
            period: Duration::from_nanos(1_000_000_000 / u64::from(CHIP8_TIMER_FREQUENCY)),
        }
    }

    /// Returns the number of whole periods elapsed until `now` and moves the
    /// reference point forward by that many periods.
    pub(super) fn elapsed_ticks(&mut self, now: Instant) -> u32 {
        let elapsed = now.saturating_duration_since(self.reference);
        let ticks = elapsed.as_nanos() / self.period.as_nanos();
        if ticks == 0 {
            return 0;
        }

        match u32::try_from(ticks) {
            Ok(ticks) => {
                self.reference += self.period * ticks;
                ticks
            }
            Err(_) => {
                self.reference = now;
                u32::MAX
            }
        }
    }

    /// The instant at which the next period completes.
    pub(super) fn next_tick(&self) -> Instant {
        self.reference + self.period
    }

    /// Starts counting from `now`, discarding any partial period.
    pub(super) fn restart(&mut self, now: Instant) {
        self.reference = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_tick_before_period() {
        let start = Instant::now();
        let mut clock = TimerClock::new(start);
        assert_eq!(clock.elapsed_ticks(start + Duration::from_millis(10)), 0);
        assert_eq!(clock.elapsed_ticks(start + Duration::from_millis(16)), 0);
    }

    #[test]
    fn test_whole_ticks_are_counted() {
        let start = Instant::now();
        let mut clock = TimerClock::new(start);
        assert_eq!(clock.elapsed_ticks(start + Duration::from_millis(17)), 1);
        assert_eq!(clock.elapsed_ticks(start + Duration::from_millis(20)), 0);
        assert_eq!(clock.elapsed_ticks(start + Duration::from_millis(1000)), 59);
    }

    #[test]
    fn test_partial_periods_accumulate() {
        let start = Instant::now();
        let mut clock = TimerClock::new(start);
        assert_eq!(clock.elapsed_ticks(start + Duration::from_millis(10)), 0);
        assert_eq!(clock.elapsed_ticks(start + Duration::from_millis(20)), 1);
        assert_eq!(clock.elapsed_ticks(start + Duration::from_millis(30)), 0);
        assert_eq!(clock.elapsed_ticks(start + Duration::from_millis(34)), 1);
    }

    #[test]
    fn test_instants_before_reference() {
        let start = Instant::now();
        let mut clock = TimerClock::new(start + Duration::from_secs(1));
        assert_eq!(clock.elapsed_ticks(start), 0);
    }

    #[test]
    fn test_restart_discards_elapsed_time() {
        let start = Instant::now();
        let mut clock = TimerClock::new(start);
        clock.restart(start + Duration::from_secs(10));
        assert_eq!(clock.elapsed_ticks(start + Duration::from_secs(10)), 0);
        assert_eq!(
            clock.next_tick(),
            start + Duration::from_secs(10) + Duration::from_nanos(16_666_666)
        );
    }
}
