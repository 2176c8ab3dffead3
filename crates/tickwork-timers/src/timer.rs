//! Timer state machine
//!
//! A timer accumulates elapsed time and fires once per `interval`, after an
//! optional initial `delay`. The first tick after creation only initializes
//! the timer; it never fires, even with zero interval and delay.

use serde::{Deserialize, Serialize};
use std::ops::ControlFlow;
use std::time::Duration;

/// How many times a timer fires after its first firing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Repeat {
    /// Fire until unscheduled
    Forever,
    /// Fire `n + 1` times in total, then remove the timer
    Times(u32),
}

impl Repeat {
    /// Fire exactly once
    pub const ONCE: Repeat = Repeat::Times(0);
}

/// Result of advancing a timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// The timer stays scheduled
    Pending,
    /// The repeat count is used up; the timer must be removed
    Exhausted,
    /// The trigger asked to stop for this tick
    Interrupted,
}

/// Timing state of one timer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timer {
    interval: Duration,
    delay: Duration,
    repeat: Repeat,
    /// `None` until the first tick
    elapsed: Option<Duration>,
    times_executed: u32,
    using_delay: bool,
}

impl Timer {
    /// Create a timer. A zero interval fires once per tick.
    pub fn new(interval: Duration, repeat: Repeat, delay: Duration) -> Self {
        Self {
            interval,
            delay,
            repeat,
            elapsed: None,
            times_executed: 0,
            using_delay: !delay.is_zero(),
        }
    }

    /// Get the firing interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Change the firing interval; accumulated state is kept
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    /// Get the initial delay
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Get the repeat setting
    pub fn repeat(&self) -> Repeat {
        self.repeat
    }

    /// Get the time accumulated since the last firing, `None` before the first tick
    pub fn elapsed(&self) -> Option<Duration> {
        self.elapsed
    }

    /// Get the number of times the timer fired
    pub fn times_executed(&self) -> u32 {
        self.times_executed
    }

    fn exhausted(&self) -> bool {
        match self.repeat {
            Repeat::Forever => false,
            Repeat::Times(n) => self.times_executed > n,
        }
    }

    /// Advance by `dt`, calling `trigger` with the step length of each firing
    ///
    /// `trigger` returns `ControlFlow::Break` to stop firing for this tick,
    /// e.g. when the timer was unscheduled by the callback it ran.
    pub fn advance(
        &mut self,
        dt: Duration,
        mut trigger: impl FnMut(Duration) -> ControlFlow<()>,
    ) -> Advance {
        let Some(elapsed) = self.elapsed else {
            self.elapsed = Some(Duration::ZERO);
            self.times_executed = 0;
            return Advance::Pending;
        };
        let mut elapsed = elapsed + dt;

        if self.using_delay {
            if elapsed < self.delay {
                self.elapsed = Some(elapsed);
                return Advance::Pending;
            }

            let flow = trigger(self.delay);
            elapsed -= self.delay;
            self.times_executed += 1;
            self.using_delay = false;
            self.elapsed = Some(elapsed);

            if self.exhausted() {
                return Advance::Exhausted;
            }
            if flow.is_break() {
                return Advance::Interrupted;
            }
        }

        let step = if self.interval.is_zero() {
            elapsed
        } else {
            self.interval
        };

        while elapsed >= step {
            let flow = trigger(step);
            elapsed -= step;
            self.times_executed += 1;
            self.elapsed = Some(elapsed);

            if self.exhausted() {
                return Advance::Exhausted;
            }
            if flow.is_break() {
                return Advance::Interrupted;
            }
            if elapsed.is_zero() {
                break;
            }
        }

        self.elapsed = Some(elapsed);
        Advance::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    /// Advance and collect the step lengths that fired
    fn tick(timer: &mut Timer, dt: Duration) -> (Vec<Duration>, Advance) {
        let mut fired = Vec::new();
        let outcome = timer.advance(dt, |step| {
            fired.push(step);
            ControlFlow::Continue(())
        });
        (fired, outcome)
    }

    #[test]
    fn test_first_tick_only_initializes() {
        let mut timer = Timer::new(ms(100), Repeat::Forever, Duration::ZERO);
        assert_eq!(timer.elapsed(), None);

        let (fired, outcome) = tick(&mut timer, ms(100));
        assert!(fired.is_empty(), "first tick must not fire");
        assert_eq!(outcome, Advance::Pending);
        assert_eq!(timer.elapsed(), Some(Duration::ZERO));
    }

    #[test]
    fn test_zero_interval_first_tick_still_silent() {
        let mut timer = Timer::new(Duration::ZERO, Repeat::Forever, Duration::ZERO);
        let (fired, _) = tick(&mut timer, ms(16));
        assert!(fired.is_empty());

        let (fired, _) = tick(&mut timer, ms(16));
        assert_eq!(fired, vec![ms(16)], "zero interval fires once per tick");
    }

    #[test]
    fn test_interval_firing_and_remainder() {
        let mut timer = Timer::new(ms(100), Repeat::Forever, Duration::ZERO);
        tick(&mut timer, ms(100));

        let (fired, _) = tick(&mut timer, ms(100));
        assert_eq!(fired.len(), 1);

        let (fired, outcome) = tick(&mut timer, ms(250));
        assert_eq!(fired, vec![ms(100), ms(100)]);
        assert_eq!(outcome, Advance::Pending);
        assert_eq!(timer.elapsed(), Some(ms(50)));
        assert_eq!(timer.times_executed(), 3);
    }

    #[test]
    fn test_repeat_fires_repeat_plus_one() {
        let mut timer = Timer::new(ms(10), Repeat::Times(2), Duration::ZERO);
        tick(&mut timer, ms(10));

        let mut total = 0;
        let mut outcome = Advance::Pending;
        for _ in 0..10 {
            let (fired, result) = tick(&mut timer, ms(10));
            total += fired.len();
            outcome = result;
            if outcome == Advance::Exhausted {
                break;
            }
        }
        assert_eq!(total, 3);
        assert_eq!(outcome, Advance::Exhausted);
    }

    #[test]
    fn test_exhaustion_stops_catch_up() {
        let mut timer = Timer::new(ms(10), Repeat::ONCE, Duration::ZERO);
        tick(&mut timer, ms(0));

        let (fired, outcome) = tick(&mut timer, ms(100));
        assert_eq!(fired.len(), 1, "a large dt must not overshoot the repeat count");
        assert_eq!(outcome, Advance::Exhausted);
    }

    #[test]
    fn test_delay_then_interval() {
        let mut timer = Timer::new(ms(100), Repeat::Forever, ms(300));
        tick(&mut timer, ms(0));

        let (fired, _) = tick(&mut timer, ms(200));
        assert!(fired.is_empty());

        let (fired, _) = tick(&mut timer, ms(150));
        assert_eq!(fired, vec![ms(300)], "delay fires with the delay as step");
        assert_eq!(timer.elapsed(), Some(ms(50)));

        let (fired, _) = tick(&mut timer, ms(50));
        assert_eq!(fired, vec![ms(100)]);
    }

    #[test]
    fn test_delay_counts_toward_repeat() {
        let mut timer = Timer::new(ms(10), Repeat::ONCE, ms(5));
        tick(&mut timer, ms(0));

        let (fired, outcome) = tick(&mut timer, ms(5));
        assert_eq!(fired, vec![ms(5)]);
        assert_eq!(outcome, Advance::Exhausted);
    }

    #[test]
    fn test_break_interrupts_catch_up() {
        let mut timer = Timer::new(ms(10), Repeat::Forever, Duration::ZERO);
        tick(&mut timer, ms(0));

        let mut calls = 0;
        let outcome = timer.advance(ms(50), |_| {
            calls += 1;
            ControlFlow::Break(())
        });
        assert_eq!(calls, 1);
        assert_eq!(outcome, Advance::Interrupted);
    }

    #[test]
    fn test_set_interval_keeps_progress() {
        let mut timer = Timer::new(ms(100), Repeat::Forever, Duration::ZERO);
        tick(&mut timer, ms(0));
        tick(&mut timer, ms(130));
        assert_eq!(timer.times_executed(), 1);
        assert_eq!(timer.elapsed(), Some(ms(30)));

        timer.set_interval(ms(40));
        assert_eq!(timer.times_executed(), 1);
        let (fired, _) = tick(&mut timer, ms(10));
        assert_eq!(fired, vec![ms(40)]);
    }
}
