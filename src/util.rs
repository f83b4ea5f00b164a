use std::time::{Duration, Instant};

/// Fixed-period pacing for a polling loop. The period runs from the end of
/// the previous tick, so a late tick never causes a burst of catch-up ticks.
pub struct Interval {
    next_tick: Instant,
    period: Duration,
}

impl Interval {
    pub fn new(period: Duration) -> Self {
        Self {
            next_tick: Instant::now() + period,
            period,
        }
    }

    /// Time left until the next tick; zero when it is due.
    pub fn remaining(&self) -> Duration {
        self.next_tick.saturating_duration_since(Instant::now())
    }

    /// Sleeps until the next tick, in slices of at most `step` so that
    /// `cancelled` is polled regularly. Returns `false` if cancelled first.
    pub fn tick(&mut self, step: Duration, cancelled: impl Fn() -> bool) -> bool {
        loop {
            if cancelled() {
                return false;
            }

            let remaining = self.remaining();
            if remaining.is_zero() {
                break;
            }

            std::thread::sleep(remaining.min(step));
        }

        self.next_tick = Instant::now() + self.period;
        true
    }
}
