//! Virtual control clock and tickers.
//!
//! Bruma never uses wall-clock timers. All control-plane scheduling —
//! watchdog sampling, grain lookahead, moment advancement, macro
//! parameter drift — runs on a monotonic f64 seconds value derived from
//! the audio sample counter. A [`Ticker`] fires when that clock passes
//! its due time, which makes every time-dependent behavior exactly
//! reproducible in tests: render blocks, and time passes.

use rand::Rng;

/// Fixed-interval ticker.
///
/// `fire(now)` returns true at most once per call, then re-arms relative
/// to its own schedule (not to `now`), so a late poll does not drift the
/// period. If the clock jumped past several periods, intermediate firings
/// collapse into one — control ticks are rate limits, not event counts.
#[derive(Debug, Clone)]
pub struct Ticker {
    interval: f64,
    next_due: f64,
}

impl Ticker {
    /// Create a ticker that first fires one interval after `now`.
    pub fn new(interval: f64, now: f64) -> Self {
        Self {
            interval: interval.max(1e-4),
            next_due: now + interval,
        }
    }

    /// Create a ticker that fires immediately on the next poll.
    pub fn due_now(interval: f64, now: f64) -> Self {
        Self {
            interval: interval.max(1e-4),
            next_due: now,
        }
    }

    /// Poll the ticker. Returns true if the interval has elapsed.
    pub fn fire(&mut self, now: f64) -> bool {
        if now < self.next_due {
            return false;
        }
        // skip any periods the clock already passed
        while self.next_due <= now {
            self.next_due += self.interval;
        }
        true
    }

    /// The configured interval in seconds.
    pub fn interval(&self) -> f64 {
        self.interval
    }
}

/// Ticker with a randomized interval, re-drawn after every firing.
///
/// Used for schedules that must stay unpredictable: macro-sequencer
/// steps (60-300 s), ghost windows, oracle recasts.
#[derive(Debug, Clone)]
pub struct RandomTicker {
    min: f64,
    max: f64,
    next_due: f64,
}

impl RandomTicker {
    /// Create with an interval drawn from `[min, max]` seconds.
    pub fn new<R: Rng>(min: f64, max: f64, now: f64, rng: &mut R) -> Self {
        let mut ticker = Self {
            min: min.max(1e-4),
            max: max.max(min.max(1e-4)),
            next_due: 0.0,
        };
        ticker.next_due = now + ticker.draw(rng);
        ticker
    }

    /// Poll the ticker; on firing, the next interval is re-drawn.
    pub fn fire<R: Rng>(&mut self, now: f64, rng: &mut R) -> bool {
        if now < self.next_due {
            return false;
        }
        self.next_due = now + self.draw(rng);
        true
    }

    /// Seconds until the next firing.
    pub fn remaining(&self, now: f64) -> f64 {
        (self.next_due - now).max(0.0)
    }

    fn draw<R: Rng>(&self, rng: &mut R) -> f64 {
        if self.max > self.min {
            rng.gen_range(self.min..self.max)
        } else {
            self.min
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn ticker_fires_on_schedule() {
        let mut t = Ticker::new(0.12, 0.0);
        assert!(!t.fire(0.05));
        assert!(!t.fire(0.119));
        assert!(t.fire(0.12));
        assert!(!t.fire(0.13));
        assert!(t.fire(0.24));
    }

    #[test]
    fn ticker_does_not_drift_on_late_polls() {
        let mut t = Ticker::new(0.1, 0.0);
        assert!(t.fire(0.105)); // late poll
        // next due is 0.2, not 0.205
        assert!(!t.fire(0.19));
        assert!(t.fire(0.2));
    }

    #[test]
    fn ticker_collapses_missed_periods() {
        let mut t = Ticker::new(0.1, 0.0);
        assert!(t.fire(1.0)); // ten periods passed, one firing
        assert!(!t.fire(1.05));
        assert!(t.fire(1.1));
    }

    #[test]
    fn due_now_fires_immediately() {
        let mut t = Ticker::due_now(0.5, 10.0);
        assert!(t.fire(10.0));
        assert!(!t.fire(10.4));
    }

    #[test]
    fn random_ticker_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut t = RandomTicker::new(1.0, 2.0, 0.0, &mut rng);
        let mut now = 0.0;
        for _ in 0..50 {
            let before = t.remaining(now);
            assert!(before <= 2.0 + 1e-9);
            now += before + 1e-6;
            assert!(t.fire(now, &mut rng));
        }
    }

    #[test]
    fn random_ticker_degenerate_range() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut t = RandomTicker::new(0.5, 0.5, 0.0, &mut rng);
        assert!(!t.fire(0.4, &mut rng));
        assert!(t.fire(0.5, &mut rng));
    }
}
