//! Fixed-period cycle timing

use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Shortest period tokio's interval accepts
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Ticks once immediately, then every `period`.
///
/// A cycle that overruns its period pushes the following ticks back rather
/// than firing a burst of catch-up cycles.
pub struct CycleSchedule {
    interval: Interval,
    period: Duration,
}

impl CycleSchedule {
    pub fn new(period: Duration) -> Self {
        let period = period.max(MIN_PERIOD);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self { interval, period }
    }

    /// Wait for the next cycle to start
    pub async fn tick(&mut self) -> Instant {
        self.interval.tick().await
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}
