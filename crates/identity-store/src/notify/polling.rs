//! Timer-driven change detection.

use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::config::DEFAULT_POLL_INTERVAL;
use crate::error::Result;

use super::{current_runtime, ChangeListener, ChangeSource};

/// Change source that fires on a fixed interval.
///
/// Used when the backend has no way to announce writes. The listener is
/// expected to re-read and compare, so spurious firings are harmless.
#[derive(Debug, Clone, Copy)]
pub struct PollingChangeSource {
    interval: Duration,
}

impl PollingChangeSource {
    /// Poll every `interval`. A zero interval is raised to one millisecond.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    /// The polling period.
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for PollingChangeSource {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl ChangeSource for PollingChangeSource {
    fn subscribe(&self, mut listener: ChangeListener) -> Result<()> {
        let runtime = current_runtime()?;
        let period = self.interval;

        runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                listener();
            }
        });

        Ok(())
    }
}
