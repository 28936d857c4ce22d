//! Minimum spacing between consecutive requests from one client.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// A ticking gate that lets one request through per tick.
///
/// The first request through a fresh gate never waits. Every later request
/// waits for the next tick of a ticker anchored at the gate's creation. Missed
/// ticks collapse into a single pending tick, so a request that follows a slow
/// one goes out immediately and the gate falls back onto its schedule.
///
/// A gate without an interval is a no-op.
#[derive(Debug)]
pub struct PacingGate {
    interval: Option<Duration>,
    origin: Instant,
    first_request: AtomicBool,
    ticker: Mutex<Option<Interval>>,
}

impl PacingGate {
    /// Creates a gate. `Duration::ZERO` means unthrottled.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: (!interval.is_zero()).then_some(interval),
            origin: Instant::now(),
            first_request: AtomicBool::new(true),
            ticker: Mutex::new(None),
        }
    }

    /// A gate that never waits.
    pub fn unthrottled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// The configured interval, if any.
    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Waits until the next request may be sent.
    pub async fn wait(&self) {
        if self.first_request.swap(false, Ordering::SeqCst) {
            return;
        }
        let Some(period) = self.interval else {
            return;
        };

        let mut ticker = self.ticker.lock().await;
        // Built lazily: the tokio timer is only available inside a runtime.
        let ticker = ticker.get_or_insert_with(|| {
            let mut ticker = tokio::time::interval_at(self.origin + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker
        });
        ticker.tick().await;
    }
}

impl Default for PacingGate {
    fn default() -> Self {
        Self::unthrottled()
    }
}
