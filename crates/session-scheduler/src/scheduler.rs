//! Ticker and cancellation token

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info};

/// Periods of the session's periodic tasks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CadenceConfig {
    /// Exam countdown period (milliseconds)
    pub timer_interval_ms: u64,
    /// Face detection period (milliseconds)
    pub detection_interval_ms: u64,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            timer_interval_ms: 1000,
            detection_interval_ms: 500,
        }
    }
}

impl CadenceConfig {
    pub fn timer_period(&self) -> Duration {
        Duration::from_millis(self.timer_interval_ms.max(1))
    }

    pub fn detection_period(&self) -> Duration {
        Duration::from_millis(self.detection_interval_ms.max(1))
    }
}

/// Shared cancellation flag. Cancelling is permanent.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once the token is cancelled
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this only returns on cancel
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Periodic ticker bound to a cancellation token
pub struct Ticker {
    name: &'static str,
    interval: Interval,
    cancel: CancelToken,
    fired: u64,
}

impl Ticker {
    /// First tick fires one `period` from now
    pub fn new(name: &'static str, period: Duration, cancel: &CancelToken) -> Self {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("Ticker '{}' scheduled every {:?}", name, period);
        Self {
            name,
            interval,
            cancel: cancel.clone(),
            fired: 0,
        }
    }

    /// Wait for the next tick; `None` once cancelled
    pub async fn tick(&mut self) -> Option<Instant> {
        if self.cancel.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!("Ticker '{}' cancelled after {} ticks", self.name, self.fired);
                None
            }
            at = self.interval.tick() => {
                self.fired += 1;
                Some(at)
            }
        }
    }

    pub fn fired(&self) -> u64 {
        self.fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_ticks_on_period() {
        let token = CancelToken::new();
        let mut ticker = Ticker::new("timer", Duration::from_secs(1), &token);
        let start = Instant::now();

        ticker.tick().await.unwrap();
        ticker.tick().await.unwrap();

        assert_eq!(ticker.fired(), 2);
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_ticker() {
        let token = CancelToken::new();
        let mut ticker = Ticker::new("detection", Duration::from_millis(500), &token);

        ticker.tick().await.unwrap();
        token.cancel();
        assert!(token.is_cancelled());
        assert!(ticker.tick().await.is_none());
        assert!(ticker.tick().await.is_none());
        assert_eq!(ticker.fired(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_wakes_pending_tick() {
        let token = CancelToken::new();
        let mut ticker = Ticker::new("timer", Duration::from_secs(60), &token);

        let canceller = token.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_secs(1)).await;
            canceller.cancel();
        });

        assert!(ticker.tick().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_handler_skips_missed_ticks() {
        let token = CancelToken::new();
        let mut ticker = Ticker::new("detection", Duration::from_millis(500), &token);

        ticker.tick().await.unwrap();
        // A handler that overruns three periods
        time::sleep(Duration::from_millis(1600)).await;
        let before = Instant::now();
        ticker.tick().await.unwrap();
        ticker.tick().await.unwrap();

        // The second tick after the overrun waits for a fresh period
        assert!(before.elapsed() >= Duration::from_millis(400));
        assert_eq!(ticker.fired(), 3);
    }

    #[test]
    fn test_cadence_defaults() {
        let cadence = CadenceConfig::default();
        assert_eq!(cadence.timer_period(), Duration::from_secs(1));
        assert_eq!(cadence.detection_period(), Duration::from_millis(500));
    }
}
