//! Countdown tick producer
//!
//! One producer task exists per ACTIVE stretch of a session. It is aborted
//! synchronously whenever the session leaves ACTIVE; ticks carry the epoch
//! of the producer that sent them so the supervisor can drop any tick that
//! was already queued when the producer died.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// One tick from the producer
#[derive(Debug, Clone, Copy)]
pub struct Tick {
    pub epoch: u64,
}

/// Fixed-interval tick source driven by tokio's monotonic timer.
///
/// Missed ticks are skipped rather than replayed: after a process suspend
/// the session recomputes remaining time from the wall-clock delta instead
/// of trusting a burst of catch-up ticks.
#[derive(Debug, Clone)]
pub struct TimerClock {
    interval: Duration,
}

impl TimerClock {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Start a producer for the given epoch. The returned handle aborts the
    /// producer when dropped.
    pub fn start(&self, epoch: u64, tx: mpsc::UnboundedSender<Tick>) -> TickerHandle {
        let interval = self.interval;
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first interval tick completes immediately; the countdown
            // starts one full interval after ACTIVE.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if tx.send(Tick { epoch }).is_err() {
                    break;
                }
            }
        });

        debug!(epoch, interval_ms = interval.as_millis() as u64, "Ticker started");
        TickerHandle { epoch, task }
    }
}

/// Owning handle for a running tick producer
#[derive(Debug)]
pub struct TickerHandle {
    epoch: u64,
    task: JoinHandle<()>,
}

impl TickerHandle {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

impl Drop for TickerHandle {
    fn drop(&mut self) {
        self.task.abort();
        debug!(epoch = self.epoch, "Ticker stopped");
    }
}
