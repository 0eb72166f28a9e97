//! Background polling loop that delivers ticks to a shared [`FocusTimer`].
//!
//! The loop only ever ticks the run it was spawned for. Stopping it cancels
//! the token; a tick that raced the cancellation is still harmless because
//! its tag no longer matches once the timer has been paused or reset.

use super::focus_timer::{FocusTimer, TickOutcome, TickTag};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Default delay between ticks (milliseconds).
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

pub type SharedTimer = Arc<Mutex<FocusTimer>>;

pub fn shared(timer: FocusTimer) -> SharedTimer {
    Arc::new(Mutex::new(timer))
}

pub fn lock(timer: &SharedTimer) -> MutexGuard<'_, FocusTimer> {
    // Timer state is updated in single assignments, so a poisoned guard is still consistent.
    timer.lock().unwrap_or_else(|e| e.into_inner())
}

/// Ticks a shared timer and delivers any expiry event after the lock is
/// released, so a notifier is free to read the timer.
pub fn tick(timer: &SharedTimer, tag: TickTag) -> TickOutcome {
    let (outcome, notifier) = {
        let mut guard = lock(timer);
        (guard.apply_tick(tag), guard.notifier())
    };
    if let TickOutcome::Expired(event) = &outcome {
        notifier.notify(event);
    }
    outcome
}

/// [`tick`] for the current run, if any.
pub fn poll(timer: &SharedTimer) -> TickOutcome {
    let tag = lock(timer).tag();
    match tag {
        Some(tag) => tick(timer, tag),
        None => TickOutcome::Stale,
    }
}

pub struct TimerDriver {
    timer: SharedTimer,
    period: Duration,
    outcomes: Option<mpsc::UnboundedSender<TickOutcome>>,
    cancel: Option<CancellationToken>,
}

impl TimerDriver {
    pub fn new(timer: SharedTimer) -> Self {
        Self {
            timer,
            period: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            outcomes: None,
            cancel: None,
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Every non-stale tick outcome is also sent here, for display.
    pub fn with_outcomes(mut self, tx: mpsc::UnboundedSender<TickOutcome>) -> Self {
        self.outcomes = Some(tx);
        self
    }

    pub fn timer(&self) -> &SharedTimer {
        &self.timer
    }

    /// Starts the timer and spawns a polling loop for the run.
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) -> JoinHandle<()> {
        let tag = lock(&self.timer).start();
        self.spawn(tag)
    }

    /// Pauses the timer and stops polling.
    pub fn pause(&mut self) {
        self.stop();
        lock(&self.timer).pause();
    }

    /// Resets the timer and stops polling.
    pub fn reset(&mut self) {
        self.stop();
        lock(&self.timer).reset();
    }

    /// Stops the polling loop without touching the timer.
    pub fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
    }

    /// Spawns a polling loop for the run identified by `tag`, replacing any
    /// previous loop.
    pub fn spawn(&mut self, tag: TickTag) -> JoinHandle<()> {
        self.stop();
        let cancel = CancellationToken::new();
        self.cancel = Some(cancel.clone());

        let timer = Arc::clone(&self.timer);
        let period = self.period;
        let outcomes = self.outcomes.clone();
        tokio::spawn(run_ticks(timer, tag, period, cancel, outcomes))
    }
}

impl Drop for TimerDriver {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_ticks(
    timer: SharedTimer,
    tag: TickTag,
    period: Duration,
    cancel: CancellationToken,
    outcomes: Option<mpsc::UnboundedSender<TickOutcome>>,
) {
    let mut ticker = tokio::time::interval(period);
    // A suspended host gets one catch-up tick, not a burst.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    debug!(deadline = %tag.deadline(), "timer polling started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("timer polling cancelled");
                break;
            }
            _ = ticker.tick() => {
                if cancel.is_cancelled() {
                    break;
                }
                let outcome = tick(&timer, tag);
                let finished = !matches!(outcome, TickOutcome::Running { .. });
                if outcome != TickOutcome::Stale {
                    if let Some(tx) = &outcomes {
                        let _ = tx.send(outcome);
                    }
                }
                if finished {
                    debug!("timer polling finished");
                    break;
                }
            }
        }
    }
}
