//! Work/break interval timer anchored to an absolute deadline.
//!
//! While running, the only record of time left is `deadline`; every tick
//! recomputes `deadline - now`. Late, bunched or missing ticks therefore
//! never stretch a period: the first tick delivered after the deadline
//! expires it.
//!
//! Each run hands out a [`TickTag`] (the deadline it targets). Ticks carrying
//! a tag that no longer matches are stale and change nothing, which is what
//! makes pause/reset safe against a tick that was already in flight.

use super::notifier::Notifier;
use super::state::{TimerConfig, TimerEvent, TimerMode, TimerState};
use crate::clock::Clock;
use crate::error::Result;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info};

/// Identifies the run a tick belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TickTag(DateTime<Utc>);

impl TickTag {
    pub fn deadline(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Result of delivering one tick.
#[derive(Clone, Debug, PartialEq)]
pub enum TickOutcome {
    /// Tag did not match the current run; nothing changed.
    Stale,
    /// Still counting down.
    Running { remaining_secs: u64 },
    /// The period ended; the timer is now idle in the other mode.
    Expired(TimerEvent),
}

pub struct FocusTimer {
    config: TimerConfig,
    mode: TimerMode,
    /// Time left while idle. Ignored while running.
    remaining: Duration,
    deadline: Option<DateTime<Utc>>,
    /// Last value shown to the user, whole seconds
    display_secs: u64,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
}

impl FocusTimer {
    pub fn new(config: TimerConfig, clock: Arc<dyn Clock>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            config,
            mode: TimerMode::Work,
            remaining: secs(config.work_secs),
            deadline: None,
            display_secs: u64::from(config.work_secs),
            clock,
            notifier,
        }
    }

    pub fn config(&self) -> TimerConfig {
        self.config
    }

    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    pub fn is_running(&self) -> bool {
        self.deadline.is_some()
    }

    /// Tag of the current run, if running.
    pub fn tag(&self) -> Option<TickTag> {
        self.deadline.map(TickTag)
    }

    /// Remaining time as last displayed, in whole seconds.
    pub fn remaining_seconds(&self) -> u64 {
        self.display_secs
    }

    pub fn state(&self) -> TimerState {
        TimerState {
            mode: self.mode,
            config: self.config,
            remaining_seconds: self.display_secs,
            deadline: self.deadline,
            running: self.is_running(),
        }
    }

    /// Starts counting down from the frozen remaining time.
    /// Starting a running timer keeps its deadline.
    pub fn start(&mut self) -> TickTag {
        if let Some(deadline) = self.deadline {
            return TickTag(deadline);
        }
        let deadline = self.clock.now() + self.remaining;
        self.deadline = Some(deadline);
        info!(mode = %self.mode, %deadline, "timer started");
        TickTag(deadline)
    }

    /// Freezes the remaining time. No-op when idle.
    pub fn pause(&mut self) {
        let Some(deadline) = self.deadline.take() else {
            return;
        };
        self.remaining = self.clamp(deadline - self.clock.now());
        self.display_secs = round_secs(self.remaining);
        info!(mode = %self.mode, remaining_secs = self.display_secs, "timer paused");
    }

    /// Back to an idle work period of full length.
    pub fn reset(&mut self) {
        self.deadline = None;
        self.set_idle(TimerMode::Work);
        info!("timer reset");
    }

    /// Applies new durations and restarts idle at the start of a work period.
    /// Invalid durations leave the timer untouched.
    pub fn reconfigure(&mut self, work_secs: u32, break_secs: u32) -> Result<()> {
        self.config = TimerConfig::new(work_secs, break_secs)?;
        self.deadline = None;
        self.set_idle(TimerMode::Work);
        info!(work_secs, break_secs, "timer reconfigured");
        Ok(())
    }

    /// Delivers a tick for the run identified by `tag`, notifying on expiry.
    pub fn tick(&mut self, tag: TickTag) -> TickOutcome {
        let outcome = self.apply_tick(tag);
        if let TickOutcome::Expired(event) = &outcome {
            self.notifier.notify(event);
        }
        outcome
    }

    /// Like [`FocusTimer::tick`] but leaves delivering the expiry event to the
    /// caller. Used when the timer sits behind a lock the notifier may want.
    pub fn apply_tick(&mut self, tag: TickTag) -> TickOutcome {
        let Some(deadline) = self.deadline else {
            return TickOutcome::Stale;
        };
        if deadline != tag.0 {
            debug!(tag = %tag.0, %deadline, "dropping stale tick");
            return TickOutcome::Stale;
        }

        let left = deadline - self.clock.now();
        if left <= Duration::zero() {
            return TickOutcome::Expired(self.expire(deadline));
        }

        self.display_secs = round_secs(self.clamp(left));
        TickOutcome::Running {
            remaining_secs: self.display_secs,
        }
    }

    pub fn notifier(&self) -> Arc<dyn Notifier> {
        Arc::clone(&self.notifier)
    }

    /// Ticks the current run, if any.
    pub fn poll(&mut self) -> TickOutcome {
        match self.tag() {
            Some(tag) => self.tick(tag),
            None => TickOutcome::Stale,
        }
    }

    fn expire(&mut self, deadline: DateTime<Utc>) -> TimerEvent {
        let event = TimerEvent {
            mode: self.mode,
            deadline,
        };
        // Leave the running state first so a re-entrant tick is stale.
        self.deadline = None;
        self.set_idle(self.mode.other());
        info!(ended = %event.mode, next = %self.mode, "timer period ended");
        event
    }

    fn set_idle(&mut self, mode: TimerMode) {
        self.mode = mode;
        self.remaining = secs(self.config.duration_secs(mode));
        self.display_secs = u64::from(self.config.duration_secs(mode));
    }

    /// Keeps a computed remaining time within `[0, period length]`, which also
    /// covers a wall clock that stepped backwards.
    fn clamp(&self, left: Duration) -> Duration {
        left.clamp(Duration::zero(), secs(self.config.duration_secs(self.mode)))
    }
}

fn secs(s: u32) -> Duration {
    Duration::seconds(i64::from(s))
}

/// Rounds to the nearest whole second, halves up.
fn round_secs(d: Duration) -> u64 {
    let ms = d.num_milliseconds().max(0) as u64;
    (ms + 500) / 1000
}
