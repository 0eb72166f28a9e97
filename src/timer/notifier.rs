//! Delivery of timer expiry to the outside world.
//!
//! Sound and OS notifications live behind [`Notifier`]. Delivery is
//! fire-and-forget: a notifier cannot fail the timer.

use super::state::TimerEvent;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::info;

pub trait Notifier: Send + Sync {
    fn notify(&self, event: &TimerEvent);
}

/// Writes expiries to the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: &TimerEvent) {
        info!(
            ended = %event.mode,
            next = %event.next_mode(),
            "{}",
            event.message()
        );
    }
}

/// Forwards expiries to a channel, e.g. to a UI task.
#[derive(Clone, Debug)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<TimerEvent>,
}

impl ChannelNotifier {
    pub fn new(tx: mpsc::UnboundedSender<TimerEvent>) -> Self {
        Self { tx }
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, event: &TimerEvent) {
        // No receiver is not an error.
        let _ = self.tx.send(*event);
    }
}

/// Keeps every event it receives.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<TimerEvent>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TimerEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }

    pub fn count(&self) -> usize {
        self.events().len()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, event: &TimerEvent) {
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        events.push(*event);
    }
}
