//! Focus/break interval timer
//!
//! This module provides:
//! - The deadline-anchored timer state machine
//! - A tokio polling loop that delivers tagged ticks
//! - The notifier boundary for expiry events

pub mod driver;
pub mod focus_timer;
pub mod notifier;
pub mod state;

pub use driver::{SharedTimer, TimerDriver};
pub use focus_timer::{FocusTimer, TickOutcome, TickTag};
pub use notifier::{ChannelNotifier, LogNotifier, Notifier, RecordingNotifier};
pub use state::{TimerConfig, TimerEvent, TimerMode, TimerState, format_clock};
