//! Timer modes, configured durations and the read-only timer view.

use crate::error::{EngineError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_WORK_SECS: u32 = 25 * 60;
pub const DEFAULT_BREAK_SECS: u32 = 5 * 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerMode {
    Work,
    Break,
}

impl TimerMode {
    pub fn other(self) -> Self {
        match self {
            TimerMode::Work => TimerMode::Break,
            TimerMode::Break => TimerMode::Work,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimerMode::Work => "work",
            TimerMode::Break => "break",
        }
    }
}

impl fmt::Display for TimerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Work and break lengths in seconds. Both are always positive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    pub work_secs: u32,
    pub break_secs: u32,
}

impl TimerConfig {
    pub fn new(work_secs: u32, break_secs: u32) -> Result<Self> {
        let config = Self {
            work_secs,
            break_secs,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.work_secs == 0 {
            return Err(EngineError::InvalidConfiguration(
                "work duration must be positive".to_string(),
            ));
        }
        if self.break_secs == 0 {
            return Err(EngineError::InvalidConfiguration(
                "break duration must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn duration_secs(&self, mode: TimerMode) -> u32 {
        match mode {
            TimerMode::Work => self.work_secs,
            TimerMode::Break => self.break_secs,
        }
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            work_secs: DEFAULT_WORK_SECS,
            break_secs: DEFAULT_BREAK_SECS,
        }
    }
}

/// Snapshot of a timer for display.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimerState {
    pub mode: TimerMode,
    pub config: TimerConfig,
    pub remaining_seconds: u64,
    pub deadline: Option<DateTime<Utc>>,
    pub running: bool,
}

/// Sent to the notifier when a period runs out.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimerEvent {
    /// The period that ended
    pub mode: TimerMode,
    pub deadline: DateTime<Utc>,
}

impl TimerEvent {
    pub fn next_mode(&self) -> TimerMode {
        self.mode.other()
    }

    pub fn message(&self) -> &'static str {
        match self.mode {
            TimerMode::Work => "Time for a break!",
            TimerMode::Break => "Break's over! Time to focus.",
        }
    }
}

/// Formats whole seconds as `MM:SS`. Minutes are not wrapped at 60.
pub fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_durations() {
        let config = TimerConfig::default();
        assert_eq!(config.work_secs, 1500);
        assert_eq!(config.break_secs, 300);
        assert_eq!(config.duration_secs(TimerMode::Break), 300);
    }

    #[test]
    fn test_zero_duration_rejected() {
        assert!(matches!(
            TimerConfig::new(0, 300),
            Err(EngineError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            TimerConfig::new(1500, 0),
            Err(EngineError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_mode_flip() {
        assert_eq!(TimerMode::Work.other(), TimerMode::Break);
        assert_eq!(TimerMode::Break.other(), TimerMode::Work);
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(1500), "25:00");
        assert_eq!(format_clock(61), "01:01");
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(7200), "120:00");
    }
}
