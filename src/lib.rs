//! Session and review scheduling for a study dashboard: a deadline-anchored
//! focus/break timer and a simplified SM-2 spaced repetition scheduler.

pub mod clock;
pub mod config;
pub mod database;
pub mod engine;
pub mod error;
pub mod export;
pub mod models;
pub mod timer;

pub use engine::StudyEngine;
pub use error::{EngineError, GatewayError};
pub use models::{Card, Deck, DeckSet, ReviewRating, StudySession};
pub use timer::{FocusTimer, TimerConfig, TimerMode};
