//! A card is a <front, back> pair plus its spaced repetition state.
//! The text is opaque to the scheduler; only `due_date`, `interval` and
//! `ease_factor` drive scheduling.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ease factor given to a card that has never been reviewed.
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;

/// Ease factor never drops below this value.
pub const MIN_EASE_FACTOR: f64 = 1.3;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: i64,
    pub deck_id: i64,
    pub front: String,
    pub back: String,
    pub due_date: DateTime<Utc>,
    /// Days until the next review after a successful one
    pub interval: u32,
    pub ease_factor: f64,
    pub created_at: DateTime<Utc>,
}

impl Card {
    /// A fresh card is immediately due.
    pub fn new(id: i64, deck_id: i64, front: String, back: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            deck_id,
            front,
            back,
            due_date: now,
            interval: 0,
            ease_factor: DEFAULT_EASE_FACTOR,
            created_at: now,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due_date <= now
    }

    /// True until the first review has given the card a non-zero interval.
    pub fn is_new(&self) -> bool {
        self.interval == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_card_creation_defaults() {
        let card = Card::new(1, 7, "H2O".to_string(), "water".to_string(), now());

        assert_eq!(card.interval, 0);
        assert_eq!(card.ease_factor, 2.5);
        assert_eq!(card.due_date, now());
        assert!(card.is_new());
        assert!(card.is_due(now()));
    }

    #[test]
    fn test_card_due_boundary() {
        let mut card = Card::new(1, 7, "Na".to_string(), "sodium".to_string(), now());
        card.due_date = now() + Duration::seconds(1);

        assert!(!card.is_due(now()));
        assert!(card.is_due(now() + Duration::seconds(1)));
    }
}
