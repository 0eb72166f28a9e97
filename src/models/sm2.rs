//! Simplified SM-2 (SuperMemo 2) spaced repetition scheduling.
//!
//! A review takes the card's current interval and ease factor plus a
//! three-level rating:
//! - Hard: ease drops by 0.2 (floor 1.3), interval grows by 1.2x
//! - Good: ease unchanged, interval grows by the ease factor
//! - Easy: ease rises by 0.15, interval grows by ease * 1.3
//!
//! A card that has never been reviewed (interval 0) gets a fixed seed
//! interval instead, since multiplying zero would never grow it.

use super::card::MIN_EASE_FACTOR;
use super::{Card, ReviewRating};
use chrono::{DateTime, Duration, Utc};

const HARD_EASE_PENALTY: f64 = 0.2;
const EASY_EASE_BONUS: f64 = 0.15;
const HARD_INTERVAL_FACTOR: f64 = 1.2;
const EASY_INTERVAL_BONUS: f64 = 1.3;

/// Seed intervals (days) for a card's first review.
const FIRST_HARD_INTERVAL: u32 = 1;
const FIRST_GOOD_INTERVAL: u32 = 1;
const FIRST_EASY_INTERVAL: u32 = 4;

/// New scheduling state produced by one review.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReviewOutcome {
    pub interval: u32,
    pub ease_factor: f64,
    pub due_date: DateTime<Utc>,
}

impl ReviewOutcome {
    pub fn apply_to(&self, card: &mut Card) {
        card.interval = self.interval;
        card.ease_factor = self.ease_factor;
        card.due_date = self.due_date;
    }
}

/// Calculates the next review state for a card. Pure; `now` is the review time.
pub fn calculate_next_review(card: &Card, rating: ReviewRating, now: DateTime<Utc>) -> ReviewOutcome {
    next_review(card.interval, card.ease_factor, rating, now)
}

pub fn next_review(
    interval: u32,
    ease_factor: f64,
    rating: ReviewRating,
    now: DateTime<Utc>,
) -> ReviewOutcome {
    let (new_interval, new_ef) = match rating {
        ReviewRating::Hard => {
            let ef = (ease_factor - HARD_EASE_PENALTY).max(MIN_EASE_FACTOR);
            let next = if interval == 0 {
                FIRST_HARD_INTERVAL
            } else {
                grow(interval, HARD_INTERVAL_FACTOR)
            };
            (next, ef)
        }
        ReviewRating::Good => {
            let next = if interval == 0 {
                FIRST_GOOD_INTERVAL
            } else {
                grow(interval, ease_factor)
            };
            (next, ease_factor)
        }
        ReviewRating::Easy => {
            let next = if interval == 0 {
                FIRST_EASY_INTERVAL
            } else {
                grow(interval, ease_factor * EASY_INTERVAL_BONUS)
            };
            (next, ease_factor + EASY_EASE_BONUS)
        }
    };

    ReviewOutcome {
        interval: new_interval,
        ease_factor: new_ef,
        due_date: due_after(now, new_interval),
    }
}

/// `now + days`, pinned to the latest representable instant when the sum
/// overflows the calendar.
fn due_after(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    now.checked_add_signed(Duration::days(i64::from(days)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// `max(1, round(interval * factor))`
fn grow(interval: u32, factor: f64) -> u32 {
    let next = (f64::from(interval) * factor).round();
    // `as` saturates, so an absurd interval caps at u32::MAX rather than wrapping
    (next as u32).max(1)
}

/// Interval each rating would give, in `[hard, good, easy]` order.
/// Used to label the rating buttons before the user picks one.
pub fn preview_intervals(card: &Card, now: DateTime<Utc>) -> [u32; 3] {
    ReviewRating::ALL.map(|rating| calculate_next_review(card, rating, now).interval)
}

/// Formats an interval in days as a short human-readable string
pub fn format_interval(days: u32) -> String {
    match days {
        0 => "now".to_string(),
        1..=6 => format!("{}d", days),
        7..=29 => format!("{}w", days / 7),
        30..=364 => format!("{}mo", days / 30),
        _ => format!("{}y", days / 365),
    }
}
