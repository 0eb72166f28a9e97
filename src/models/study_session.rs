//! Study session over the cards of one deck that are due for review.
//! The session only tracks presentation order and progress; rescheduling a
//! card is done by the engine when a rating is recorded.

use super::ReviewRating;
use rand::seq::SliceRandom;

#[derive(Clone, Debug)]
pub struct StudySession {
    pub deck_id: i64,
    card_ids: Vec<i64>,
    current_index: usize,
    pub show_back: bool,
    ratings: Vec<(i64, ReviewRating)>,
}

impl StudySession {
    /// Creates a session from due card ids, in the order given.
    pub fn new(deck_id: i64, card_ids: Vec<i64>) -> Self {
        Self {
            deck_id,
            card_ids,
            current_index: 0,
            show_back: false,
            ratings: Vec::new(),
        }
    }

    /// Creates a session with the cards in random order.
    pub fn shuffled(deck_id: i64, mut card_ids: Vec<i64>) -> Self {
        card_ids.shuffle(&mut rand::thread_rng());
        Self::new(deck_id, card_ids)
    }

    pub fn current_card_id(&self) -> Option<i64> {
        self.card_ids.get(self.current_index).copied()
    }

    pub fn reveal(&mut self) {
        self.show_back = true;
    }

    /// Records the rating for the current card and moves to the next one.
    /// Returns the id of the card that was rated.
    pub fn record(&mut self, rating: ReviewRating) -> Option<i64> {
        let card_id = self.current_card_id()?;
        self.ratings.push((card_id, rating));
        self.current_index += 1;
        self.show_back = false;
        Some(card_id)
    }

    pub fn is_finished(&self) -> bool {
        self.current_index >= self.card_ids.len()
    }

    pub fn total_count(&self) -> usize {
        self.card_ids.len()
    }

    pub fn reviewed_count(&self) -> usize {
        self.ratings.len()
    }

    pub fn remaining_count(&self) -> usize {
        self.total_count() - self.current_index.min(self.total_count())
    }

    pub fn ratings(&self) -> &[(i64, ReviewRating)] {
        &self.ratings
    }

    pub fn progress_message(&self) -> String {
        if self.is_finished() {
            format!("Session complete: {} cards reviewed", self.reviewed_count())
        } else {
            format!("Card {} of {}", self.current_index + 1, self.total_count())
        }
    }
}
