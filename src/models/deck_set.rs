//! Container for all decks and their cards, and the due-card query that
//! feeds study sessions.
use super::{Card, Deck};
use crate::error::{EngineError, Result};
use chrono::{DateTime, Utc};

#[derive(Clone, Debug, Default)]
pub struct DeckSet {
    pub decks: Vec<Deck>,
    pub cards: Vec<Card>,
}

impl DeckSet {
    pub fn new(decks: Vec<Deck>, cards: Vec<Card>) -> Self {
        Self { decks, cards }
    }

    pub fn deck(&self, deck_id: i64) -> Result<&Deck> {
        self.decks
            .iter()
            .find(|d| d.id == deck_id)
            .ok_or(EngineError::UnknownDeck(deck_id))
    }

    pub fn card(&self, card_id: i64) -> Result<&Card> {
        self.cards
            .iter()
            .find(|c| c.id == card_id)
            .ok_or(EngineError::UnknownCard(card_id))
    }

    pub fn card_mut(&mut self, card_id: i64) -> Result<&mut Card> {
        self.cards
            .iter_mut()
            .find(|c| c.id == card_id)
            .ok_or(EngineError::UnknownCard(card_id))
    }

    /// All cards of a deck in creation order.
    pub fn cards_for_deck(&self, deck_id: i64) -> Result<Vec<&Card>> {
        self.deck(deck_id)?;
        let mut cards: Vec<&Card> = self.cards.iter().filter(|c| c.deck_id == deck_id).collect();
        cards.sort_by_key(|c| (c.created_at, c.id));
        Ok(cards)
    }

    /// Cards of a deck that are due at `now`, oldest due date first.
    ///
    /// An empty vector means nothing is due; an unknown deck is an error.
    pub fn due_cards(&self, deck_id: i64, now: DateTime<Utc>) -> Result<Vec<&Card>> {
        self.deck(deck_id)?;
        Ok(select_due(
            self.cards.iter().filter(|c| c.deck_id == deck_id),
            now,
        ))
    }

    /// Number of due cards per deck, in deck order.
    pub fn due_counts(&self, now: DateTime<Utc>) -> Vec<(&Deck, usize)> {
        self.decks
            .iter()
            .map(|deck| {
                let due = self
                    .cards
                    .iter()
                    .filter(|c| c.deck_id == deck.id && c.is_due(now))
                    .count();
                (deck, due)
            })
            .collect()
    }

    pub fn next_card_id(&self) -> i64 {
        self.cards.iter().map(|c| c.id).max().unwrap_or(0) + 1
    }

    pub fn next_deck_id(&self) -> i64 {
        self.decks.iter().map(|d| d.id).max().unwrap_or(0) + 1
    }

    /// Inserts or replaces a card by id.
    pub fn upsert_card(&mut self, card: Card) {
        match self.cards.iter_mut().find(|c| c.id == card.id) {
            Some(existing) => *existing = card,
            None => self.cards.push(card),
        }
    }

    /// Inserts or replaces a deck by id.
    pub fn upsert_deck(&mut self, deck: Deck) {
        match self.decks.iter_mut().find(|d| d.id == deck.id) {
            Some(existing) => *existing = deck,
            None => self.decks.push(deck),
        }
    }

    pub fn remove_card(&mut self, card_id: i64) -> Result<Card> {
        let pos = self
            .cards
            .iter()
            .position(|c| c.id == card_id)
            .ok_or(EngineError::UnknownCard(card_id))?;
        Ok(self.cards.remove(pos))
    }

    /// Removes a deck and every card that belongs to it.
    pub fn remove_deck(&mut self, deck_id: i64) -> Result<Deck> {
        let pos = self
            .decks
            .iter()
            .position(|d| d.id == deck_id)
            .ok_or(EngineError::UnknownDeck(deck_id))?;
        self.cards.retain(|c| c.deck_id != deck_id);
        Ok(self.decks.remove(pos))
    }
}

/// Selects the cards with `due_date <= now`, ordered by due date then id so
/// the result is deterministic.
pub fn select_due<'a>(cards: impl IntoIterator<Item = &'a Card>, now: DateTime<Utc>) -> Vec<&'a Card> {
    let mut due: Vec<&Card> = cards.into_iter().filter(|c| c.is_due(now)).collect();
    due.sort_by_key(|c| (c.due_date, c.id));
    due
}
