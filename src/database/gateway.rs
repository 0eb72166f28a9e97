//! Persistence Gateway contract.
//!
//! The engine loads everything once at session start and writes each change
//! through right after applying it in memory. Gateways do not retry.

use crate::error::GatewayError;
use crate::models::{Card, Deck, DeckSet};
use crate::timer::TimerConfig;

pub type Result<T> = std::result::Result<T, GatewayError>;

/// Everything persisted for one user.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    pub decks: Vec<Deck>,
    pub cards: Vec<Card>,
    pub timer: TimerConfig,
}

impl Snapshot {
    pub fn into_parts(self) -> (DeckSet, TimerConfig) {
        (DeckSet::new(self.decks, self.cards), self.timer)
    }
}

pub trait PersistenceGateway: Send {
    fn load(&mut self) -> Result<Snapshot>;

    fn save_deck(&mut self, deck: &Deck) -> Result<()>;

    /// Deletes the deck and its cards.
    fn delete_deck(&mut self, deck_id: i64) -> Result<()>;

    fn save_card(&mut self, card: &Card) -> Result<()>;

    fn delete_card(&mut self, card_id: i64) -> Result<()>;

    fn save_timer_config(&mut self, config: &TimerConfig) -> Result<()>;
}

/// Keeps state in memory only. Used for tests and throwaway sessions.
#[derive(Clone, Debug, Default)]
pub struct MemoryGateway {
    snapshot: Snapshot,
}

impl MemoryGateway {
    pub fn new(snapshot: Snapshot) -> Self {
        Self { snapshot }
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }
}

impl PersistenceGateway for MemoryGateway {
    fn load(&mut self) -> Result<Snapshot> {
        Ok(self.snapshot.clone())
    }

    fn save_deck(&mut self, deck: &Deck) -> Result<()> {
        match self.snapshot.decks.iter_mut().find(|d| d.id == deck.id) {
            Some(existing) => *existing = deck.clone(),
            None => self.snapshot.decks.push(deck.clone()),
        }
        Ok(())
    }

    fn delete_deck(&mut self, deck_id: i64) -> Result<()> {
        self.snapshot.decks.retain(|d| d.id != deck_id);
        self.snapshot.cards.retain(|c| c.deck_id != deck_id);
        Ok(())
    }

    fn save_card(&mut self, card: &Card) -> Result<()> {
        match self.snapshot.cards.iter_mut().find(|c| c.id == card.id) {
            Some(existing) => *existing = card.clone(),
            None => self.snapshot.cards.push(card.clone()),
        }
        Ok(())
    }

    fn delete_card(&mut self, card_id: i64) -> Result<()> {
        self.snapshot.cards.retain(|c| c.id != card_id);
        Ok(())
    }

    fn save_timer_config(&mut self, config: &TimerConfig) -> Result<()> {
        self.snapshot.timer = *config;
        Ok(())
    }
}
