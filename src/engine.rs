//! Study engine: the owned session object tying the deck collection, the
//! scheduler, the focus timer and the Persistence Gateway together.
//!
//! Every mutating operation is applied in memory first and then written
//! through the gateway. A failed write is returned as
//! [`EngineError::PersistenceFailure`] but the in-memory change stands.

use crate::clock::Clock;
use crate::database::PersistenceGateway;
use crate::error::{EngineError, GatewayError, Result};
use crate::export::DeckExport;
use crate::models::sm2::{calculate_next_review, preview_intervals};
use crate::models::{Card, Deck, DeckSet, ReviewRating, StudySession};
use crate::timer::driver::{self, SharedTimer};
use crate::timer::{FocusTimer, Notifier, TickOutcome, TickTag, TimerState};
use std::sync::Arc;
use tracing::{info, warn};

pub struct StudyEngine<G: PersistenceGateway> {
    decks: DeckSet,
    timer: SharedTimer,
    gateway: G,
    clock: Arc<dyn Clock>,
}

impl<G: PersistenceGateway> StudyEngine<G> {
    /// Loads the persisted state and builds the engine.
    pub fn open(mut gateway: G, clock: Arc<dyn Clock>, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let (decks, timer_config) = gateway.load()?.into_parts();
        info!(
            decks = decks.decks.len(),
            cards = decks.cards.len(),
            "study state loaded"
        );
        let timer = driver::shared(FocusTimer::new(timer_config, clock.clone(), notifier));
        Ok(Self {
            decks,
            timer,
            gateway,
            clock,
        })
    }

    pub fn decks(&self) -> &DeckSet {
        &self.decks
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn card(&self, card_id: i64) -> Result<&Card> {
        self.decks.card(card_id)
    }

    // ==================== Deck Operations ====================

    pub fn create_deck(&mut self, name: &str, subject: &str) -> Result<Deck> {
        let deck = Deck::new(self.decks.next_deck_id(), name.to_string(), subject.to_string());
        self.decks.upsert_deck(deck.clone());
        info!(deck_id = deck.id, name, "deck created");
        self.persist(|g| g.save_deck(&deck))?;
        Ok(deck)
    }

    /// Deletes a deck and all of its cards.
    pub fn delete_deck(&mut self, deck_id: i64) -> Result<()> {
        self.decks.remove_deck(deck_id)?;
        info!(deck_id, "deck deleted");
        self.persist(|g| g.delete_deck(deck_id))
    }

    /// All cards of a deck in creation order.
    pub fn cards_for_deck(&self, deck_id: i64) -> Result<Vec<&Card>> {
        self.decks.cards_for_deck(deck_id)
    }

    pub fn due_cards(&self, deck_id: i64) -> Result<Vec<&Card>> {
        self.decks.due_cards(deck_id, self.clock.now())
    }

    /// Every deck with its number of cards due now.
    pub fn due_counts(&self) -> Vec<(&Deck, usize)> {
        self.decks.due_counts(self.clock.now())
    }

    pub fn export_deck(&self, deck_id: i64) -> Result<DeckExport> {
        let deck = self.decks.deck(deck_id)?.clone();
        let cards = self.cards_for_deck(deck_id)?.into_iter().cloned().collect();
        Ok(DeckExport { deck, cards })
    }

    /// Adds an exported deck under fresh ids, keeping each card's schedule.
    ///
    /// The whole deck lands in memory before anything is saved; a failed
    /// save is reported after every write has been attempted.
    pub fn import_deck(&mut self, export: DeckExport) -> Result<Deck> {
        let DeckExport { deck: source, cards } = export;
        let deck = Deck::new(self.decks.next_deck_id(), source.name, source.subject);
        self.decks.upsert_deck(deck.clone());

        let mut imported = Vec::with_capacity(cards.len());
        for card in cards {
            let card = Card {
                id: self.decks.next_card_id(),
                deck_id: deck.id,
                ..card
            };
            self.decks.upsert_card(card.clone());
            imported.push(card);
        }
        info!(deck_id = deck.id, cards = imported.len(), "deck imported");

        let mut first_error = self.persist(|g| g.save_deck(&deck)).err();
        for card in &imported {
            if let Err(e) = self.persist(|g| g.save_card(card)) {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(deck),
        }
    }

    // ==================== Card Operations ====================

    /// Adds a card that is due immediately.
    pub fn add_card(&mut self, deck_id: i64, front: &str, back: &str) -> Result<Card> {
        self.decks.deck(deck_id)?;
        let card = Card::new(
            self.decks.next_card_id(),
            deck_id,
            front.to_string(),
            back.to_string(),
            self.clock.now(),
        );
        self.decks.upsert_card(card.clone());
        info!(card_id = card.id, deck_id, "card added");
        self.persist(|g| g.save_card(&card))?;
        Ok(card)
    }

    /// Replaces a card's text. Scheduling state is untouched.
    pub fn update_card_text(&mut self, card_id: i64, front: &str, back: &str) -> Result<Card> {
        let card = self.decks.card_mut(card_id)?;
        card.front = front.to_string();
        card.back = back.to_string();
        let card = card.clone();
        self.persist(|g| g.save_card(&card))?;
        Ok(card)
    }

    pub fn delete_card(&mut self, card_id: i64) -> Result<()> {
        self.decks.remove_card(card_id)?;
        info!(card_id, "card deleted");
        self.persist(|g| g.delete_card(card_id))
    }

    // ==================== Reviews ====================

    /// Reschedules a card from a rating and saves it.
    pub fn review_card(&mut self, card_id: i64, rating: ReviewRating) -> Result<Card> {
        let now = self.clock.now();
        let card = self.decks.card_mut(card_id)?;
        let outcome = calculate_next_review(card, rating, now);
        outcome.apply_to(card);
        let card = card.clone();

        info!(
            card_id,
            %rating,
            interval = card.interval,
            ease_factor = card.ease_factor,
            due = %card.due_date,
            "card rescheduled"
        );
        self.persist(|g| g.save_card(&card))?;
        Ok(card)
    }

    /// Intervals each rating would give the card, `[hard, good, easy]`.
    pub fn preview(&self, card_id: i64) -> Result<[u32; 3]> {
        Ok(preview_intervals(self.decks.card(card_id)?, self.clock.now()))
    }

    /// Builds a session over the deck's currently due cards.
    pub fn start_session(&self, deck_id: i64, shuffle: bool) -> Result<StudySession> {
        let ids: Vec<i64> = self.due_cards(deck_id)?.iter().map(|c| c.id).collect();
        info!(deck_id, due = ids.len(), shuffle, "study session started");
        Ok(if shuffle {
            StudySession::shuffled(deck_id, ids)
        } else {
            StudySession::new(deck_id, ids)
        })
    }

    /// Reviews the session's current card and advances the session.
    /// Returns `None` once the session is finished.
    pub fn review_current(&mut self, session: &mut StudySession, rating: ReviewRating) -> Result<Option<Card>> {
        let Some(card_id) = session.current_card_id() else {
            return Ok(None);
        };
        let result = self.review_card(card_id, rating);
        // A failed save still leaves the review applied in memory.
        if matches!(result, Ok(_) | Err(EngineError::PersistenceFailure(_))) {
            session.record(rating);
        }
        result.map(Some)
    }

    // ==================== Timer ====================

    /// Shared handle for a [`crate::timer::TimerDriver`].
    pub fn timer(&self) -> &SharedTimer {
        &self.timer
    }

    pub fn timer_state(&self) -> TimerState {
        driver::lock(&self.timer).state()
    }

    pub fn start_timer(&self) -> TickTag {
        driver::lock(&self.timer).start()
    }

    pub fn pause_timer(&self) {
        driver::lock(&self.timer).pause();
    }

    pub fn reset_timer(&self) {
        driver::lock(&self.timer).reset();
    }

    /// Ticks the current run. An expiry is notified after the timer lock
    /// is released.
    pub fn poll_timer(&self) -> TickOutcome {
        driver::poll(&self.timer)
    }

    /// Sets new durations, restarts idle at Work and saves the durations.
    pub fn reconfigure_timer(&mut self, work_secs: u32, break_secs: u32) -> Result<()> {
        let config = {
            let mut timer = driver::lock(&self.timer);
            timer.reconfigure(work_secs, break_secs)?;
            timer.config()
        };
        self.persist(|g| g.save_timer_config(&config))
    }

    fn persist<F>(&mut self, write: F) -> Result<()>
    where
        F: FnOnce(&mut G) -> std::result::Result<(), GatewayError>,
    {
        write(&mut self.gateway).map_err(|e| {
            warn!(error = %e, "save failed; keeping in-memory state");
            EngineError::PersistenceFailure(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::database::{MemoryGateway, Snapshot};
    use crate::timer::{RecordingNotifier, TimerConfig, TimerMode};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    /// Gateway whose writes always fail.
    struct BrokenGateway {
        snapshot: Snapshot,
    }

    impl PersistenceGateway for BrokenGateway {
        fn load(&mut self) -> std::result::Result<Snapshot, GatewayError> {
            Ok(self.snapshot.clone())
        }
        fn save_deck(&mut self, _: &Deck) -> std::result::Result<(), GatewayError> {
            Err(broken())
        }
        fn delete_deck(&mut self, _: i64) -> std::result::Result<(), GatewayError> {
            Err(broken())
        }
        fn save_card(&mut self, _: &Card) -> std::result::Result<(), GatewayError> {
            Err(broken())
        }
        fn delete_card(&mut self, _: i64) -> std::result::Result<(), GatewayError> {
            Err(broken())
        }
        fn save_timer_config(&mut self, _: &TimerConfig) -> std::result::Result<(), GatewayError> {
            Err(broken())
        }
    }

    /// Gateway that stores decks but refuses every card write.
    struct CardlessGateway {
        inner: MemoryGateway,
    }

    impl PersistenceGateway for CardlessGateway {
        fn load(&mut self) -> std::result::Result<Snapshot, GatewayError> {
            self.inner.load()
        }
        fn save_deck(&mut self, deck: &Deck) -> std::result::Result<(), GatewayError> {
            self.inner.save_deck(deck)
        }
        fn delete_deck(&mut self, deck_id: i64) -> std::result::Result<(), GatewayError> {
            self.inner.delete_deck(deck_id)
        }
        fn save_card(&mut self, _: &Card) -> std::result::Result<(), GatewayError> {
            Err(GatewayError::Corrupt("card table locked".to_string()))
        }
        fn delete_card(&mut self, card_id: i64) -> std::result::Result<(), GatewayError> {
            self.inner.delete_card(card_id)
        }
        fn save_timer_config(&mut self, config: &TimerConfig) -> std::result::Result<(), GatewayError> {
            self.inner.save_timer_config(config)
        }
    }

    fn broken() -> GatewayError {
        GatewayError::Io(std::io::Error::other("disk unplugged"))
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, 7, 18, 0, 0).unwrap()
    }

    fn snapshot() -> Snapshot {
        let mut reviewed = Card::new(2, 1, "Avogadro".to_string(), "6.022e23".to_string(), start());
        reviewed.interval = 6;
        reviewed.due_date = start() + Duration::days(1);
        Snapshot {
            decks: vec![Deck::new(1, "Moles".to_string(), "Chemistry".to_string())],
            cards: vec![
                Card::new(1, 1, "Molar mass of C".to_string(), "12 g/mol".to_string(), start()),
                reviewed,
            ],
            timer: TimerConfig::default(),
        }
    }

    fn engine() -> (ManualClock, StudyEngine<MemoryGateway>) {
        let clock = ManualClock::new(start());
        let engine = StudyEngine::open(
            MemoryGateway::new(snapshot()),
            Arc::new(clock.clone()),
            Arc::new(RecordingNotifier::new()),
        )
        .unwrap();
        (clock, engine)
    }

    #[test]
    fn test_review_reschedules_and_saves() {
        let (_, mut engine) = engine();
        let card = engine.review_card(1, ReviewRating::Easy).unwrap();

        assert_eq!(card.interval, 4);
        assert_eq!(card.due_date, start() + Duration::days(4));
        assert_eq!(engine.gateway().snapshot().cards[0], card);
        assert!(engine.due_cards(1).unwrap().is_empty());
    }

    #[test]
    fn test_review_unknown_card() {
        let (_, mut engine) = engine();
        let err = engine.review_card(42, ReviewRating::Good).unwrap_err();
        assert!(matches!(err, EngineError::UnknownCard(42)));
    }

    #[test]
    fn test_failed_save_keeps_in_memory_review() {
        let clock = ManualClock::new(start());
        let mut engine = StudyEngine::open(
            BrokenGateway { snapshot: snapshot() },
            Arc::new(clock),
            Arc::new(RecordingNotifier::new()),
        )
        .unwrap();

        let err = engine.review_card(1, ReviewRating::Good).unwrap_err();
        assert!(matches!(err, EngineError::PersistenceFailure(_)));
        assert_eq!(engine.card(1).unwrap().interval, 1);
    }

    #[test]
    fn test_failed_timer_save_keeps_new_durations() {
        let mut engine = StudyEngine::open(
            BrokenGateway { snapshot: snapshot() },
            Arc::new(ManualClock::new(start())),
            Arc::new(RecordingNotifier::new()),
        )
        .unwrap();

        let err = engine.reconfigure_timer(1800, 600).unwrap_err();
        assert!(matches!(err, EngineError::PersistenceFailure(_)));
        assert_eq!(engine.timer_state().remaining_seconds, 1800);
    }

    #[test]
    fn test_due_cards_follow_clock() {
        let (clock, engine) = engine();
        let ids: Vec<i64> = engine.due_cards(1).unwrap().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1]);

        clock.advance(Duration::days(1));
        let ids: Vec<i64> = engine.due_cards(1).unwrap().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_session_reviews_each_due_card_once() {
        let (clock, mut engine) = engine();
        clock.advance(Duration::days(2));
        let mut session = engine.start_session(1, false).unwrap();
        assert_eq!(session.total_count(), 2);

        while !session.is_finished() {
            engine.review_current(&mut session, ReviewRating::Good).unwrap();
        }
        assert_eq!(engine.review_current(&mut session, ReviewRating::Good).unwrap(), None);

        assert_eq!(engine.card(1).unwrap().interval, 1);
        // round(6 * 2.5)
        assert_eq!(engine.card(2).unwrap().interval, 15);
        assert!(engine.due_cards(1).unwrap().is_empty());
    }

    #[test]
    fn test_session_unknown_deck() {
        let (_, engine) = engine();
        assert!(matches!(engine.start_session(9, true), Err(EngineError::UnknownDeck(9))));
    }

    #[test]
    fn test_add_card_is_due_now() {
        let (_, mut engine) = engine();
        let card = engine.add_card(1, "Mass of e-", "9.11e-31 kg").unwrap();

        assert_eq!(card.id, 3);
        assert_eq!(card.interval, 0);
        assert_eq!(card.ease_factor, 2.5);
        assert!(engine.due_cards(1).unwrap().iter().any(|c| c.id == 3));
        assert_eq!(engine.gateway().snapshot().cards.len(), 3);
    }

    #[test]
    fn test_add_card_unknown_deck() {
        let (_, mut engine) = engine();
        assert!(matches!(
            engine.add_card(5, "q", "a"),
            Err(EngineError::UnknownDeck(5))
        ));
    }

    #[test]
    fn test_update_text_keeps_schedule() {
        let (_, mut engine) = engine();
        let card = engine.update_card_text(2, "Avogadro's number", "6.022e23 /mol").unwrap();

        assert_eq!(card.front, "Avogadro's number");
        assert_eq!(card.interval, 6);
    }

    #[test]
    fn test_delete_deck_cascades() {
        let (_, mut engine) = engine();
        engine.delete_deck(1).unwrap();

        assert!(engine.decks().cards.is_empty());
        assert!(engine.gateway().snapshot().cards.is_empty());
        assert!(matches!(engine.due_cards(1), Err(EngineError::UnknownDeck(1))));
    }

    #[test]
    fn test_delete_card() {
        let (_, mut engine) = engine();
        engine.delete_card(1).unwrap();
        assert!(matches!(engine.card(1), Err(EngineError::UnknownCard(1))));
        assert!(matches!(engine.delete_card(1), Err(EngineError::UnknownCard(1))));
    }

    #[test]
    fn test_export_import_copies_schedule() {
        let (_, mut engine) = engine();
        let export = engine.export_deck(1).unwrap();
        let copy = engine.import_deck(export).unwrap();

        assert_eq!(copy.id, 2);
        let cards = engine.cards_for_deck(copy.id).unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[1].interval, 6);
        assert_ne!(cards[0].id, 1);
    }

    #[test]
    fn test_preview() {
        let (_, engine) = engine();
        assert_eq!(engine.preview(1).unwrap(), [1, 1, 4]);
        assert_eq!(engine.preview(2).unwrap(), [7, 15, 20]);
    }

    #[test]
    fn test_timer_commands() {
        let (clock, mut engine) = engine();
        engine.reconfigure_timer(1800, 600).unwrap();
        assert_eq!(engine.gateway().snapshot().timer, TimerConfig::new(1800, 600).unwrap());

        engine.start_timer();
        clock.advance(Duration::seconds(1800));
        assert!(matches!(engine.poll_timer(), TickOutcome::Expired(_)));
        assert_eq!(engine.timer_state().mode, TimerMode::Break);

        engine.reset_timer();
        engine.start_timer();
        engine.pause_timer();
        assert_eq!(engine.timer_state().remaining_seconds, 1800);
    }

    #[test]
    fn test_invalid_reconfigure_not_saved() {
        let (_, mut engine) = engine();
        assert!(matches!(
            engine.reconfigure_timer(1500, 0),
            Err(EngineError::InvalidConfiguration(_))
        ));
        assert_eq!(engine.gateway().snapshot().timer, TimerConfig::default());
    }

    #[test]
    fn test_import_with_failing_card_saves_keeps_whole_deck() {
        let mut engine = StudyEngine::open(
            CardlessGateway {
                inner: MemoryGateway::new(snapshot()),
            },
            Arc::new(ManualClock::new(start())),
            Arc::new(RecordingNotifier::new()),
        )
        .unwrap();
        let mut export = engine.export_deck(1).unwrap();
        export.cards.push(Card::new(7, 1, "Boyle".to_string(), "PV = k".to_string(), start()));

        let err = engine.import_deck(export).unwrap_err();
        assert!(matches!(
            err,
            EngineError::PersistenceFailure(GatewayError::Corrupt(_))
        ));

        assert_eq!(engine.decks().decks.len(), 2);
        assert_eq!(engine.cards_for_deck(2).unwrap().len(), 3);
        assert_eq!(engine.gateway().inner.snapshot().decks.len(), 2);
    }

    #[test]
    fn test_due_counts_follow_clock() {
        let (clock, engine) = engine();
        let counts: Vec<usize> = engine.due_counts().into_iter().map(|(_, n)| n).collect();
        assert_eq!(counts, vec![1]);

        clock.advance(Duration::days(1));
        let counts: Vec<usize> = engine.due_counts().into_iter().map(|(_, n)| n).collect();
        assert_eq!(counts, vec![2]);
    }

    #[test]
    fn test_session_keeps_card_whose_review_failed() {
        let (_, mut engine) = engine();
        let mut session = engine.start_session(1, false).unwrap();
        assert_eq!(session.current_card_id(), Some(1));

        engine.delete_card(1).unwrap();
        let err = engine.review_current(&mut session, ReviewRating::Good).unwrap_err();
        assert!(matches!(err, EngineError::UnknownCard(1)));
        assert_eq!(session.current_card_id(), Some(1));
        assert_eq!(session.reviewed_count(), 0);
        assert!(session.ratings().is_empty());
    }

    #[test]
    fn test_session_advances_when_only_save_fails() {
        let mut engine = StudyEngine::open(
            BrokenGateway { snapshot: snapshot() },
            Arc::new(ManualClock::new(start())),
            Arc::new(RecordingNotifier::new()),
        )
        .unwrap();
        let mut session = engine.start_session(1, false).unwrap();

        let err = engine.review_current(&mut session, ReviewRating::Easy).unwrap_err();
        assert!(matches!(err, EngineError::PersistenceFailure(_)));
        assert_eq!(session.reviewed_count(), 1);
        assert!(session.is_finished());
        assert_eq!(engine.card(1).unwrap().interval, 4);
    }
}
