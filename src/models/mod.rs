pub mod card;
pub mod deck;
pub mod deck_set;
pub mod rating;
pub mod sm2;
pub mod study_session;

pub use card::Card;
pub use deck::Deck;
pub use deck_set::DeckSet;
pub use rating::ReviewRating;
pub use sm2::ReviewOutcome;
pub use study_session::StudySession;
