//! Deck is a named, subject-tagged group of cards
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    pub id: i64,
    pub name: String,
    pub subject: String,
}

impl Deck {
    pub fn new(id: i64, name: String, subject: String) -> Self {
        Self { id, name, subject }
    }
}
