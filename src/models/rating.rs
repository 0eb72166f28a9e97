//! How well a card was recalled. The only external input to the scheduler
//! besides the card's own state.
use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewRating {
    Hard,
    Good,
    Easy,
}

impl ReviewRating {
    pub const ALL: [ReviewRating; 3] = [ReviewRating::Hard, ReviewRating::Good, ReviewRating::Easy];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewRating::Hard => "hard",
            ReviewRating::Good => "good",
            ReviewRating::Easy => "easy",
        }
    }
}

impl fmt::Display for ReviewRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewRating {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hard" => Ok(ReviewRating::Hard),
            "good" => Ok(ReviewRating::Good),
            "easy" => Ok(ReviewRating::Easy),
            _ => Err(EngineError::InvalidRating(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rating_case_insensitive() {
        assert_eq!("Hard".parse::<ReviewRating>().unwrap(), ReviewRating::Hard);
        assert_eq!(" good ".parse::<ReviewRating>().unwrap(), ReviewRating::Good);
        assert_eq!("EASY".parse::<ReviewRating>().unwrap(), ReviewRating::Easy);
    }

    #[test]
    fn test_parse_rating_rejects_unknown() {
        let err = "again".parse::<ReviewRating>().unwrap_err();
        assert!(matches!(err, EngineError::InvalidRating(s) if s == "again"));
    }
}
