//! JSON import/export of a deck together with its cards' scheduling state.

use crate::error::GatewayError;
use crate::models::{Card, Deck};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeckExport {
    pub deck: Deck,
    #[serde(default)]
    pub cards: Vec<Card>,
}

/// Exports a deck to a pretty-printed JSON file at the specified path.
pub fn export_json_to_path(export: &DeckExport, path: &Path) -> Result<(), GatewayError> {
    let json_string = serde_json::to_string_pretty(export)?;
    fs::write(path, json_string)?;
    info!(deck = %export.deck.name, cards = export.cards.len(), path = %path.display(), "deck exported");
    Ok(())
}

/// Imports a deck from a JSON file.
/// Fails if the file doesn't exist or contains invalid JSON.
pub fn import_json(path: &Path) -> Result<DeckExport, GatewayError> {
    let contents = fs::read_to_string(path)?;
    let export: DeckExport = serde_json::from_str(&contents)?;
    info!(deck = %export.deck.name, path = %path.display(), "deck imported");
    Ok(export)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn create_test_export() -> DeckExport {
        let now = Utc.with_ymd_and_hms(2024, 4, 4, 16, 0, 0).unwrap();
        let mut reviewed = Card::new(2, 1, "pH of water".to_string(), "7".to_string(), now);
        reviewed.interval = 6;
        reviewed.ease_factor = 2.3;
        reviewed.due_date = now + Duration::days(6);

        DeckExport {
            deck: Deck::new(1, "Acids and Bases".to_string(), "Chemistry".to_string()),
            cards: vec![
                Card::new(1, 1, "Strong acid".to_string(), "HCl".to_string(), now),
                reviewed,
            ],
        }
    }

    #[test]
    fn test_export_and_import_keeps_schedule() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck.json");
        let original = create_test_export();

        export_json_to_path(&original, &path).unwrap();
        let imported = import_json(&path).unwrap();

        assert_eq!(imported, original);
        assert_eq!(imported.cards[1].interval, 6);
    }

    #[test]
    fn test_import_deck_without_cards() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.json");
        fs::write(
            &path,
            r#"{ "deck": { "id": 4, "name": "Optics", "subject": "Physics" } }"#,
        )
        .unwrap();

        let imported = import_json(&path).unwrap();
        assert_eq!(imported.deck.name, "Optics");
        assert!(imported.cards.is_empty());
    }

    #[test]
    fn test_import_nonexistent_file() {
        let result = import_json(Path::new("nonexistent_file_xyz123.json"));
        assert!(matches!(result, Err(GatewayError::Io(_))));
    }

    #[test]
    fn test_import_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invalid.json");
        fs::write(&path, "{ this is not valid json }").unwrap();

        assert!(matches!(import_json(&path), Err(GatewayError::Json(_))));
    }
}
