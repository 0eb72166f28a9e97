//! Error types for the scheduling engine.

use thiserror::Error;

/// Errors raised by a Persistence Gateway.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corrupt stored data: {0}")]
    Corrupt(String),
}

/// Errors surfaced by engine operations.
///
/// All of these are recoverable: the caller may re-issue the operation.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("card not found: {0}")]
    UnknownCard(i64),

    #[error("deck not found: {0}")]
    UnknownDeck(i64),

    #[error("invalid rating: {0:?} (expected hard, good or easy)")]
    InvalidRating(String),

    /// The in-memory change was applied before the save failed.
    #[error("persistence failure: {0}")]
    PersistenceFailure(#[from] GatewayError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
