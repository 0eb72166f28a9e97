//! SQLite Persistence Gateway
//!
//! Stores decks, cards with their spaced repetition state, and the timer
//! durations. Timestamps are stored as Unix milliseconds.

use super::gateway::{PersistenceGateway, Result, Snapshot};
use crate::error::GatewayError;
use crate::models::{Card, Deck};
use crate::timer::TimerConfig;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use tracing::debug;

pub struct SqliteGateway {
    conn: Connection,
}

impl SqliteGateway {
    /// Opens (or creates) the database file and makes sure the tables exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "opened study database");
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        init_database(&conn)?;
        Ok(Self { conn })
    }
}

/// Creates tables for decks, cards and app state.
fn init_database(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS decks (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            subject TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS cards (
            id INTEGER PRIMARY KEY,
            deck_id INTEGER NOT NULL,
            front TEXT NOT NULL,
            back TEXT NOT NULL,
            due_date INTEGER NOT NULL,
            interval_days INTEGER NOT NULL DEFAULT 0,
            ease_factor REAL NOT NULL DEFAULT 2.5,
            created_at INTEGER NOT NULL,
            FOREIGN KEY (deck_id) REFERENCES decks(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS app_state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );",
    )?;
    Ok(())
}

fn to_millis(time: DateTime<Utc>) -> i64 {
    time.timestamp_millis()
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| GatewayError::Corrupt(format!("timestamp out of range: {ms}")))
}

fn get_state(conn: &Connection, key: &str) -> Result<Option<String>> {
    let value = conn
        .query_row(
            "SELECT value FROM app_state WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

fn set_state(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO app_state (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )?;
    Ok(())
}

fn get_secs(conn: &Connection, key: &str, default: u32) -> Result<u32> {
    match get_state(conn, key)? {
        Some(value) => value
            .parse()
            .map_err(|_| GatewayError::Corrupt(format!("{key} is not a duration: {value:?}"))),
        None => Ok(default),
    }
}

fn load_decks(conn: &Connection) -> Result<Vec<Deck>> {
    let mut stmt = conn.prepare("SELECT id, name, subject FROM decks ORDER BY id")?;
    let decks = stmt
        .query_map([], |row| {
            Ok(Deck {
                id: row.get(0)?,
                name: row.get(1)?,
                subject: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<Deck>>>()?;
    Ok(decks)
}

fn load_cards(conn: &Connection) -> Result<Vec<Card>> {
    let mut stmt = conn.prepare(
        "SELECT id, deck_id, front, back, due_date, interval_days, ease_factor, created_at
         FROM cards
         ORDER BY created_at ASC, id ASC",
    )?;

    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, u32>(5)?,
                row.get::<_, f64>(6)?,
                row.get::<_, i64>(7)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    rows.into_iter()
        .map(|(id, deck_id, front, back, due, interval, ease_factor, created)| -> Result<Card> {
            Ok(Card {
                id,
                deck_id,
                front,
                back,
                due_date: from_millis(due)?,
                interval,
                ease_factor,
                created_at: from_millis(created)?,
            })
        })
        .collect()
}

impl PersistenceGateway for SqliteGateway {
    fn load(&mut self) -> Result<Snapshot> {
        let defaults = TimerConfig::default();
        let timer = TimerConfig {
            work_secs: get_secs(&self.conn, "work_secs", defaults.work_secs)?,
            break_secs: get_secs(&self.conn, "break_secs", defaults.break_secs)?,
        };
        if timer.validate().is_err() {
            return Err(GatewayError::Corrupt(format!("stored timer durations are invalid: {timer:?}")));
        }

        Ok(Snapshot {
            decks: load_decks(&self.conn)?,
            cards: load_cards(&self.conn)?,
            timer,
        })
    }

    fn save_deck(&mut self, deck: &Deck) -> Result<()> {
        self.conn.execute(
            "INSERT INTO decks (id, name, subject) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, subject = excluded.subject",
            params![deck.id, deck.name, deck.subject],
        )?;
        Ok(())
    }

    fn delete_deck(&mut self, deck_id: i64) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM cards WHERE deck_id = ?1", params![deck_id])?;
        tx.execute("DELETE FROM decks WHERE id = ?1", params![deck_id])?;
        tx.commit()?;
        Ok(())
    }

    fn save_card(&mut self, card: &Card) -> Result<()> {
        self.conn.execute(
            "INSERT INTO cards (id, deck_id, front, back, due_date, interval_days, ease_factor, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id) DO UPDATE SET
                deck_id = excluded.deck_id,
                front = excluded.front,
                back = excluded.back,
                due_date = excluded.due_date,
                interval_days = excluded.interval_days,
                ease_factor = excluded.ease_factor",
            params![
                card.id,
                card.deck_id,
                card.front,
                card.back,
                to_millis(card.due_date),
                card.interval,
                card.ease_factor,
                to_millis(card.created_at)
            ],
        )?;
        Ok(())
    }

    fn delete_card(&mut self, card_id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM cards WHERE id = ?1", params![card_id])?;
        Ok(())
    }

    fn save_timer_config(&mut self, config: &TimerConfig) -> Result<()> {
        set_state(&self.conn, "work_secs", &config.work_secs.to_string())?;
        set_state(&self.conn, "break_secs", &config.break_secs.to_string())?;
        Ok(())
    }
}
