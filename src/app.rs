//! Command-line front end: runs the focus timer in the terminal and drives
//! decks, reviews and study sessions against the SQLite store.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use study_engine::clock::SystemClock;
use study_engine::config::AppConfig;
use study_engine::database::SqliteGateway;
use study_engine::engine::StudyEngine;
use study_engine::export::{export_json_to_path, import_json};
use study_engine::models::sm2::format_interval;
use study_engine::models::{Card, ReviewRating};
use study_engine::timer::{LogNotifier, TickOutcome, TimerDriver, format_clock};
use tokio::sync::mpsc;

type Engine = StudyEngine<SqliteGateway>;

#[derive(Parser)]
#[command(name = "study", about = "Focus timer and spaced repetition reviews", version)]
pub struct Cli {
    /// Config file (TOML)
    #[arg(long, global = true, default_value = "study.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the work/break timer until interrupted
    Timer {
        /// Work period in seconds (saved)
        #[arg(long)]
        work: Option<u32>,
        /// Break period in seconds (saved)
        #[arg(long = "break")]
        break_secs: Option<u32>,
        /// Stop after this many periods
        #[arg(long)]
        periods: Option<u32>,
    },

    /// List decks with the number of due cards
    Decks,

    /// Create a deck
    AddDeck {
        name: String,
        #[arg(long, default_value = "General")]
        subject: String,
    },

    /// Delete a deck and all of its cards
    DeleteDeck { deck_id: i64 },

    /// Add a card to a deck
    AddCard {
        deck_id: i64,
        front: String,
        back: String,
    },

    /// Change a card's text
    EditCard {
        card_id: i64,
        front: String,
        back: String,
    },

    /// Delete a card
    DeleteCard { card_id: i64 },

    /// List every card of a deck
    Cards { deck_id: i64 },

    /// List the cards of a deck that are due now
    Due { deck_id: i64 },

    /// Rate a single card: hard, good or easy
    Review { card_id: i64, rating: ReviewRating },

    /// Interactive review of every due card in a deck
    Study {
        deck_id: i64,
        /// Keep due-date order instead of shuffling
        #[arg(long)]
        in_order: bool,
    },

    /// Write a deck and its review state to JSON
    Export { deck_id: i64, path: PathBuf },

    /// Add a deck from a JSON export
    Import { path: PathBuf },
}

pub async fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let gateway = SqliteGateway::open(&config.database_path)
        .with_context(|| format!("opening {}", config.database_path.display()))?;
    let mut engine = StudyEngine::open(gateway, Arc::new(SystemClock), Arc::new(LogNotifier))?;

    match cli.command {
        Command::Timer {
            work,
            break_secs,
            periods,
        } => {
            if work.is_some() || break_secs.is_some() {
                let current = engine.timer_state().config;
                engine.reconfigure_timer(
                    work.unwrap_or(current.work_secs),
                    break_secs.unwrap_or(current.break_secs),
                )?;
            }
            run_timer(&engine, &config, periods).await?;
        }
        Command::Decks => {
            for (deck, due) in engine.due_counts() {
                println!("{:>4}  {} ({}) - {} due", deck.id, deck.name, deck.subject, due);
            }
        }
        Command::AddDeck { name, subject } => {
            let deck = engine.create_deck(&name, &subject)?;
            println!("Deck '{}' created with id {}", deck.name, deck.id);
        }
        Command::DeleteDeck { deck_id } => {
            engine.delete_deck(deck_id)?;
            println!("Deck {deck_id} deleted");
        }
        Command::AddCard {
            deck_id,
            front,
            back,
        } => {
            let card = engine.add_card(deck_id, &front, &back)?;
            println!("Card {} added", card.id);
        }
        Command::EditCard {
            card_id,
            front,
            back,
        } => {
            engine.update_card_text(card_id, &front, &back)?;
            println!("Card {card_id} updated");
        }
        Command::DeleteCard { card_id } => {
            engine.delete_card(card_id)?;
            println!("Card {card_id} deleted");
        }
        Command::Cards { deck_id } => {
            for card in engine.cards_for_deck(deck_id)? {
                print_card(card);
            }
        }
        Command::Due { deck_id } => {
            let due = engine.due_cards(deck_id)?;
            if due.is_empty() {
                println!("Nothing due.");
            }
            for card in due {
                print_card(card);
            }
        }
        Command::Review { card_id, rating } => {
            let card = engine.review_card(card_id, rating)?;
            println!(
                "Card {} next due {} (in {})",
                card.id,
                format_date(card.due_date),
                format_interval(card.interval)
            );
        }
        Command::Study { deck_id, in_order } => {
            study(&mut engine, deck_id, config.shuffle_sessions && !in_order)?;
        }
        Command::Export { deck_id, path } => {
            let export = engine.export_deck(deck_id)?;
            export_json_to_path(&export, &path)?;
            println!("Deck '{}' exported to {}", export.deck.name, path.display());
        }
        Command::Import { path } => {
            let deck = engine.import_deck(import_json(&path)?)?;
            println!("Deck '{}' imported with id {}", deck.name, deck.id);
        }
    }

    Ok(())
}

/// Runs the timer in the terminal until interrupted or `periods` have ended.
async fn run_timer(engine: &Engine, config: &AppConfig, periods: Option<u32>) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut driver = TimerDriver::new(Arc::clone(engine.timer()))
        .with_period(config.poll_interval())
        .with_outcomes(tx);

    let mut finished = 0;
    loop {
        let state = engine.timer_state();
        println!("{} period: {}", state.mode, format_clock(state.remaining_seconds));
        driver.start();

        let expired = loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    driver.pause();
                    let state = engine.timer_state();
                    println!("\nPaused with {} left in {} period", format_clock(state.remaining_seconds), state.mode);
                    return Ok(());
                }
                outcome = rx.recv() => match outcome {
                    Some(TickOutcome::Running { remaining_secs }) => {
                        print!("\r{}  ", format_clock(remaining_secs));
                        std::io::stdout().flush()?;
                    }
                    Some(TickOutcome::Expired(event)) => break event,
                    Some(TickOutcome::Stale) => {}
                    None => bail!("timer loop stopped unexpectedly"),
                }
            }
        };

        println!("\n{}", expired.message());
        finished += 1;
        if periods.is_some_and(|limit| finished >= limit) {
            return Ok(());
        }
    }
}

/// Walks through the deck's due cards on stdin.
fn study(engine: &mut Engine, deck_id: i64, shuffle: bool) -> Result<()> {
    let mut session = engine.start_session(deck_id, shuffle)?;
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    while let Some(card_id) = session.current_card_id() {
        let card = engine.card(card_id)?.clone();
        println!("\n{}", session.progress_message());
        println!("Q: {}", card.front);
        print!("(enter to flip) ");
        std::io::stdout().flush()?;
        if lines.next().transpose()?.is_none() {
            break;
        }

        session.reveal();
        let [hard, good, easy] = engine.preview(card_id)?;
        println!("A: {}", card.back);

        let rating = loop {
            print!(
                "hard ({}) / good ({}) / easy ({}): ",
                format_interval(hard),
                format_interval(good),
                format_interval(easy)
            );
            std::io::stdout().flush()?;
            let Some(line) = lines.next().transpose()? else {
                return Ok(());
            };
            match line.parse::<ReviewRating>() {
                Ok(rating) => break rating,
                Err(e) => println!("{e}"),
            }
        };

        engine.review_current(&mut session, rating)?;
    }

    println!("\n{}", session.progress_message());
    Ok(())
}

fn print_card(card: &Card) {
    let interval = if card.is_new() {
        "new".to_string()
    } else {
        format_interval(card.interval)
    };
    println!(
        "{:>4}  {} | {}  (due {}, interval {}, ease {:.2})",
        card.id,
        card.front,
        card.back,
        format_date(card.due_date),
        interval,
        card.ease_factor
    );
}

/// Formats a timestamp as local YYYY-MM-DD HH:MM
fn format_date(time: DateTime<Utc>) -> String {
    let local: DateTime<Local> = time.into();
    local.format("%Y-%m-%d %H:%M").to_string()
}
