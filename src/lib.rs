//! # Dragonkeep - Idle Dragon Economy Engine
//!
//! Dragonkeep is the server-side engine for a dragon collector game: dragons
//! generate resources over time, merge into higher tiers, and feed a quest
//! and leaderboard progression loop. All state lives in an embedded Sled
//! database; the engine is a library of synchronous services with a thin
//! async CLI on top.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dragonkeep::game::{self, GameStoreBuilder};
//! use chrono::Utc;
//!
//! fn main() -> anyhow::Result<()> {
//!     let store = GameStoreBuilder::new("data/game").open()?;
//!     game::initialize_player(&store, "alice", "Alice", Utc::now())?;
//!     let summary = game::collect_all(&store, "alice", Utc::now())?;
//!     println!("collected {} crystals", summary.crystals);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`game`] - records, the Sled store, and all game services (accrual,
//!   dragons, quests, wallet, experience, leaderboards, catalog seeding)
//! - [`config`] - TOML configuration management
//! - [`validation`] - identifier, name, and amount validation
//!
//! ## Design Notes
//!
//! Every balance change goes through the wallet ledger, every player and
//! wallet mutation through a compare-and-swap update, and the dragon merge
//! through a storage transaction; concurrent callers either serialize or
//! fail with a retryable conflict error.

pub mod config;
pub mod game;
pub mod validation;
