//! levelup - per-category progression engine
//!
//! Converts activity signals (task, habit and routine completions) into
//! persistent XP, level and prestige state for each of a user's life
//! categories.
//!
//! ## Components
//!
//! - **Ledger**: durable per-category stats behind a [`LedgerStore`]
//!   (in-memory or SQLite).
//! - **Level calculator**: pure XP arithmetic with automatic prestige.
//! - **Streaks**: routine completion logs and streak bonuses.
//! - **Service registry**: late-bound XP/streak capabilities so routines and
//!   leveling can call each other without depending on each other.
//! - **Orchestrator**: the `award_xp` entry point.

pub mod config;
pub mod progression;

pub use config::Config;
pub use progression::*;
