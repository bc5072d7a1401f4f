//! Settings configuration types

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::progression::{DEFAULT_MAX_LEVEL, DEFAULT_XP_PER_LEVEL};

/// Leveling constants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelingSettings {
    /// XP cost of one level
    #[serde(default = "default_xp_per_level")]
    pub xp_per_level: i64,

    /// Highest level before a category prestiges
    #[serde(default = "default_max_level")]
    pub max_level: u32,
}

impl Default for LevelingSettings {
    fn default() -> Self {
        Self {
            xp_per_level: default_xp_per_level(),
            max_level: default_max_level(),
        }
    }
}

fn default_xp_per_level() -> i64 {
    DEFAULT_XP_PER_LEVEL
}

fn default_max_level() -> u32 {
    DEFAULT_MAX_LEVEL
}

/// Ledger storage settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageSettings {
    /// SQLite ledger path (defaults to ~/.levelup/progression.db)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,
}

/// A routine definition as written in config.toml
///
/// ```toml
/// [[routine]]
/// id = "morning-run"
/// gains = { physical = 30, mental = 10 }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutineConfig {
    pub id: String,

    /// XP per completion, keyed by category name
    #[serde(default)]
    pub gains: std::collections::BTreeMap<String, i64>,
}
