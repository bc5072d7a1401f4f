//! Configuration loading and management

mod io;
mod settings;

pub use settings::{LevelingSettings, RoutineConfig, StorageSettings};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::progression::{
    Category, LevelPolicy, ProgressionError, Result, Routine, StreakBonus, XpGains,
};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Level cost and cap
    #[serde(default)]
    pub leveling: LevelingSettings,

    /// Streak bonus applied to streak-eligible awards
    #[serde(default)]
    pub streak_bonus: StreakBonus,

    /// Ledger location
    #[serde(default)]
    pub storage: StorageSettings,

    /// Routine definitions
    #[serde(default, rename = "routine", skip_serializing_if = "Vec::is_empty")]
    pub routines: Vec<RoutineConfig>,
}

impl Config {
    /// Leveling constants as a validated policy
    pub fn level_policy(&self) -> Result<LevelPolicy> {
        LevelPolicy::new(self.leveling.xp_per_level, self.leveling.max_level)
    }

    /// Check every value that would otherwise fail at first use
    pub fn validate(&self) -> Result<()> {
        self.level_policy()?;
        self.routines()?;
        Ok(())
    }

    /// Parsed routine definitions
    pub fn routines(&self) -> Result<Vec<Routine>> {
        self.routines
            .iter()
            .map(|r| {
                let mut gains = XpGains::new();
                for (key, xp) in &r.gains {
                    let category: Category = key.parse().map_err(|_| {
                        ProgressionError::InvalidConfiguration(format!(
                            "routine '{}' uses unknown category '{}'",
                            r.id, key
                        ))
                    })?;
                    if *xp < 0 {
                        return Err(ProgressionError::InvalidConfiguration(format!(
                            "routine '{}' awards negative XP to '{}'",
                            r.id, key
                        )));
                    }
                    gains.insert(category, *xp);
                }
                Ok(Routine {
                    id: r.id.clone(),
                    gains,
                })
            })
            .collect()
    }

    /// Ledger database path, falling back to the global config dir
    pub fn db_path(&self) -> PathBuf {
        self.storage
            .db_path
            .clone()
            .unwrap_or_else(|| Self::global_config_dir().join("progression.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        let policy = config.level_policy().unwrap();
        assert_eq!(policy.xp_per_level(), 1000);
        assert_eq!(policy.max_level(), 100);
        assert_eq!(config.streak_bonus, StreakBonus::default());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [leveling]
            max_level = 50

            [[routine]]
            id = "morning-run"
            gains = { physical = 30, mental = 10 }
            "#,
        )
        .unwrap();

        assert_eq!(config.leveling.max_level, 50);
        assert_eq!(config.leveling.xp_per_level, 1000);

        let routines = config.routines().unwrap();
        assert_eq!(routines.len(), 1);
        assert_eq!(routines[0].gains.get(&Category::Physical), Some(&30));
    }

    #[test]
    fn test_invalid_leveling_rejected() {
        let mut config = Config::default();
        config.leveling.xp_per_level = 0;
        assert!(matches!(
            config.validate(),
            Err(ProgressionError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_unknown_routine_category_rejected() {
        let config: Config = toml::from_str(
            r#"
            [[routine]]
            id = "bake"
            gains = { cooking = 5 }
            "#,
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(ProgressionError::InvalidConfiguration(_))
        ));
    }
}
