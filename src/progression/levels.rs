//! XP and Level system
//!
//! Pure level arithmetic: applying XP deltas, level-up carry, automatic
//! prestige on overflow, and the progress helpers the UI reads.

use serde::{Deserialize, Serialize};

use super::error::{ProgressionError, Result};
use super::ledger::CategoryStats;

/// Default XP cost of a single level
pub const DEFAULT_XP_PER_LEVEL: i64 = 1000;

/// Default highest level before a prestige cycle
pub const DEFAULT_MAX_LEVEL: u32 = 100;

/// Validated leveling constants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelPolicy {
    xp_per_level: u64,
    max_level: u32,
}

impl Default for LevelPolicy {
    fn default() -> Self {
        Self {
            xp_per_level: DEFAULT_XP_PER_LEVEL as u64,
            max_level: DEFAULT_MAX_LEVEL,
        }
    }
}

impl LevelPolicy {
    /// Build a policy, rejecting non-positive XP cost or a zero max level
    pub fn new(xp_per_level: i64, max_level: u32) -> Result<Self> {
        if xp_per_level <= 0 {
            return Err(ProgressionError::InvalidConfiguration(format!(
                "xp_per_level must be positive (got {})",
                xp_per_level
            )));
        }
        if max_level < 1 {
            return Err(ProgressionError::InvalidConfiguration(
                "max_level must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            xp_per_level: xp_per_level as u64,
            max_level,
        })
    }

    pub fn xp_per_level(&self) -> u64 {
        self.xp_per_level
    }

    pub fn max_level(&self) -> u32 {
        self.max_level
    }

    /// Check that stored stats satisfy the level/XP/prestige bounds
    pub fn check(&self, stats: &CategoryStats) -> Result<()> {
        if stats.level < 1 || stats.level > self.max_level {
            return Err(ProgressionError::InvalidArgument(format!(
                "level {} outside 1..={}",
                stats.level, self.max_level
            )));
        }
        if stats.xp >= self.xp_per_level {
            return Err(ProgressionError::InvalidArgument(format!(
                "xp {} must be below {}",
                stats.xp, self.xp_per_level
            )));
        }
        if stats.prestige < 1 {
            return Err(ProgressionError::InvalidArgument(
                "prestige must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Add XP to `current`, carrying level-ups and prestiging past the max level.
    ///
    /// XP left over when a prestige triggers is discarded.
    pub fn apply(&self, current: &CategoryStats, xp_to_add: i64) -> Result<CategoryStats> {
        if xp_to_add < 0 {
            return Err(ProgressionError::InvalidArgument(format!(
                "xp_to_add must not be negative (got {})",
                xp_to_add
            )));
        }
        self.check(current)?;
        if xp_to_add == 0 {
            return Ok(*current);
        }

        // current.xp < xp_per_level <= i64::MAX, so the sum fits in u64
        let xp = current.xp + xp_to_add as u64;
        let levels_gained = xp / self.xp_per_level;
        let levels_left = u64::from(self.max_level - current.level);

        // Passing max_level prestiges; leftover XP is dropped
        if levels_gained > levels_left {
            return Ok(CategoryStats {
                level: 1,
                xp: 0,
                prestige: current.prestige.saturating_add(1),
            });
        }

        Ok(CategoryStats {
            // levels_gained <= max_level - level, so this fits
            level: current.level + levels_gained as u32,
            xp: xp % self.xp_per_level,
            prestige: current.prestige,
        })
    }

    /// XP required to clear `level` (flat cost)
    pub fn xp_needed_for_next_level(&self, _level: u32) -> u64 {
        self.xp_per_level
    }

    /// Progress through the current level of `stats` (0.0 - 1.0)
    pub fn progress(&self, stats: &CategoryStats) -> f32 {
        level_progress_fraction(stats.xp, self.xp_needed_for_next_level(stats.level))
    }

    /// XP earned in the current prestige cycle, saturating at `u64::MAX`
    pub fn total_xp(&self, stats: &CategoryStats) -> u64 {
        u64::from(stats.level.saturating_sub(1))
            .saturating_mul(self.xp_per_level)
            .saturating_add(stats.xp)
    }

    /// Whether the manual prestige action is available.
    ///
    /// True at `level == max_level` regardless of XP banked in that level;
    /// reaching the max level is the only requirement.
    pub fn can_prestige(&self, stats: &CategoryStats) -> bool {
        stats.level == self.max_level
    }

    /// Manual prestige: reset level and XP, bump the prestige counter
    pub fn prestige(&self, stats: &CategoryStats) -> Result<CategoryStats> {
        if !self.can_prestige(stats) {
            return Err(ProgressionError::InvalidArgument(format!(
                "prestige requires level {} (currently {})",
                self.max_level, stats.level
            )));
        }
        Ok(CategoryStats {
            level: 1,
            xp: 0,
            prestige: stats.prestige.saturating_add(1),
        })
    }
}

/// Apply XP with explicit constants. See [`LevelPolicy::apply`].
pub fn apply_xp(
    current: &CategoryStats,
    xp_to_add: i64,
    xp_per_level: i64,
    max_level: u32,
) -> Result<CategoryStats> {
    LevelPolicy::new(xp_per_level, max_level)?.apply(current, xp_to_add)
}

/// Fraction of `xp_needed` covered by `xp`, clamped to 0.0 - 1.0
pub fn level_progress_fraction(xp: u64, xp_needed: u64) -> f32 {
    if xp_needed == 0 {
        return 1.0;
    }
    ((xp as f64) / (xp_needed as f64)).clamp(0.0, 1.0) as f32
}

/// Bonus XP granted per event for an active streak
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreakBonus {
    /// Bonus per streak day
    pub per_day: u32,
    /// Upper bound on the bonus
    pub cap: u32,
}

impl Default for StreakBonus {
    fn default() -> Self {
        Self { per_day: 2, cap: 20 }
    }
}

impl StreakBonus {
    /// Streak day 1 = 2 XP, day 2 = 4 XP, etc. (capped at 20 by default)
    pub fn bonus(&self, streak_days: u32) -> i64 {
        i64::from(streak_days.saturating_mul(self.per_day).min(self.cap))
    }
}
