//! Category ledger - durable per-user, per-category progression state
//!
//! The ledger is the only path through which stats are written. Stores
//! replace a whole [`CategoryStats`] record per write so that level, XP and
//! prestige never drift apart.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::category::Category;
use super::error::{Result, StoreError};
use super::levels::LevelPolicy;

/// Level, XP and prestige for one category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub level: u32,
    pub xp: u64,
    pub prestige: u32,
}

impl Default for CategoryStats {
    fn default() -> Self {
        Self {
            level: 1,
            xp: 0,
            prestige: 1,
        }
    }
}

/// All category stats for a single user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProgression {
    #[serde(default)]
    pub categories: BTreeMap<Category, CategoryStats>,
}

impl UserProgression {
    /// Stats for `category`, defaulting when the user has none yet
    pub fn get(&self, category: Category) -> CategoryStats {
        self.categories.get(&category).copied().unwrap_or_default()
    }

    pub fn set(&mut self, category: Category, stats: CategoryStats) {
        self.categories.insert(category, stats);
    }

    /// Stats for every known category, filling defaults
    pub fn all(&self) -> Vec<(Category, CategoryStats)> {
        Category::ALL.iter().map(|c| (*c, self.get(*c))).collect()
    }
}

/// Backend holding persisted progression documents
///
/// Implementations own the storage format. Writes are full replaces of one
/// category's record; concurrent writers resolve as last-writer-wins.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Load a user's progression. `Ok(None)` means the user has no document yet.
    async fn get_category_state(
        &self,
        user_id: &str,
    ) -> std::result::Result<Option<UserProgression>, StoreError>;

    /// Replace one category's stats for a user
    async fn put_category_state(
        &self,
        user_id: &str,
        category: Category,
        stats: CategoryStats,
    ) -> std::result::Result<(), StoreError>;
}

/// Policy-aware access to a [`LedgerStore`]
#[derive(Clone)]
pub struct CategoryLedger {
    store: Arc<dyn LedgerStore>,
    policy: LevelPolicy,
}

impl CategoryLedger {
    pub fn new(store: Arc<dyn LedgerStore>, policy: LevelPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &LevelPolicy {
        &self.policy
    }

    /// Read a user's progression. A missing document yields defaults.
    pub async fn read(&self, user_id: &str) -> std::result::Result<UserProgression, StoreError> {
        match self.store.get_category_state(user_id).await? {
            Some(progression) => Ok(progression),
            None => {
                tracing::debug!(user_id, "No progression document, using defaults");
                Ok(UserProgression::default())
            }
        }
    }

    /// Persist one category after checking its invariants
    pub async fn write(&self, user_id: &str, category: Category, stats: CategoryStats) -> Result<()> {
        self.policy.check(&stats)?;
        self.store.put_category_state(user_id, category, stats).await?;
        Ok(())
    }
}
