//! In-process ledger store

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::progression::category::Category;
use crate::progression::error::StoreError;
use crate::progression::ledger::{CategoryStats, LedgerStore, UserProgression};

/// Ledger store backed by a `HashMap`, for tests and embedding apps
#[derive(Default)]
pub struct MemoryLedgerStore {
    users: Mutex<HashMap<String, UserProgression>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of users with a stored document
    pub fn user_count(&self) -> usize {
        let guard = self.users.lock().unwrap_or_else(|e| e.into_inner());
        guard.len()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn get_category_state(&self, user_id: &str) -> Result<Option<UserProgression>, StoreError> {
        let guard = self.users.lock().unwrap_or_else(|e| e.into_inner());
        Ok(guard.get(user_id).cloned())
    }

    async fn put_category_state(
        &self,
        user_id: &str,
        category: Category,
        stats: CategoryStats,
    ) -> Result<(), StoreError> {
        let mut guard = self.users.lock().unwrap_or_else(|e| e.into_inner());
        guard
            .entry(user_id.to_string())
            .or_default()
            .set(category, stats);
        Ok(())
    }
}
