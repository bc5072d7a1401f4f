//! CLI command implementations

pub mod award;
pub mod init;
pub mod reset;
pub mod routine;
pub mod show;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use levelup::store::SqliteLedgerStore;
use levelup::{
    CategoryLedger, Config, LogSink, ProgressionOrchestrator, RoutineTracker, ServiceRegistry,
};

/// Wired-up engine over the SQLite ledger
pub struct Engine {
    pub store: Arc<SqliteLedgerStore>,
    pub orchestrator: Arc<ProgressionOrchestrator>,
    pub routines: Arc<RoutineTracker>,
}

impl Engine {
    /// Build the engine and bind the process-wide service registry
    pub fn open(config: &Config, db_path: Option<&Path>) -> Result<Self> {
        let policy = config.level_policy()?;
        let db_path = db_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| config.db_path());
        let store = Arc::new(SqliteLedgerStore::open(&db_path)?);

        let registry = ServiceRegistry::global();
        let ledger = CategoryLedger::new(store.clone(), policy);
        let orchestrator = Arc::new(
            ProgressionOrchestrator::new(ledger, registry.clone())
                .with_streak_bonus(config.streak_bonus)
                .with_sink(Arc::new(LogSink)),
        );
        let routines = Arc::new(RoutineTracker::new(registry.clone()));
        for routine in config.routines()? {
            routines.add_routine(routine);
        }

        registry.register_xp_service(orchestrator.clone())?;
        registry.register_streak_service(routines.clone())?;
        registry.freeze();

        Ok(Self {
            store,
            orchestrator,
            routines,
        })
    }

    /// Load a user's routine history and owed gains so streak lookups and
    /// retries see them
    pub fn load_routine_history(&self, user_id: &str) -> Result<()> {
        let histories = self
            .store
            .completion_histories(user_id)
            .with_context(|| format!("Failed to load routine history for {}", user_id))?;
        for (routine_id, history) in histories {
            self.routines.load_history(user_id, &routine_id, history);
        }

        let pending = self
            .store
            .pending_completions(user_id)
            .with_context(|| format!("Failed to load pending routine XP for {}", user_id))?;
        for (routine_id, day, gains) in pending {
            self.routines.load_pending(user_id, &routine_id, day, gains);
        }
        Ok(())
    }
}
