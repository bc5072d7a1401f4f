//! Progression engine: per-category XP, levels, prestige and streaks
//!
//! Turns activity signals (task, habit and routine completions) into
//! persistent per-user, per-category progression.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐   award_xp    ┌──────────────────────────┐
//! │ Completion      │ ────────────▶ │ ProgressionOrchestrator  │
//! │ handlers        │               │  (XpService)             │
//! └─────────────────┘               └─────┬──────────────┬─────┘
//!          ▲                              │ streak       │ apply_xp
//!          │ update_user_levels           ▼              ▼
//! ┌────────┴────────┐   registry   ┌─────────────┐  ┌─────────────┐
//! │ RoutineTracker  │ ◀──────────▶ │ Service     │  │ LevelPolicy │
//! │ (StreakService) │              │ Registry    │  └──────┬──────┘
//! └─────────────────┘              └─────────────┘         ▼
//!                                                   CategoryLedger
//!                                                   (LedgerStore)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let registry = Arc::new(ServiceRegistry::new());
//! let ledger = CategoryLedger::new(Arc::new(MemoryLedgerStore::new()), LevelPolicy::default());
//! let orchestrator = Arc::new(ProgressionOrchestrator::new(ledger, registry.clone()));
//! let routines = Arc::new(RoutineTracker::new(registry.clone()));
//! registry.register_xp_service(orchestrator.clone())?;
//! registry.register_streak_service(routines.clone())?;
//! registry.freeze();
//!
//! let gains = XpGains::from([(Category::Physical, 50)]);
//! let report = orchestrator.award_xp("user-1", &gains, true).await?;
//! ```

mod category;
mod error;
mod events;
mod ledger;
mod levels;
mod orchestrator;
mod registry;
mod streaks;

pub mod store;

pub use category::{Category, XpGains};
pub use error::{ProgressionError, Result, StoreError};
pub use events::{LogSink, NotificationSink, ProgressionEvent};
pub use ledger::{CategoryLedger, CategoryStats, LedgerStore, UserProgression};
pub use levels::{
    apply_xp, level_progress_fraction, LevelPolicy, StreakBonus, DEFAULT_MAX_LEVEL,
    DEFAULT_XP_PER_LEVEL,
};
pub use orchestrator::{
    AwardReport, CategoryAward, CategoryOutcome, CategoryResult, ProgressionOrchestrator,
};
pub use registry::{
    ServiceRegistry, StreakService, XpService, STREAK_SERVICE, XP_SERVICE,
};
pub use streaks::{
    longest_streak, routine_streak, today, Routine, RoutineCompletion, RoutineTracker,
};
