//! Service registry for late-bound progression capabilities.
//!
//! Leveling needs streak lengths from the routine subsystem, and routines
//! need to award XP. Neither side holds the other directly: each resolves
//! the capability it needs from a [`ServiceRegistry`] that is filled once
//! during startup.
//!
//! # Lifecycle
//!
//! ```rust,ignore
//! let registry = Arc::new(ServiceRegistry::new());
//! let orchestrator = Arc::new(ProgressionOrchestrator::new(ledger, registry.clone()));
//! let routines = Arc::new(RoutineTracker::new(registry.clone()));
//!
//! registry.register_xp_service(orchestrator.clone())?;
//! registry.register_streak_service(routines.clone())?;
//! registry.freeze();
//! ```
//!
//! Slots are typed fields rather than a string-keyed map, so a resolve can
//! only fail because startup skipped a registration.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use once_cell::sync::{Lazy, OnceCell};

use super::category::XpGains;
use super::error::{ProgressionError, Result};
use super::ledger::UserProgression;
use super::orchestrator::AwardReport;

/// Slot name of the XP capability
pub const XP_SERVICE: &str = "xpService";

/// Slot name of the streak capability
pub const STREAK_SERVICE: &str = "streakService";

/// Capability to award XP to a user's categories
#[async_trait]
pub trait XpService: Send + Sync {
    /// Award streak-eligible XP, measuring the streak as of `as_of`.
    ///
    /// `Err` means nothing was written. Write failures are reported per
    /// category in the returned report.
    async fn update_user_levels(
        &self,
        user_id: &str,
        gains: &XpGains,
        as_of: NaiveDate,
    ) -> Result<AwardReport>;
}

/// Capability to report a user's routine streak on a given day
///
/// The snapshot is the user's progression as read for the current request,
/// for implementations that keep routine data alongside it.
pub trait StreakService: Send + Sync {
    fn get_routine_streak(
        &self,
        snapshot: &UserProgression,
        user_id: &str,
        as_of: NaiveDate,
    ) -> u32;
}

/// Write-once slots for the progression capabilities
#[derive(Default)]
pub struct ServiceRegistry {
    xp: OnceCell<Arc<dyn XpService>>,
    streak: OnceCell<Arc<dyn StreakService>>,
    frozen: AtomicBool,
}

static GLOBAL: Lazy<Arc<ServiceRegistry>> = Lazy::new(|| Arc::new(ServiceRegistry::new()));

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry
    pub fn global() -> Arc<ServiceRegistry> {
        GLOBAL.clone()
    }

    pub fn register_xp_service(&self, service: Arc<dyn XpService>) -> Result<()> {
        self.ensure_open(XP_SERVICE)?;
        self.xp
            .set(service)
            .map_err(|_| ProgressionError::AlreadyRegistered(XP_SERVICE))?;
        tracing::debug!(slot = XP_SERVICE, "Registered service");
        Ok(())
    }

    pub fn register_streak_service(&self, service: Arc<dyn StreakService>) -> Result<()> {
        self.ensure_open(STREAK_SERVICE)?;
        self.streak
            .set(service)
            .map_err(|_| ProgressionError::AlreadyRegistered(STREAK_SERVICE))?;
        tracing::debug!(slot = STREAK_SERVICE, "Registered service");
        Ok(())
    }

    /// Close the registry. Later registrations fail with `AlreadyRegistered`.
    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::Release);
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    pub fn xp_service(&self) -> Result<Arc<dyn XpService>> {
        self.xp
            .get()
            .cloned()
            .ok_or(ProgressionError::NotRegistered(XP_SERVICE))
    }

    pub fn streak_service(&self) -> Result<Arc<dyn StreakService>> {
        self.streak
            .get()
            .cloned()
            .ok_or(ProgressionError::NotRegistered(STREAK_SERVICE))
    }

    fn ensure_open(&self, slot: &'static str) -> Result<()> {
        if self.is_frozen() {
            tracing::error!(slot, "Registration attempted after registry was frozen");
            return Err(ProgressionError::AlreadyRegistered(slot));
        }
        Ok(())
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("xp", &self.xp.get().is_some())
            .field("streak", &self.streak.get().is_some())
            .field("frozen", &self.is_frozen())
            .finish()
    }
}
