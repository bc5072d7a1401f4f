//! Progression orchestrator - entry point for every XP-earning event
//!
//! An award runs fetch, compute, persist in that order:
//!
//! 1. Read the user's progression once from the ledger.
//! 2. For each category, add the streak bonus (if eligible) and run the
//!    level calculator. Any validation failure aborts here, before a write.
//! 3. Write categories one at a time. The first failed write stops the
//!    request; categories already written stay committed.
//!
//! Results are reported per category. Concurrent awards for the same user
//! are last-writer-wins at the store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use super::category::{Category, XpGains};
use super::error::{ProgressionError, Result};
use super::events::{NotificationSink, ProgressionEvent};
use super::ledger::{CategoryLedger, CategoryStats, UserProgression};
use super::levels::{LevelPolicy, StreakBonus};
use super::registry::{ServiceRegistry, XpService};
use super::streaks::today;

/// Successful update of one category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryAward {
    pub streak_bonus: i64,
    pub previous: CategoryStats,
    pub new_stats: CategoryStats,
    pub prestiged_this_call: bool,
    /// Manual prestige is available (same predicate as `can_prestige`)
    pub prestige_eligible: bool,
}

/// What happened to one category of a request
#[derive(Debug)]
pub enum CategoryOutcome {
    Committed(CategoryAward),
    Failed(ProgressionError),
    /// Skipped because an earlier category failed to persist
    NotAttempted,
}

#[derive(Debug)]
pub struct CategoryResult {
    pub category: Category,
    /// Delta as requested, without the streak bonus
    pub base_delta: i64,
    pub outcome: CategoryOutcome,
}

impl CategoryResult {
    pub fn is_committed(&self) -> bool {
        matches!(self.outcome, CategoryOutcome::Committed(_))
    }

    pub fn award(&self) -> Option<&CategoryAward> {
        match &self.outcome {
            CategoryOutcome::Committed(award) => Some(award),
            _ => None,
        }
    }
}

/// Per-category results of one `award_xp` call
#[derive(Debug)]
pub struct AwardReport {
    pub user_id: String,
    /// Streak used for the bonus (0 when not eligible)
    pub streak: u32,
    pub results: Vec<CategoryResult>,
}

impl AwardReport {
    /// True when every category committed
    pub fn is_complete(&self) -> bool {
        self.results.iter().all(CategoryResult::is_committed)
    }

    pub fn get(&self, category: Category) -> Option<&CategoryResult> {
        self.results.iter().find(|r| r.category == category)
    }

    /// Original deltas of the categories that did not commit.
    ///
    /// Retrying with these never re-applies a committed category.
    pub fn retry_gains(&self) -> XpGains {
        self.results
            .iter()
            .filter(|r| !r.is_committed())
            .map(|r| (r.category, r.base_delta))
            .collect()
    }
}

/// Computed but not yet persisted category update
struct PendingUpdate {
    category: Category,
    base_delta: i64,
    streak_bonus: i64,
    previous: CategoryStats,
    next: CategoryStats,
}

/// Owns all writes to the category ledger
pub struct ProgressionOrchestrator {
    ledger: CategoryLedger,
    registry: Arc<ServiceRegistry>,
    streak_bonus: StreakBonus,
    sink: Option<Arc<dyn NotificationSink>>,
}

impl ProgressionOrchestrator {
    pub fn new(ledger: CategoryLedger, registry: Arc<ServiceRegistry>) -> Self {
        Self {
            ledger,
            registry,
            streak_bonus: StreakBonus::default(),
            sink: None,
        }
    }

    pub fn with_streak_bonus(mut self, streak_bonus: StreakBonus) -> Self {
        self.streak_bonus = streak_bonus;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn policy(&self) -> &LevelPolicy {
        self.ledger.policy()
    }

    /// Whether the manual prestige action should be offered
    pub fn can_prestige(&self, stats: &CategoryStats) -> bool {
        self.policy().can_prestige(stats)
    }

    /// Read-only view of a user's progression
    pub async fn snapshot(&self, user_id: &str) -> Result<UserProgression> {
        validate_user(user_id)?;
        Ok(self.ledger.read(user_id).await?)
    }

    /// Award XP for one event across one or more categories.
    ///
    /// Returns `Err` only when nothing was written: invalid input, an
    /// unregistered streak service, a failed read, or invalid stored stats.
    /// Write failures are reported per category in the [`AwardReport`].
    pub async fn award_xp(
        &self,
        user_id: &str,
        gains: &XpGains,
        streak_eligible: bool,
    ) -> Result<AwardReport> {
        self.award_xp_as_of(user_id, gains, streak_eligible, today())
            .await
    }

    /// [`award_xp`](Self::award_xp) with the streak measured as of `as_of`
    pub async fn award_xp_as_of(
        &self,
        user_id: &str,
        gains: &XpGains,
        streak_eligible: bool,
        as_of: NaiveDate,
    ) -> Result<AwardReport> {
        validate_user(user_id)?;
        for (category, delta) in gains {
            if *delta < 0 {
                return Err(ProgressionError::negative_delta(*category, *delta));
            }
        }

        let earns_xp = gains.values().any(|d| *d > 0);
        let streak_service = if streak_eligible && earns_xp {
            Some(self.registry.streak_service()?)
        } else {
            None
        };

        // Fetching
        let snapshot = self.ledger.read(user_id).await.inspect_err(|e| {
            tracing::warn!(user_id, error = %e, "Failed to read progression");
        })?;

        // Computing
        let streak = streak_service
            .map(|s| s.get_routine_streak(&snapshot, user_id, as_of))
            .unwrap_or(0);
        let bonus = self.streak_bonus.bonus(streak);

        let mut pending = Vec::with_capacity(gains.len());
        for (&category, &base_delta) in gains {
            let streak_bonus = if base_delta > 0 { bonus } else { 0 };
            let previous = snapshot.get(category);
            let next = self
                .policy()
                .apply(&previous, base_delta.saturating_add(streak_bonus))?;
            pending.push(PendingUpdate {
                category,
                base_delta,
                streak_bonus,
                previous,
                next,
            });
        }

        // Persisting
        let mut results = Vec::with_capacity(pending.len());
        let mut aborted = false;
        for update in pending {
            if aborted {
                results.push(CategoryResult {
                    category: update.category,
                    base_delta: update.base_delta,
                    outcome: CategoryOutcome::NotAttempted,
                });
                continue;
            }

            let outcome = match self.persist(user_id, &update).await {
                Ok(()) => {
                    let award = CategoryAward {
                        streak_bonus: update.streak_bonus,
                        previous: update.previous,
                        new_stats: update.next,
                        prestiged_this_call: update.next.prestige > update.previous.prestige,
                        prestige_eligible: self.can_prestige(&update.next),
                    };
                    self.emit_award(user_id, update.category, update.base_delta, &award);
                    CategoryOutcome::Committed(award)
                }
                Err(err) => {
                    aborted = true;
                    tracing::warn!(
                        user_id,
                        category = %update.category,
                        error = %err,
                        "Failed to persist category, aborting remaining writes"
                    );
                    self.emit(&ProgressionEvent::PersistFailed {
                        user_id: user_id.to_string(),
                        category: update.category,
                        error: err.to_string(),
                    });
                    CategoryOutcome::Failed(err)
                }
            };

            results.push(CategoryResult {
                category: update.category,
                base_delta: update.base_delta,
                outcome,
            });
        }

        let report = AwardReport {
            user_id: user_id.to_string(),
            streak,
            results,
        };
        tracing::debug!(
            user_id,
            streak,
            complete = report.is_complete(),
            categories = report.results.len(),
            "Processed XP award"
        );
        Ok(report)
    }

    /// Manual prestige for a category at the max level
    pub async fn prestige(&self, user_id: &str, category: Category) -> Result<CategoryStats> {
        validate_user(user_id)?;
        let snapshot = self.ledger.read(user_id).await?;
        let next = self.policy().prestige(&snapshot.get(category))?;
        self.ledger.write(user_id, category, next).await?;

        self.emit(&ProgressionEvent::Prestiged {
            user_id: user_id.to_string(),
            category,
            prestige: next.prestige,
            manual: true,
        });
        Ok(next)
    }

    async fn persist(&self, user_id: &str, update: &PendingUpdate) -> Result<()> {
        // Unchanged stats need no write
        if update.next == update.previous {
            return Ok(());
        }
        self.ledger.write(user_id, update.category, update.next).await
    }

    fn emit_award(&self, user_id: &str, category: Category, base_delta: i64, award: &CategoryAward) {
        if award.new_stats == award.previous {
            return;
        }
        self.emit(&ProgressionEvent::XpAwarded {
            user_id: user_id.to_string(),
            category,
            amount: base_delta.saturating_add(award.streak_bonus),
            streak_bonus: award.streak_bonus,
        });
        for event in
            ProgressionEvent::for_transition(user_id, category, &award.previous, &award.new_stats)
        {
            self.emit(&event);
        }
    }

    fn emit(&self, event: &ProgressionEvent) {
        if let Some(sink) = &self.sink {
            sink.notify(event);
        }
    }
}

#[async_trait]
impl XpService for ProgressionOrchestrator {
    /// Routine completions arrive through here, so awards are streak-eligible
    async fn update_user_levels(
        &self,
        user_id: &str,
        gains: &XpGains,
        as_of: NaiveDate,
    ) -> Result<AwardReport> {
        self.award_xp_as_of(user_id, gains, true, as_of).await
    }
}

fn validate_user(user_id: &str) -> Result<()> {
    if user_id.trim().is_empty() {
        return Err(ProgressionError::InvalidArgument(
            "user id must not be empty".to_string(),
        ));
    }
    Ok(())
}
