//! Streak tracking system
//!
//! Derives routine streaks from completion history and records routine
//! completions. Completing a routine awards XP through the registry's
//! [`XpService`], while the orchestrator asks this module for streak lengths
//! through the same registry.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use chrono::{Local, NaiveDate};

use super::category::XpGains;
use super::error::{ProgressionError, Result};
use super::ledger::UserProgression;
use super::orchestrator::AwardReport;
use super::registry::{ServiceRegistry, StreakService};

/// Current streak ending at or just before `as_of`.
///
/// Completions after `as_of` are ignored and repeated days count once. A gap
/// of more than one day between the latest completion and `as_of` resets the
/// streak to zero.
pub fn routine_streak(history: &[NaiveDate], as_of: NaiveDate) -> u32 {
    let days: BTreeSet<NaiveDate> = history.iter().copied().filter(|d| *d <= as_of).collect();

    let Some(&latest) = days.iter().next_back() else {
        return 0;
    };
    if (as_of - latest).num_days() > 1 {
        return 0;
    }

    let mut count = 0u32;
    let mut expected = latest;
    for day in days.iter().rev() {
        if *day != expected {
            break;
        }
        count += 1;
        let Some(prev) = expected.pred_opt() else {
            break;
        };
        expected = prev;
    }
    count
}

/// Longest run of consecutive days anywhere in `history`
pub fn longest_streak(history: &[NaiveDate]) -> u32 {
    let days: BTreeSet<NaiveDate> = history.iter().copied().collect();

    let mut best = 0u32;
    let mut run = 0u32;
    let mut previous: Option<NaiveDate> = None;
    for day in days {
        run = match previous {
            Some(prev) if (day - prev).num_days() == 1 => run + 1,
            _ => 1,
        };
        best = best.max(run);
        previous = Some(day);
    }
    best
}

/// Get today's date in local time
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// A recurring routine and the XP each completion is worth
#[derive(Debug, Clone)]
pub struct Routine {
    pub id: String,
    pub gains: XpGains,
}

/// Result of recording a routine completion
#[derive(Debug)]
pub struct RoutineCompletion {
    pub routine_id: String,
    pub day: NaiveDate,
    /// Streak including this completion
    pub streak: u32,
    /// False when the day was already completed and nothing was owed
    pub counted: bool,
    /// Per-category results of the award, present when `counted`
    pub report: Option<AwardReport>,
}

impl RoutineCompletion {
    /// Gains that did not commit. Completing the same day again awards them.
    pub fn pending_gains(&self) -> XpGains {
        self.report
            .as_ref()
            .map(AwardReport::retry_gains)
            .unwrap_or_default()
    }

    pub fn is_complete(&self) -> bool {
        self.report.as_ref().is_none_or(AwardReport::is_complete)
    }
}

type LogKey = (String, String);
type PendingKey = (String, String, NaiveDate);

/// Routine completion logs; answers streak queries for the orchestrator
///
/// Streaks are reported for the user's best active routine, since the
/// orchestrator asks per user rather than per routine.
pub struct RoutineTracker {
    registry: Arc<ServiceRegistry>,
    routines: Mutex<HashMap<String, Routine>>,
    logs: Mutex<HashMap<LogKey, Vec<NaiveDate>>>,
    /// Gains still owed for completions whose award partly failed
    pending: Mutex<HashMap<PendingKey, XpGains>>,
}

impl RoutineTracker {
    pub fn new(registry: Arc<ServiceRegistry>) -> Self {
        Self {
            registry,
            routines: Mutex::new(HashMap::new()),
            logs: Mutex::new(HashMap::new()),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Define (or redefine) a routine
    pub fn add_routine(&self, routine: Routine) {
        let mut guard = self.routines.lock().unwrap_or_else(|e| e.into_inner());
        guard.insert(routine.id.clone(), routine);
    }

    /// Seed a user's history for a routine, e.g. from an external log
    pub fn load_history(&self, user_id: &str, routine_id: &str, history: Vec<NaiveDate>) {
        let mut guard = self.logs.lock().unwrap_or_else(|e| e.into_inner());
        guard.insert((user_id.to_string(), routine_id.to_string()), history);
    }

    /// Seed gains still owed for a completed day
    pub fn load_pending(&self, user_id: &str, routine_id: &str, day: NaiveDate, gains: XpGains) {
        let key = (user_id.to_string(), routine_id.to_string(), day);
        let mut guard = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if gains.is_empty() {
            guard.remove(&key);
        } else {
            guard.insert(key, gains);
        }
    }

    pub fn pending_for(&self, user_id: &str, routine_id: &str, day: NaiveDate) -> Option<XpGains> {
        let guard = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        guard
            .get(&(user_id.to_string(), routine_id.to_string(), day))
            .cloned()
    }

    pub fn history(&self, user_id: &str, routine_id: &str) -> Vec<NaiveDate> {
        let guard = self.logs.lock().unwrap_or_else(|e| e.into_inner());
        guard
            .get(&(user_id.to_string(), routine_id.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    /// Current streak for a single routine
    pub fn streak_for(&self, user_id: &str, routine_id: &str, as_of: NaiveDate) -> u32 {
        routine_streak(&self.history(user_id, routine_id), as_of)
    }

    /// Best current streak across all of a user's routines
    pub fn best_streak(&self, user_id: &str, as_of: NaiveDate) -> u32 {
        let guard = self.logs.lock().unwrap_or_else(|e| e.into_inner());
        guard
            .iter()
            .filter(|((user, _), _)| user == user_id)
            .map(|(_, history)| routine_streak(history, as_of))
            .max()
            .unwrap_or(0)
    }

    /// Record a completion on `day` and award the routine's XP, with the
    /// streak bonus measured as of that day.
    ///
    /// A repeat completion of the same day awards nothing, unless an earlier
    /// award for that day left categories uncommitted; then only those are
    /// retried. If the award fails before writing anything, the day is not
    /// logged and the error is returned.
    pub async fn complete_routine(
        &self,
        user_id: &str,
        routine_id: &str,
        day: NaiveDate,
    ) -> Result<RoutineCompletion> {
        let routine_gains = {
            let guard = self.routines.lock().unwrap_or_else(|e| e.into_inner());
            guard.get(routine_id).map(|r| r.gains.clone()).ok_or_else(|| {
                ProgressionError::InvalidArgument(format!("Unknown routine: {}", routine_id))
            })?
        };
        let owed = self.pending_for(user_id, routine_id, day);

        let newly_logged = {
            let mut guard = self.logs.lock().unwrap_or_else(|e| e.into_inner());
            let history = guard
                .entry((user_id.to_string(), routine_id.to_string()))
                .or_default();
            if history.contains(&day) {
                false
            } else {
                history.push(day);
                history.sort();
                true
            }
        };

        let streak = self.streak_for(user_id, routine_id, day);
        let gains = match owed {
            Some(owed) => owed,
            None if newly_logged => routine_gains,
            None => {
                tracing::debug!(user_id, routine_id, %day, "Routine already completed");
                return Ok(RoutineCompletion {
                    routine_id: routine_id.to_string(),
                    day,
                    streak,
                    counted: false,
                    report: None,
                });
            }
        };

        let awarded = async {
            self.registry
                .xp_service()?
                .update_user_levels(user_id, &gains, day)
                .await
        }
        .await;
        let report = match awarded {
            Ok(report) => report,
            Err(err) => {
                if newly_logged {
                    self.unlog(user_id, routine_id, day);
                }
                return Err(err);
            }
        };

        let still_owed = report.retry_gains();
        if still_owed.is_empty() {
            tracing::debug!(user_id, routine_id, %day, streak, "Routine completed");
        } else {
            tracing::warn!(
                user_id,
                routine_id,
                %day,
                categories = still_owed.len(),
                "Routine award incomplete, complete again to retry"
            );
        }
        self.load_pending(user_id, routine_id, day, still_owed);

        Ok(RoutineCompletion {
            routine_id: routine_id.to_string(),
            day,
            streak,
            counted: true,
            report: Some(report),
        })
    }

    fn unlog(&self, user_id: &str, routine_id: &str, day: NaiveDate) {
        let mut guard = self.logs.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(history) = guard.get_mut(&(user_id.to_string(), routine_id.to_string())) {
            history.retain(|d| *d != day);
        }
    }
}

impl StreakService for RoutineTracker {
    fn get_routine_streak(
        &self,
        _snapshot: &UserProgression,
        user_id: &str,
        as_of: NaiveDate,
    ) -> u32 {
        self.best_streak(user_id, as_of)
    }
}
