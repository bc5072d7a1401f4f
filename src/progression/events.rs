//! Notifications emitted after an award is processed

use super::category::Category;
use super::ledger::CategoryStats;

/// Something the UI may want to celebrate or report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressionEvent {
    XpAwarded {
        user_id: String,
        category: Category,
        amount: i64,
        streak_bonus: i64,
    },
    LevelUp {
        user_id: String,
        category: Category,
        old_level: u32,
        new_level: u32,
    },
    Prestiged {
        user_id: String,
        category: Category,
        prestige: u32,
        manual: bool,
    },
    PersistFailed {
        user_id: String,
        category: Category,
        error: String,
    },
}

impl ProgressionEvent {
    /// Events describing the transition `old -> new` for one category
    pub(crate) fn for_transition(
        user_id: &str,
        category: Category,
        old: &CategoryStats,
        new: &CategoryStats,
    ) -> Vec<Self> {
        let mut events = Vec::new();
        if new.prestige > old.prestige {
            events.push(Self::Prestiged {
                user_id: user_id.to_string(),
                category,
                prestige: new.prestige,
                manual: false,
            });
        } else if new.level > old.level {
            events.push(Self::LevelUp {
                user_id: user_id.to_string(),
                category,
                old_level: old.level,
                new_level: new.level,
            });
        }
        events
    }
}

/// Receives progression events (toasts, sounds, analytics)
pub trait NotificationSink: Send + Sync {
    fn notify(&self, event: &ProgressionEvent);
}

/// Sink that only logs
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&self, event: &ProgressionEvent) {
        match event {
            ProgressionEvent::LevelUp {
                user_id,
                category,
                new_level,
                ..
            } => tracing::info!(%user_id, %category, new_level, "Level up"),
            ProgressionEvent::Prestiged {
                user_id,
                category,
                prestige,
                manual,
            } => tracing::info!(%user_id, %category, prestige, manual, "Prestige"),
            ProgressionEvent::PersistFailed {
                user_id,
                category,
                error,
            } => tracing::warn!(%user_id, %category, %error, "Failed to persist progression"),
            ProgressionEvent::XpAwarded {
                user_id,
                category,
                amount,
                streak_bonus,
            } => tracing::debug!(%user_id, %category, amount, streak_bonus, "XP awarded"),
        }
    }
}
