//! Error types for the progression engine

use super::category::Category;

/// Failures reported by a ledger store backend
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Corrupt ledger record for {user_id}/{category}: {reason}")]
    Corrupt {
        user_id: String,
        category: String,
        reason: String,
    },

    #[error("Ledger store unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced by the progression engine
#[derive(Debug, thiserror::Error)]
pub enum ProgressionError {
    /// Negative or malformed XP delta. Rejected before any store access.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Leveling constants out of range. A startup-time bug.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A registry slot was resolved before anything was bound to it.
    #[error("Service not registered: {0}")]
    NotRegistered(&'static str),

    /// A registry slot was bound twice, or after the registry was frozen.
    #[error("Service already registered: {0}")]
    AlreadyRegistered(&'static str),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl ProgressionError {
    pub(crate) fn negative_delta(category: Category, delta: i64) -> Self {
        Self::InvalidArgument(format!(
            "XP delta for '{}' must not be negative (got {})",
            category, delta
        ))
    }
}

pub type Result<T, E = ProgressionError> = std::result::Result<T, E>;
