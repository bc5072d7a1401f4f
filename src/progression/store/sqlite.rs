//! SQLite ledger store
//!
//! Manages `~/.levelup/progression.db`.
//! One row per (user, category); writes are upserts of the full record.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Context;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension};

use crate::progression::category::{Category, XpGains};
use crate::progression::error::StoreError;
use crate::progression::ledger::{CategoryStats, LedgerStore, UserProgression};

/// Schema version written by [`SqliteLedgerStore::open`]
const SCHEMA_VERSION: i32 = 1;

/// Storage format of completion days
const DAY_FORMAT: &str = "%Y-%m-%d";

/// Ledger store backed by a single SQLite connection
#[derive(Clone)]
pub struct SqliteLedgerStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteLedgerStore {
    /// Open or create the ledger database at `path`
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create ledger dir: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open ledger db: {}", path.display()))?;

        // WAL so the CLI can read while an app holds the database
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        Self::from_connection(conn)
    }

    /// In-memory database, mostly for tests
    pub fn open_in_memory() -> anyhow::Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> anyhow::Result<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn init_schema(&self) -> anyhow::Result<()> {
        let conn = self.conn();
        conn.execute_batch(SCHEMA_SQL)
            .context("Failed to initialize ledger schema")?;
        conn.execute(
            "INSERT OR IGNORE INTO schema_version VALUES (?1)",
            [SCHEMA_VERSION],
        )?;
        Ok(())
    }

    /// Delete every stored record for a user
    pub fn reset_user(&self, user_id: &str) -> anyhow::Result<usize> {
        let conn = self.conn();
        let removed = conn.execute("DELETE FROM category_stats WHERE user_id = ?1", [user_id])?;
        conn.execute("DELETE FROM routine_completions WHERE user_id = ?1", [user_id])?;
        Ok(removed)
    }

    /// Log a routine completion day along with the gains still owed for it.
    /// Logging the same day again replaces the owed gains.
    pub fn record_completion(
        &self,
        user_id: &str,
        routine_id: &str,
        day: NaiveDate,
        pending: &XpGains,
    ) -> anyhow::Result<()> {
        let pending = if pending.is_empty() {
            None
        } else {
            let keyed: BTreeMap<&str, i64> =
                pending.iter().map(|(c, xp)| (c.as_str(), *xp)).collect();
            Some(serde_json::to_string(&keyed)?)
        };

        self.conn().execute(
            r#"
            INSERT INTO routine_completions (user_id, routine_id, day, pending)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(user_id, routine_id, day) DO UPDATE SET pending = ?4
            "#,
            (user_id, routine_id, day.format(DAY_FORMAT).to_string(), pending),
        )?;
        Ok(())
    }

    /// Completion days per routine for a user, oldest first
    pub fn completion_histories(
        &self,
        user_id: &str,
    ) -> anyhow::Result<BTreeMap<String, Vec<NaiveDate>>> {
        let mut histories: BTreeMap<String, Vec<NaiveDate>> = BTreeMap::new();
        for (routine_id, day, _) in self.completions(user_id, false)? {
            histories.entry(routine_id).or_default().push(day);
        }
        Ok(histories)
    }

    /// Completions whose award did not fully commit, with the gains owed
    pub fn pending_completions(
        &self,
        user_id: &str,
    ) -> anyhow::Result<Vec<(String, NaiveDate, XpGains)>> {
        self.completions(user_id, true)
    }

    fn completions(
        &self,
        user_id: &str,
        pending_only: bool,
    ) -> anyhow::Result<Vec<(String, NaiveDate, XpGains)>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            r#"
            SELECT routine_id, day, pending FROM routine_completions
            WHERE user_id = ?1 AND (?2 = 0 OR pending IS NOT NULL)
            ORDER BY day
            "#,
        )?;
        let rows = stmt.query_map((user_id, pending_only), |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })?;

        let mut completions = Vec::new();
        for row in rows {
            let (routine_id, day, pending) = row?;
            let day = NaiveDate::parse_from_str(&day, DAY_FORMAT)
                .with_context(|| format!("Bad completion day for {}: {}", routine_id, day))?;
            let gains = match pending {
                Some(json) => parse_pending(&json)
                    .with_context(|| format!("Bad pending gains for {} on {}", routine_id, day))?,
                None => XpGains::new(),
            };
            completions.push((routine_id, day, gains));
        }
        Ok(completions)
    }
}

fn parse_pending(json: &str) -> anyhow::Result<XpGains> {
    let keyed: BTreeMap<String, i64> = serde_json::from_str(json)?;
    keyed
        .into_iter()
        .map(|(key, xp)| -> anyhow::Result<(Category, i64)> {
            Ok((key.parse::<Category>()?, xp))
        })
        .collect()
}

fn corrupt(user_id: &str, category: &str, reason: impl Into<String>) -> StoreError {
    StoreError::Corrupt {
        user_id: user_id.to_string(),
        category: category.to_string(),
        reason: reason.into(),
    }
}

#[async_trait]
impl LedgerStore for SqliteLedgerStore {
    async fn get_category_state(&self, user_id: &str) -> Result<Option<UserProgression>, StoreError> {
        let conn = self.conn();

        let exists: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM category_stats WHERE user_id = ?1 LIMIT 1",
                [user_id],
                |r| r.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Ok(None);
        }

        let mut stmt = conn.prepare(
            "SELECT category, level, xp, prestige FROM category_stats WHERE user_id = ?1",
        )?;
        let rows = stmt.query_map([user_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?;

        let mut progression = UserProgression::default();
        for row in rows {
            let (key, level, xp, prestige) = row?;
            let category: Category = key
                .parse()
                .map_err(|_| corrupt(user_id, &key, "unknown category"))?;
            let stats = CategoryStats {
                level: u32::try_from(level).map_err(|_| corrupt(user_id, &key, "bad level"))?,
                xp: u64::try_from(xp).map_err(|_| corrupt(user_id, &key, "negative xp"))?,
                prestige: u32::try_from(prestige)
                    .map_err(|_| corrupt(user_id, &key, "bad prestige"))?,
            };
            progression.set(category, stats);
        }

        Ok(Some(progression))
    }

    async fn put_category_state(
        &self,
        user_id: &str,
        category: Category,
        stats: CategoryStats,
    ) -> Result<(), StoreError> {
        let xp = i64::try_from(stats.xp)
            .map_err(|_| corrupt(user_id, category.as_str(), "xp exceeds storage range"))?;
        let now = Utc::now().timestamp_millis();

        let conn = self.conn();
        conn.execute(
            r#"
            INSERT INTO category_stats (user_id, category, level, xp, prestige, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(user_id, category) DO UPDATE SET
                level = ?3, xp = ?4, prestige = ?5, updated_at = ?6
            "#,
            rusqlite::params![user_id, category.as_str(), stats.level, xp, stats.prestige, now],
        )?;
        Ok(())
    }
}

/// SQL schema for the ledger database
const SCHEMA_SQL: &str = r#"
-- Per-user, per-category progression (one row per category)
CREATE TABLE IF NOT EXISTS category_stats (
    user_id TEXT NOT NULL,
    category TEXT NOT NULL,
    level INTEGER NOT NULL DEFAULT 1 CHECK (level >= 1),
    xp INTEGER NOT NULL DEFAULT 0 CHECK (xp >= 0),
    prestige INTEGER NOT NULL DEFAULT 1 CHECK (prestige >= 1),
    updated_at INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (user_id, category)
);
CREATE INDEX IF NOT EXISTS idx_category_stats_user ON category_stats(user_id);

-- Routine completion log (one row per routine per day)
-- pending: JSON gains not yet committed for that day, NULL once awarded
CREATE TABLE IF NOT EXISTS routine_completions (
    user_id TEXT NOT NULL,
    routine_id TEXT NOT NULL,
    day TEXT NOT NULL,
    pending TEXT,
    PRIMARY KEY (user_id, routine_id, day)
);

-- Schema version
CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_and_init() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("progression.db");
        let store = SqliteLedgerStore::open(&db_path).unwrap();

        let conn = store.conn();
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table'")
            .unwrap();
        let tables: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();
        assert!(tables.contains(&"category_stats".to_string()));

        let version: i32 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_upsert_replaces_record() {
        let store = SqliteLedgerStore::open_in_memory().unwrap();
        assert!(store.get_category_state("u1").await.unwrap().is_none());

        let first = CategoryStats {
            level: 2,
            xp: 10,
            prestige: 1,
        };
        let second = CategoryStats {
            level: 7,
            xp: 999,
            prestige: 3,
        };
        store
            .put_category_state("u1", Category::Financial, first)
            .await
            .unwrap();
        store
            .put_category_state("u1", Category::Financial, second)
            .await
            .unwrap();

        let loaded = store.get_category_state("u1").await.unwrap().unwrap();
        assert_eq!(loaded.categories.len(), 1);
        assert_eq!(loaded.get(Category::Financial), second);
    }

    #[tokio::test]
    async fn test_unknown_category_row_is_corrupt() {
        let store = SqliteLedgerStore::open_in_memory().unwrap();
        store
            .conn()
            .execute(
                "INSERT INTO category_stats (user_id, category, level, xp, prestige) VALUES ('u1', 'cooking', 1, 0, 1)",
                [],
            )
            .unwrap();

        let err = store.get_category_state("u1").await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[test]
    fn test_completion_log() {
        let store = SqliteLedgerStore::open_in_memory().unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let next = NaiveDate::from_ymd_opt(2026, 3, 11).unwrap();
        let none = XpGains::new();

        store.record_completion("u1", "run", next, &none).unwrap();
        store.record_completion("u1", "run", day, &none).unwrap();
        store.record_completion("u1", "run", day, &none).unwrap();
        store.record_completion("u2", "run", day, &none).unwrap();

        let histories = store.completion_histories("u1").unwrap();
        assert_eq!(histories.len(), 1);
        assert_eq!(histories["run"], vec![day, next]);
        assert!(store.pending_completions("u1").unwrap().is_empty());
    }

    #[test]
    fn test_pending_gains_cleared_on_rerecord() {
        let store = SqliteLedgerStore::open_in_memory().unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let owed = XpGains::from([(Category::Mental, 10)]);

        store.record_completion("u1", "run", day, &owed).unwrap();
        assert_eq!(
            store.pending_completions("u1").unwrap(),
            vec![("run".to_string(), day, owed)]
        );
        assert_eq!(store.completion_histories("u1").unwrap()["run"], vec![day]);

        store
            .record_completion("u1", "run", day, &XpGains::new())
            .unwrap();
        assert!(store.pending_completions("u1").unwrap().is_empty());
        assert_eq!(store.completion_histories("u1").unwrap()["run"], vec![day]);
    }

    #[tokio::test]
    async fn test_reset_user() {
        let store = SqliteLedgerStore::open_in_memory().unwrap();
        store
            .put_category_state("u1", Category::Social, CategoryStats::default())
            .await
            .unwrap();
        assert_eq!(store.reset_user("u1").unwrap(), 1);
        assert!(store.get_category_state("u1").await.unwrap().is_none());
    }
}
