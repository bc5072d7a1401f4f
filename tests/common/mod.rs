//! Shared test utilities for progression integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;

use levelup::store::MemoryLedgerStore;
use levelup::{
    Category, CategoryLedger, CategoryStats, LedgerStore, LevelPolicy, NotificationSink,
    ProgressionEvent, ProgressionOrchestrator, ServiceRegistry, StoreError, StreakService,
    UserProgression,
};

/// Memory store that can be told to fail reads or writes for one category
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryLedgerStore,
    fail_reads: AtomicBool,
    fail_category: Mutex<Option<Category>>,
    pub reads: AtomicUsize,
    pub writes: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes_for(&self, category: Option<Category>) {
        *self.fail_category.lock().unwrap() = category;
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerStore for FlakyStore {
    async fn get_category_state(&self, user_id: &str) -> Result<Option<UserProgression>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("read timed out".to_string()));
        }
        self.inner.get_category_state(user_id).await
    }

    async fn put_category_state(
        &self,
        user_id: &str,
        category: Category,
        stats: CategoryStats,
    ) -> Result<(), StoreError> {
        if *self.fail_category.lock().unwrap() == Some(category) {
            return Err(StoreError::Unavailable(format!("write to {} rejected", category)));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.put_category_state(user_id, category, stats).await
    }
}

/// Streak service reporting a fixed streak
pub struct FixedStreak(pub u32);

impl StreakService for FixedStreak {
    fn get_routine_streak(
        &self,
        _snapshot: &UserProgression,
        _user_id: &str,
        _as_of: NaiveDate,
    ) -> u32 {
        self.0
    }
}

/// Sink that keeps every event
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ProgressionEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<ProgressionEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, event: &ProgressionEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Orchestrator over a flaky memory store with a registry holding `streak`
pub struct Harness {
    pub store: Arc<FlakyStore>,
    pub registry: Arc<ServiceRegistry>,
    pub sink: Arc<RecordingSink>,
    pub orchestrator: Arc<ProgressionOrchestrator>,
}

pub fn harness(streak: Option<u32>) -> Harness {
    let store = Arc::new(FlakyStore::new());
    let registry = Arc::new(ServiceRegistry::new());
    let sink = Arc::new(RecordingSink::default());
    let ledger = CategoryLedger::new(store.clone(), LevelPolicy::default());
    let orchestrator =
        Arc::new(ProgressionOrchestrator::new(ledger, registry.clone()).with_sink(sink.clone()));

    registry.register_xp_service(orchestrator.clone()).unwrap();
    if let Some(days) = streak {
        registry
            .register_streak_service(Arc::new(FixedStreak(days)))
            .unwrap();
    }
    registry.freeze();

    Harness {
        store,
        registry,
        sink,
        orchestrator,
    }
}

pub fn stats(level: u32, xp: u64, prestige: u32) -> CategoryStats {
    CategoryStats {
        level,
        xp,
        prestige,
    }
}
