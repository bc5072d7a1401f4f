//! Tests for routine completions wired through the service registry

mod common;

use std::sync::Arc;

use chrono::Duration;
use common::{FlakyStore, stats};
use levelup::store::MemoryLedgerStore;
use levelup::{
    Category, CategoryLedger, CategoryOutcome, LedgerStore, LevelPolicy, ProgressionError,
    ProgressionOrchestrator, Routine, RoutineTracker, ServiceRegistry, StoreError, StreakService,
    UserProgression, XpGains, today,
};

struct Wired {
    orchestrator: Arc<ProgressionOrchestrator>,
    routines: Arc<RoutineTracker>,
}

fn wire_with(store: Arc<dyn LedgerStore>) -> Wired {
    let registry = Arc::new(ServiceRegistry::new());
    let ledger = CategoryLedger::new(store, LevelPolicy::default());
    let orchestrator = Arc::new(ProgressionOrchestrator::new(ledger, registry.clone()));
    let routines = Arc::new(RoutineTracker::new(registry.clone()));

    registry.register_xp_service(orchestrator.clone()).unwrap();
    registry.register_streak_service(routines.clone()).unwrap();
    registry.freeze();

    routines.add_routine(Routine {
        id: "run".to_string(),
        gains: XpGains::from([(Category::Physical, 30), (Category::Mental, 10)]),
    });

    Wired {
        orchestrator,
        routines,
    }
}

fn wire() -> Wired {
    wire_with(Arc::new(MemoryLedgerStore::new()))
}

#[tokio::test]
async fn test_completion_awards_xp_with_streak_bonus() {
    let w = wire();
    let day = today();
    w.routines.load_history(
        "alice",
        "run",
        vec![day - Duration::days(2), day - Duration::days(1)],
    );

    let completion = w.routines.complete_routine("alice", "run", day).await.unwrap();
    assert!(completion.counted);
    assert!(completion.is_complete());
    assert_eq!(completion.streak, 3);

    // Streak of 3 days is worth 6 bonus XP per category
    let stored = w.orchestrator.snapshot("alice").await.unwrap();
    assert_eq!(stored.get(Category::Physical).xp, 36);
    assert_eq!(stored.get(Category::Mental).xp, 16);
}

#[tokio::test]
async fn test_backdated_completion_uses_streak_on_that_day() {
    let w = wire();
    let day = today() - Duration::days(10);
    w.routines.load_history(
        "abby",
        "run",
        vec![day - Duration::days(2), day - Duration::days(1)],
    );

    let completion = w.routines.complete_routine("abby", "run", day).await.unwrap();
    assert_eq!(completion.streak, 3);
    assert_eq!(completion.report.as_ref().unwrap().streak, 3);

    let stored = w.orchestrator.snapshot("abby").await.unwrap();
    assert_eq!(stored.get(Category::Physical).xp, 36);
}

#[tokio::test]
async fn test_repeat_completion_same_day_awards_nothing() {
    let w = wire();
    let day = today();

    w.routines.complete_routine("bob", "run", day).await.unwrap();
    let first = w.orchestrator.snapshot("bob").await.unwrap();

    let again = w.routines.complete_routine("bob", "run", day).await.unwrap();
    assert!(!again.counted);
    assert!(again.report.is_none());
    assert_eq!(w.orchestrator.snapshot("bob").await.unwrap(), first);
    assert_eq!(w.routines.history("bob", "run"), vec![day]);
}

#[tokio::test]
async fn test_partial_failure_retries_only_uncommitted_categories() {
    let store = Arc::new(FlakyStore::new());
    let w = wire_with(store.clone());
    let day = today();

    store.fail_writes_for(Some(Category::Mental));
    let first = w.routines.complete_routine("hana", "run", day).await.unwrap();
    assert!(first.counted);
    assert!(!first.is_complete());
    assert_eq!(first.pending_gains(), XpGains::from([(Category::Mental, 10)]));
    assert!(matches!(
        first.report.as_ref().unwrap().get(Category::Mental).unwrap().outcome,
        CategoryOutcome::Failed(ProgressionError::Store(StoreError::Unavailable(_)))
    ));
    assert_eq!(
        w.routines.pending_for("hana", "run", day),
        Some(XpGains::from([(Category::Mental, 10)]))
    );

    store.fail_writes_for(None);
    let retry = w.routines.complete_routine("hana", "run", day).await.unwrap();
    assert!(retry.counted);
    assert!(retry.is_complete());
    assert!(w.routines.pending_for("hana", "run", day).is_none());

    // Physical committed once with the 1-day bonus; mental caught up on retry
    let stored = w.orchestrator.snapshot("hana").await.unwrap();
    assert_eq!(stored.get(Category::Physical), stats(1, 32, 1));
    assert_eq!(stored.get(Category::Mental), stats(1, 12, 1));

    let third = w.routines.complete_routine("hana", "run", day).await.unwrap();
    assert!(!third.counted);
    assert_eq!(w.orchestrator.snapshot("hana").await.unwrap(), stored);
}

#[tokio::test]
async fn test_failed_read_does_not_log_the_day() {
    let store = Arc::new(FlakyStore::new());
    let w = wire_with(store.clone());
    let day = today();

    store.fail_reads(true);
    let err = w
        .routines
        .complete_routine("ivy", "run", day)
        .await
        .unwrap_err();
    assert!(matches!(err, ProgressionError::Store(_)));
    assert!(w.routines.history("ivy", "run").is_empty());
    assert_eq!(store.writes(), 0);

    store.fail_reads(false);
    let completion = w.routines.complete_routine("ivy", "run", day).await.unwrap();
    assert!(completion.counted);
    assert_eq!(completion.streak, 1);
    let stored = w.orchestrator.snapshot("ivy").await.unwrap();
    assert_eq!(stored.get(Category::Physical), stats(1, 32, 1));
}

#[tokio::test]
async fn test_unknown_routine_rejected() {
    let w = wire();
    let err = w
        .routines
        .complete_routine("carol", "swim", today())
        .await
        .unwrap_err();
    assert!(matches!(err, ProgressionError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_completion_before_registration_fails_fast() {
    let registry = Arc::new(ServiceRegistry::new());
    let routines = RoutineTracker::new(registry);
    routines.add_routine(Routine {
        id: "run".to_string(),
        gains: XpGains::from([(Category::Physical, 30)]),
    });

    let err = routines
        .complete_routine("dave", "run", today())
        .await
        .unwrap_err();
    assert!(matches!(err, ProgressionError::NotRegistered(_)));
    assert!(routines.history("dave", "run").is_empty());
}

#[test]
fn test_streak_service_reports_best_routine() {
    let registry = Arc::new(ServiceRegistry::new());
    let routines = RoutineTracker::new(registry);
    let day = today();

    routines.load_history("erin", "run", vec![day]);
    routines.load_history(
        "erin",
        "read",
        vec![
            day - Duration::days(3),
            day - Duration::days(2),
            day - Duration::days(1),
        ],
    );
    routines.load_history(
        "someone-else",
        "run",
        (0..10).map(|i| day - Duration::days(i)).collect(),
    );

    let snapshot = UserProgression::default();
    assert_eq!(routines.get_routine_streak(&snapshot, "erin", day), 3);
    assert_eq!(routines.streak_for("erin", "run", day), 1);
    assert_eq!(routines.get_routine_streak(&snapshot, "nobody", day), 0);
    assert_eq!(
        routines.get_routine_streak(&snapshot, "erin", day + Duration::days(5)),
        0
    );
}
