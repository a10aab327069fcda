//! Integration tests for the recalculation scheduler.
//!
//! 1. status() lifecycle around start()/stop()
//! 2. run_once() recalculates and records a manual run
//! 3. Batch isolation: one corrupt campaign never aborts the pass
//! 4. force_recalculate on a missing campaign errors
//! 5. Run history accumulates and can be cleared

use campaign_core::{
    model::{
        AcceptanceStatus, Campaign, CampaignStatus, CampaignType, Policy, PolicyType,
    },
    scheduler::PassTrigger,
    CampaignStore, EngineConfig, EngineError, RecalculationScheduler,
};
use chrono::Utc;
use std::time::{Duration, Instant};

/// Shared-memory URI so the scheduler's worker connection sees the same
/// database as the test connection.
fn shared_store(name: &str) -> CampaignStore {
    let _ = env_logger::builder().is_test(true).try_init();
    let uri = format!("file:{name}?mode=memory&cache=shared");
    let store = CampaignStore::open(&uri).expect("open failed");
    store.migrate().expect("migrate failed");
    store
}

fn flat_campaign(id: &str, target: f64) -> Campaign {
    Campaign {
        id: id.into(),
        title: format!("Campaign {id}"),
        campaign_type: CampaignType::Value,
        target,
        current_value: 0.0,
        progress_percentage: 0.0,
        status: CampaignStatus::Active,
        criteria: None,
        start_date: None,
        end_date: None,
        last_updated: Utc::now(),
        achieved_at: None,
        record_type: "campaign".into(),
        active: true,
        acceptance_status: AcceptanceStatus::Accepted,
    }
}

fn seed_linked_policy(store: &CampaignStore, campaign_id: &str, id: &str, premium: f64) {
    store
        .insert_policy(&Policy {
            id: id.into(),
            policy_type: PolicyType::Auto,
            premium_value: premium,
            created_at: Utc::now(),
        })
        .unwrap();
    store.link_policy(id, campaign_id, true).unwrap();
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 1: status() lifecycle
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn status_tracks_start_and_stop() {
    let store = shared_store("sched_t1");
    store.insert_campaign(&flat_campaign("c1", 1_000.0)).unwrap();
    seed_linked_policy(&store, "c1", "p1", 500.0);

    let mut scheduler = RecalculationScheduler::new(store, EngineConfig::default());
    assert!(!scheduler.status().is_running, "stopped before first start()");
    assert!(scheduler.status().last_run.is_none());

    scheduler.start().unwrap();
    // Running immediately, even before the first pass completes.
    assert!(scheduler.status().is_running);
    assert_eq!(scheduler.status().interval, Duration::from_secs(90));

    // Starting again is a no-op, not an error.
    scheduler.start().unwrap();

    // The immediate first pass lands shortly after start().
    let deadline = Instant::now() + Duration::from_secs(5);
    while scheduler.status().last_run.is_none() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    let last_run = scheduler.status().last_run.expect("first pass never ran");
    assert!(last_run.success);
    assert_eq!(last_run.recalculated_count, 1);
    assert_eq!(last_run.trigger, PassTrigger::Scheduled);

    scheduler.stop();
    assert!(!scheduler.status().is_running);
    // stop() on a stopped scheduler is also a no-op.
    scheduler.stop();
}

#[test]
fn failed_start_leaves_scheduler_stopped_and_restartable() {
    let dir = std::env::temp_dir().join(format!("sched_start_fail_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let db_path = dir.join("campaigns.db");
    let store = CampaignStore::open(db_path.to_str().unwrap()).unwrap();
    store.migrate().unwrap();

    // Pull the directory out from under the worker's connection.
    std::fs::remove_dir_all(&dir).unwrap();

    let mut scheduler = RecalculationScheduler::new(store, EngineConfig::default());
    assert!(scheduler.start().is_err(), "worker connection cannot open");
    assert!(
        !scheduler.status().is_running,
        "failed start must not leave the scheduler marked running"
    );

    // stop() on the never-started scheduler stays a no-op.
    scheduler.stop();
    assert!(!scheduler.status().is_running);

    // Once the path is back, a later start() succeeds.
    std::fs::create_dir_all(&dir).unwrap();
    scheduler.start().unwrap();
    assert!(scheduler.status().is_running);
    scheduler.stop();
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn start_rejects_private_in_memory_store() {
    let store = CampaignStore::in_memory().unwrap();
    store.migrate().unwrap();
    store.insert_campaign(&flat_campaign("c1", 1_000.0)).unwrap();

    let mut scheduler = RecalculationScheduler::new(store, EngineConfig::default());
    let err = scheduler.start().unwrap_err();
    assert!(matches!(err, EngineError::UnshareableStore), "got {err}");
    assert!(!scheduler.status().is_running);

    // Manual passes still run on the caller's own connection.
    let result = scheduler.run_once();
    assert!(result.success);
    assert_eq!(result.recalculated_count, 1);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 2: run_once() is a full manual pass
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn run_once_recalculates_and_records_a_manual_run() {
    let store = shared_store("sched_t2");
    store.insert_campaign(&flat_campaign("c1", 1_000.0)).unwrap();
    seed_linked_policy(&store, "c1", "p1", 1_200.0);

    let scheduler = RecalculationScheduler::new(store, EngineConfig::default());
    let result = scheduler.run_once();
    assert!(result.success);
    assert_eq!(result.recalculated_count, 1);
    assert_eq!(result.trigger, PassTrigger::Manual);
    assert!(result.errors.is_empty());

    // The pass outcome is visible via status() regardless of trigger.
    let status = scheduler.status();
    assert!(!status.is_running);
    assert_eq!(
        status.last_run.unwrap().trigger,
        PassTrigger::Manual
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 3: one campaign's failure never aborts the batch
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn corrupt_campaign_is_isolated_from_the_batch() {
    let store = shared_store("sched_t3");
    let probe = store.reopen().expect("reopen failed");

    // Campaign "a" carries an unparseable criteria payload.
    store.insert_campaign(&flat_campaign("a", 1_000.0)).unwrap();
    store
        .overwrite_campaign_criteria("a", "{not valid json")
        .unwrap();

    // Campaign "b" is healthy and should still be recalculated.
    store.insert_campaign(&flat_campaign("b", 1_000.0)).unwrap();
    seed_linked_policy(&store, "b", "p1", 500.0);

    assert_eq!(store.campaign_count().unwrap(), 2);

    let scheduler = RecalculationScheduler::new(store, EngineConfig::default());
    let result = scheduler.run_once();

    assert!(!result.success);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].starts_with("a:"), "got {:?}", result.errors);
    assert_eq!(result.recalculated_count, 1, "b still processed");

    let b = probe.get_campaign("b").unwrap().unwrap();
    assert_eq!(b.current_value, 500.0);
    assert!((b.progress_percentage - 50.0).abs() < 1e-9);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 4: forcing a missing campaign is a lookup failure for that call only
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn force_recalculate_missing_campaign_errors() {
    let store = shared_store("sched_t4");
    let scheduler = RecalculationScheduler::new(store, EngineConfig::default());

    let err = scheduler.force_recalculate("nope").unwrap_err();
    match err {
        EngineError::CampaignNotFound { id } => assert_eq!(id, "nope"),
        other => panic!("expected CampaignNotFound, got {other}"),
    }
}

#[test]
fn force_recalculate_returns_the_progress_delta() {
    let store = shared_store("sched_t5");
    store.insert_campaign(&flat_campaign("c1", 2_000.0)).unwrap();
    seed_linked_policy(&store, "c1", "p1", 1_000.0);

    let scheduler = RecalculationScheduler::new(store, EngineConfig::default());
    let delta = scheduler.force_recalculate("c1").unwrap();
    assert!(delta.updated);
    assert_eq!(delta.previous_value, 0.0);
    assert_eq!(delta.new_value, 1_000.0);
    assert!((delta.new_percentage - 50.0).abs() < 1e-9);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 5: run history per invocation, cleared on demand
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn run_history_accumulates_and_clears() {
    let store = shared_store("sched_t6");
    store.insert_campaign(&flat_campaign("c1", 1_000.0)).unwrap();

    let scheduler = RecalculationScheduler::new(store, EngineConfig::default());
    scheduler.run_once();
    scheduler.run_once();

    let history = scheduler.list_run_history().unwrap();
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|r| r.trigger == PassTrigger::Manual));
    assert!(history[0].id > history[1].id, "most recent first");

    let removed = scheduler.clear_run_history().unwrap();
    assert_eq!(removed, 2);
    assert!(scheduler.list_run_history().unwrap().is_empty());
}
