//! Recalculation scheduler — runs the progress calculator across all
//! eligible campaigns on a fixed interval, or on demand.
//!
//! RULES:
//!   - One owned scheduler instance per host process; no global state.
//!     Tests construct as many isolated instances as they like.
//!   - Campaigns are processed sequentially within a pass: bounded
//!     connection usage, deterministic ordering for debugging.
//!   - A single worker thread makes scheduled passes inherently serial;
//!     a shared pass mutex additionally serializes manual triggers
//!     against the timer, so two passes never interleave writes.
//!   - One campaign's failure is caught into the pass result's error
//!     list and never aborts the batch. There are no retries: the next
//!     tick is the retry.

use crate::{
    auditor, calculator,
    calculator::ProgressDelta,
    config::EngineConfig,
    error::{EngineError, EngineResult},
    store::{CampaignStore, RecalcRunRow},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

/// What kicked off a recalculation pass. Recorded per run so the
/// statistics layer can track runs and success rate per trigger source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassTrigger {
    Scheduled,
    Manual,
}

impl PassTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            PassTrigger::Scheduled => "scheduled",
            PassTrigger::Manual => "manual",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(PassTrigger::Scheduled),
            "manual" => Some(PassTrigger::Manual),
            _ => None,
        }
    }
}

/// Outcome summary of one full recalculation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecalculationResult {
    pub success: bool,
    pub recalculated_count: usize,
    pub errors: Vec<String>,
    pub trigger: PassTrigger,
    pub started_at: DateTime<Utc>,
}

/// Snapshot of the scheduler's state for the host UI/CLI.
#[derive(Debug, Clone)]
pub struct SchedulerStatus {
    pub is_running: bool,
    pub interval: Duration,
    pub last_run: Option<RecalculationResult>,
}

struct SharedState {
    running: bool,
    stop_requested: bool,
    last_run: Option<RecalculationResult>,
}

struct Shared {
    state: Mutex<SharedState>,
    wakeup: Condvar,
    // Serializes scheduled and manual passes; held for a whole pass.
    pass_lock: Mutex<()>,
}

pub struct RecalculationScheduler {
    store: CampaignStore,
    config: EngineConfig,
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl RecalculationScheduler {
    pub fn new(store: CampaignStore, config: EngineConfig) -> Self {
        Self {
            store,
            config,
            shared: Arc::new(Shared {
                state: Mutex::new(SharedState {
                    running: false,
                    stop_requested: false,
                    last_run: None,
                }),
                wakeup: Condvar::new(),
                pass_lock: Mutex::new(()),
            }),
            worker: None,
        }
    }

    /// Start the repeating timer. No-op if already running.
    ///
    /// The worker thread executes one full pass immediately, then waits
    /// `config.interval()` between passes. `status().is_running` is true
    /// as soon as this returns, before the first pass completes.
    ///
    /// Errors if the store is a private in-memory database (the worker
    /// could not share it) or if the worker's connection cannot be
    /// opened; a failed start leaves the scheduler stopped and a later
    /// `start()` may succeed.
    pub fn start(&mut self) -> EngineResult<()> {
        {
            let state = self.shared.state.lock().expect("scheduler state poisoned");
            if state.running {
                log::debug!("scheduler start() ignored: already running");
                return Ok(());
            }
        }

        if self.store.is_private_memory() {
            return Err(EngineError::UnshareableStore);
        }

        // The worker gets its own connection to the same database.
        // Opened before the running flag flips, so a failure here leaves
        // the scheduler in a cleanly stopped state.
        let store = self.store.reopen()?;

        {
            let mut state = self.shared.state.lock().expect("scheduler state poisoned");
            state.running = true;
            state.stop_requested = false;
        }

        let config = self.config.clone();
        let shared = Arc::clone(&self.shared);

        let handle = std::thread::spawn(move || {
            log::info!(
                "recalculation scheduler started (interval {}s)",
                config.interval_secs
            );
            loop {
                run_pass(&store, &config, PassTrigger::Scheduled, &shared);

                let guard = shared.state.lock().expect("scheduler state poisoned");
                let (guard, _timeout) = shared
                    .wakeup
                    .wait_timeout_while(guard, config.interval(), |s| !s.stop_requested)
                    .expect("scheduler state poisoned");
                if guard.stop_requested {
                    break;
                }
            }
            let mut state = shared.state.lock().expect("scheduler state poisoned");
            state.running = false;
            log::info!("recalculation scheduler stopped");
        });

        self.worker = Some(handle);
        Ok(())
    }

    /// Cancel the timer. An in-flight pass is allowed to complete; this
    /// blocks until the worker thread exits. No-op if not running.
    pub fn stop(&mut self) {
        {
            let mut state = self.shared.state.lock().expect("scheduler state poisoned");
            if !state.running {
                return;
            }
            state.stop_requested = true;
        }
        self.shared.wakeup.notify_all();
        if let Some(handle) = self.worker.take() {
            // A panicking pass already marked itself in last_run; nothing
            // more to do with the join result.
            let _ = handle.join();
        }
    }

    pub fn status(&self) -> SchedulerStatus {
        let state = self.shared.state.lock().expect("scheduler state poisoned");
        SchedulerStatus {
            is_running: state.running,
            interval: self.config.interval(),
            last_run: state.last_run.clone(),
        }
    }

    /// Execute one manual pass synchronously on the caller's connection.
    /// Equivalent to a scheduled tick, but recorded with a manual trigger
    /// so run statistics distinguish operator action from the timer.
    pub fn run_once(&self) -> RecalculationResult {
        run_pass(&self.store, &self.config, PassTrigger::Manual, &self.shared)
    }

    /// Recalculate a single campaign synchronously, outside the schedule.
    /// Errors if the campaign does not exist.
    pub fn force_recalculate(&self, campaign_id: &str) -> EngineResult<ProgressDelta> {
        let _pass = self
            .shared
            .pass_lock
            .lock()
            .expect("scheduler pass lock poisoned");
        calculator::recalculate_campaign(&self.store, &self.config, campaign_id)
    }

    /// Run history, most recent first. Feeds the stats panel in the host
    /// UI (run counts and success rate per trigger source).
    pub fn list_run_history(&self) -> EngineResult<Vec<RecalcRunRow>> {
        self.store.list_recalc_runs()
    }

    /// Delete accumulated run history (the operator "clear error history"
    /// affordance). Returns the number of rows removed.
    pub fn clear_run_history(&self) -> EngineResult<usize> {
        self.store.clear_recalc_runs()
    }
}

impl Drop for RecalculationScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One full recalculation pass: list eligible campaigns, recalculate each
/// sequentially, run the consistency audit, record the run.
///
/// Never returns an error: every failure is folded into the result so the
/// worker loop and manual callers share one code path.
fn run_pass(
    store: &CampaignStore,
    config: &EngineConfig,
    trigger: PassTrigger,
    shared: &Shared,
) -> RecalculationResult {
    let _pass = shared.pass_lock.lock().expect("scheduler pass lock poisoned");

    let started_at = Utc::now();
    let mut errors = Vec::new();
    let mut recalculated_count = 0usize;

    match store.list_eligible_campaign_ids() {
        Ok(ids) => {
            for id in ids {
                match calculator::recalculate_campaign(store, config, &id) {
                    Ok(delta) => {
                        recalculated_count += 1;
                        if delta.updated {
                            log::info!(
                                "campaign={id} corrected: {:.2}% -> {:.2}%",
                                delta.previous_percentage,
                                delta.new_percentage,
                            );
                        }
                    }
                    Err(e) => {
                        log::warn!("campaign={id} recalculation failed: {e}");
                        errors.push(format!("{id}: {e}"));
                    }
                }
            }
        }
        Err(e) => {
            log::error!("listing eligible campaigns failed: {e}");
            errors.push(format!("listing eligible campaigns failed: {e}"));
        }
    }

    // Once per cycle; findings are informational only.
    if let Err(e) = auditor::audit(store) {
        log::warn!("consistency audit failed: {e}");
        errors.push(format!("consistency audit failed: {e}"));
    }

    let result = RecalculationResult {
        success: errors.is_empty(),
        recalculated_count,
        errors,
        trigger,
        started_at,
    };

    if let Err(e) = store.insert_recalc_run(&result) {
        log::warn!("failed to record run history: {e}");
    }

    let mut state = shared.state.lock().expect("scheduler state poisoned");
    state.last_run = Some(result.clone());
    drop(state);

    log::debug!(
        "pass trigger={} recalculated={} errors={}",
        result.trigger.as_str(),
        result.recalculated_count,
        result.errors.len(),
    );

    result
}
