//! campaign-runner: headless runner for the campaign progress engine.
//!
//! Usage:
//!   campaign-runner --db campaigns.db --once
//!   campaign-runner --db campaigns.db --watch 300
//!   campaign-runner --db campaigns.db --force <campaign-id>
//!   campaign-runner --seed-demo 40 --once
//!   campaign-runner --db campaigns.db --audit
//!   campaign-runner --db campaigns.db --history [--clear-history]

use anyhow::Result;
use campaign_core::{
    auditor,
    model::{
        AcceptanceStatus, AuditRecord, Campaign, CampaignStatus, CampaignType, Criterion,
        Policy, PolicyType, TargetType,
    },
    CampaignStore, EngineConfig, RecalculationScheduler,
};
use chrono::Utc;
use rand::Rng;
use std::env;
use std::time::Duration;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let db = arg_value(&args, "--db").unwrap_or(":memory:");
    let config = match arg_value(&args, "--config") {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    let seed_demo = arg_value(&args, "--seed-demo")
        .map(|v| v.parse::<usize>())
        .transpose()?;
    let watch_secs = arg_value(&args, "--watch")
        .map(|v| v.parse::<u64>())
        .transpose()?;
    let force_id = arg_value(&args, "--force");
    let once = args.iter().any(|a| a == "--once");
    let audit_only = args.iter().any(|a| a == "--audit");
    let show_history = args.iter().any(|a| a == "--history");
    let clear_history = args.iter().any(|a| a == "--clear-history");

    // For :memory: use a shared-cache URI so the scheduler's worker
    // connection shares the same in-memory database.
    let db_effective: String = if db == ":memory:" {
        format!("file:runner_{}?mode=memory&cache=shared", Utc::now().timestamp())
    } else {
        db.to_string()
    };

    println!("campaign-runner");
    println!("  db:       {db}");
    println!("  interval: {}s", config.interval_secs);
    println!();

    let store = CampaignStore::open(&db_effective)?;
    store.migrate()?;
    log::debug!("database ready at {db_effective}");

    if let Some(count) = seed_demo {
        seed_demo_data(&store, count)?;
        println!("seeded {count} demo policies across 3 campaigns");
    }

    if audit_only {
        let report = auditor::audit(&store)?;
        println!(
            "consistency audit: {} orphan audit records, {} unaudited policies",
            report.orphan_audit_records.len(),
            report.unaudited_policies.len(),
        );
        for orphan in &report.orphan_audit_records {
            println!("  orphan audit record {} ({})", orphan.id, orphan.policy_number);
        }
        for policy in &report.unaudited_policies {
            println!("  unaudited policy {} ({})", policy.id, policy.policy_type);
        }
        return Ok(());
    }

    let mut scheduler = RecalculationScheduler::new(store, config);

    if clear_history {
        let removed = scheduler.clear_run_history()?;
        println!("cleared {removed} run history rows");
    }

    if let Some(id) = force_id {
        let delta = scheduler.force_recalculate(id)?;
        println!(
            "campaign {} recalculated: {:.2}% -> {:.2}% (value {:.2} -> {:.2}, status {} -> {}, {})",
            delta.campaign_id,
            delta.previous_percentage,
            delta.new_percentage,
            delta.previous_value,
            delta.new_value,
            delta.previous_status.as_str(),
            delta.new_status.as_str(),
            if delta.updated { "written" } else { "no drift" },
        );
    }

    if once {
        let result = scheduler.run_once();
        print_result(&result);
    }

    if let Some(secs) = watch_secs {
        scheduler.start()?;
        println!("scheduler running for {secs}s (Ctrl-C to abort early)");
        std::thread::sleep(Duration::from_secs(secs));
        scheduler.stop();
        if let Some(last) = scheduler.status().last_run {
            print_result(&last);
        }
    }

    if show_history {
        let history = scheduler.list_run_history()?;
        println!("{} recorded runs:", history.len());
        for run in &history {
            println!(
                "  #{} {} {} recalculated={} errors={}",
                run.id,
                run.started_at.to_rfc3339(),
                run.trigger.as_str(),
                run.recalculated_count,
                run.errors.len(),
            );
        }
    }

    Ok(())
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn print_result(result: &campaign_core::scheduler::RecalculationResult) {
    println!(
        "pass {} at {}: {} campaigns recalculated, {} errors",
        if result.success { "succeeded" } else { "had errors" },
        result.started_at.to_rfc3339(),
        result.recalculated_count,
        result.errors.len(),
    );
    for err in &result.errors {
        println!("  error: {err}");
    }
}

/// Seed a plausible demo dataset: `count` random policies, three campaigns
/// (one flat value target, one composite, one pending and thus ineligible),
/// active links, and an audit trail with a couple of deliberate gaps.
fn seed_demo_data(store: &CampaignStore, count: usize) -> Result<()> {
    let mut rng = rand::thread_rng();
    let now = Utc::now();

    let flat = Campaign {
        id: uuid::Uuid::new_v4().to_string(),
        title: "Q3 premium volume".into(),
        campaign_type: CampaignType::Value,
        target: 150_000.0,
        current_value: 0.0,
        progress_percentage: 0.0,
        status: CampaignStatus::Active,
        criteria: None,
        start_date: Some(now),
        end_date: None,
        last_updated: now,
        achieved_at: None,
        record_type: "campaign".into(),
        active: true,
        acceptance_status: AcceptanceStatus::Accepted,
    };
    let composite = Campaign {
        criteria: Some(vec![
            Criterion {
                policy_type: Some(PolicyType::Auto),
                target_type: TargetType::Quantity,
                target_value: 20.0,
                min_value_per_policy: Some(500.0),
            },
            Criterion {
                policy_type: Some(PolicyType::Residencial),
                target_type: TargetType::Value,
                target_value: 40_000.0,
                min_value_per_policy: None,
            },
        ]),
        id: uuid::Uuid::new_v4().to_string(),
        title: "Mixed book push".into(),
        ..flat.clone()
    };
    let pending = Campaign {
        id: uuid::Uuid::new_v4().to_string(),
        title: "Awaiting acceptance".into(),
        acceptance_status: AcceptanceStatus::Pending,
        ..flat.clone()
    };
    store.insert_campaign(&flat)?;
    store.insert_campaign(&composite)?;
    store.insert_campaign(&pending)?;

    for i in 0..count {
        let policy = Policy {
            id: uuid::Uuid::new_v4().to_string(),
            policy_type: if rng.gen_bool(0.6) {
                PolicyType::Auto
            } else {
                PolicyType::Residencial
            },
            premium_value: rng.gen_range(300.0..8_000.0),
            created_at: now,
        };
        store.insert_policy(&policy)?;
        store.link_policy(&policy.id, &flat.id, true)?;
        store.link_policy(&policy.id, &composite.id, rng.gen_bool(0.8))?;

        // Leave every tenth policy unaudited so audit runs find something.
        if i % 10 != 0 {
            store.insert_audit_record(&AuditRecord {
                id: uuid::Uuid::new_v4().to_string(),
                policy_id: Some(policy.id.clone()),
                policy_number: format!("APL-{i:05}"),
            })?;
        }
    }

    // One orphan audit row, as the legacy importer used to leave behind.
    store.insert_audit_record(&AuditRecord {
        id: uuid::Uuid::new_v4().to_string(),
        policy_id: None,
        policy_number: "APL-IMPORT-ORPHAN".into(),
    })?;

    Ok(())
}
