//! Consistency auditor — cross-checks campaign caches against recomputed
//! values and scans the audit trail for structural gaps.
//!
//! RULE: audit findings are reports for human operators, never automatic
//! mutations. Orphan audit rows require review before deletion, so this
//! module only flags them. Corrective writes happen exclusively through
//! the calculator's epsilon-gated apply path.

use crate::{
    calculator,
    config::EngineConfig,
    error::EngineResult,
    model::{AuditRecord, Campaign, CampaignStatus, Policy},
    store::CampaignStore,
};

/// Findings of one audit scan. Informational only.
#[derive(Debug, Clone)]
pub struct ConsistencyReport {
    /// Audit rows whose policy_id is null.
    pub orphan_audit_records: Vec<AuditRecord>,
    /// Policies with no corresponding audit record.
    pub unaudited_policies: Vec<Policy>,
}

impl ConsistencyReport {
    pub fn is_clean(&self) -> bool {
        self.orphan_audit_records.is_empty() && self.unaudited_policies.is_empty()
    }
}

/// Scan for orphan audit records and unaudited policies. Pure read.
pub fn audit(store: &CampaignStore) -> EngineResult<ConsistencyReport> {
    let orphan_audit_records = store.list_orphan_audit_records()?;
    let unaudited_policies = store.list_unaudited_policies()?;

    if !orphan_audit_records.is_empty() || !unaudited_policies.is_empty() {
        log::info!(
            "consistency audit: {} orphan audit records, {} unaudited policies",
            orphan_audit_records.len(),
            unaudited_policies.len(),
        );
    }

    Ok(ConsistencyReport {
        orphan_audit_records,
        unaudited_policies,
    })
}

/// Check whether `campaign`'s cached progress matches a fresh
/// recomputation within epsilon. Returns true when consistent.
/// Uses the same calculator as the scheduled path.
pub fn validate_campaign_progress(
    store: &CampaignStore,
    config: &EngineConfig,
    campaign: &Campaign,
) -> EngineResult<bool> {
    let policies = store.list_active_linked_policies(&campaign.id)?;
    let fresh = calculator::recalculate(campaign, &policies, config);
    let fresh_status = if fresh.completed {
        CampaignStatus::Completed
    } else {
        CampaignStatus::Active
    };

    let consistent = (fresh.percentage - campaign.progress_percentage).abs()
        <= config.percentage_epsilon
        && (fresh.value - campaign.current_value).abs() <= config.value_epsilon
        && fresh_status == campaign.status;

    if !consistent {
        log::warn!(
            "campaign={} cache drift: stored {:.2}%/{:.2} vs recomputed {:.2}%/{:.2}",
            campaign.id,
            campaign.progress_percentage,
            campaign.current_value,
            fresh.percentage,
            fresh.value,
        );
    }

    Ok(consistent)
}

/// Recompute and repair one campaign's cached progress.
/// Returns true when a corrective write was persisted.
pub fn correct_campaign_progress(
    store: &CampaignStore,
    config: &EngineConfig,
    campaign_id: &str,
) -> EngineResult<bool> {
    let delta = calculator::recalculate_campaign(store, config, campaign_id)?;
    Ok(delta.updated)
}
