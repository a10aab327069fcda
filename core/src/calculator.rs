//! Campaign progress calculator — recomputes one campaign's progress from
//! its linked policies and persists the result when it drifts past epsilon.
//!
//! Design:
//!   - Criteria campaigns: percentage = arithmetic mean of per-criterion
//!     percentages (NOT weighted by criterion target size); completed =
//!     every criterion completed (logical AND, not mean >= 100).
//!   - current_value always sums premiums of ALL active-linked policies,
//!     not just criterion-matching ones: it tracks total revenue through
//!     the campaign regardless of which criterion each policy satisfies.
//!   - Flat campaigns: value / target * 100 with a zero-target guard.
//!   - Writes are epsilon-gated to avoid noisy no-op updates on float
//!     drift; thresholds live in EngineConfig.

use crate::{
    config::EngineConfig,
    error::{EngineError, EngineResult},
    evaluator,
    model::{Campaign, CampaignStatus, Policy},
    store::CampaignStore,
};
use chrono::Utc;

/// Freshly recomputed progress for one campaign.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressResult {
    pub value: f64,
    pub percentage: f64,
    pub completed: bool,
}

/// What a recalculation changed (or would have changed) for one campaign.
#[derive(Debug, Clone)]
pub struct ProgressDelta {
    pub campaign_id: String,
    pub previous_value: f64,
    pub new_value: f64,
    pub previous_percentage: f64,
    pub new_percentage: f64,
    pub previous_status: CampaignStatus,
    pub new_status: CampaignStatus,
    /// True when drift exceeded epsilon and a write was persisted.
    pub updated: bool,
}

/// Recompute progress for `campaign` from its active-linked policies.
/// Pure given its inputs; the percentage is capped at
/// `config.percentage_cap` before it ever reaches storage.
pub fn recalculate(
    campaign: &Campaign,
    linked_policies: &[Policy],
    config: &EngineConfig,
) -> ProgressResult {
    let total_value: f64 = linked_policies.iter().map(|p| p.premium_value).sum();

    // A hand-built Some(vec![]) that bypassed normalize_criteria is
    // treated as a flat target, not as zero criteria.
    match campaign.criteria.as_deref() {
        Some(criteria) if !criteria.is_empty() => {
            let scores: Vec<_> = criteria
                .iter()
                .map(|c| evaluator::evaluate(c, linked_policies))
                .collect();
            let mean =
                scores.iter().map(|s| s.percentage).sum::<f64>() / scores.len() as f64;
            let completed = scores.iter().all(|s| s.completed);
            ProgressResult {
                value: total_value,
                percentage: mean.min(config.percentage_cap),
                completed,
            }
        }
        _ => {
            let percentage = if campaign.target <= 0.0 {
                0.0
            } else {
                total_value / campaign.target * 100.0
            };
            ProgressResult {
                value: total_value,
                percentage: percentage.min(config.percentage_cap),
                completed: percentage >= 100.0,
            }
        }
    }
}

/// Persist `result` for `campaign` iff it drifted past epsilon.
///
/// The write covers current_value, progress_percentage, status,
/// last_updated, and achieved_at. achieved_at is stamped on the
/// transition into completed, preserved while the campaign stays
/// completed, and cleared when it drops back to active.
pub fn apply(
    store: &CampaignStore,
    campaign: &Campaign,
    result: &ProgressResult,
    config: &EngineConfig,
) -> EngineResult<ProgressDelta> {
    let new_status = if result.completed {
        CampaignStatus::Completed
    } else {
        CampaignStatus::Active
    };

    let drifted = (result.percentage - campaign.progress_percentage).abs()
        > config.percentage_epsilon
        || (result.value - campaign.current_value).abs() > config.value_epsilon
        || new_status != campaign.status;

    if drifted {
        let now = Utc::now();
        let achieved_at = match new_status {
            CampaignStatus::Active => None,
            CampaignStatus::Completed => campaign.achieved_at.or(Some(now)),
        };
        store.update_campaign_progress(
            &campaign.id,
            result.value,
            result.percentage,
            new_status,
            now,
            achieved_at,
        )?;
        log::debug!(
            "campaign={} progress {:.2}% -> {:.2}% (value {:.2} -> {:.2}, status {} -> {})",
            campaign.id,
            campaign.progress_percentage,
            result.percentage,
            campaign.current_value,
            result.value,
            campaign.status.as_str(),
            new_status.as_str(),
        );
    }

    Ok(ProgressDelta {
        campaign_id: campaign.id.clone(),
        previous_value: campaign.current_value,
        new_value: result.value,
        previous_percentage: campaign.progress_percentage,
        new_percentage: result.percentage,
        previous_status: campaign.status,
        new_status,
        updated: drifted,
    })
}

/// Fetch one campaign by id, recompute its progress from active-linked
/// policies, and apply the epsilon-gated write. Errors if the campaign
/// does not exist.
pub fn recalculate_campaign(
    store: &CampaignStore,
    config: &EngineConfig,
    campaign_id: &str,
) -> EngineResult<ProgressDelta> {
    let campaign = store
        .get_campaign(campaign_id)?
        .ok_or_else(|| EngineError::CampaignNotFound {
            id: campaign_id.to_string(),
        })?;
    let policies = store.list_active_linked_policies(campaign_id)?;
    let result = recalculate(&campaign, &policies, config);
    apply(store, &campaign, &result, config)
}
