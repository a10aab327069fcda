//! Domain model for campaigns, criteria, policies, and audit records.
//!
//! RULE: a campaign either HAS a non-empty ordered list of criteria or HAS
//! NONE. Empty criteria arrays coming out of storage are normalized to `None`
//! at load time, so downstream code never branches on "empty vs absent".

use crate::{
    error::{EngineError, EngineResult},
    types::{CampaignId, PolicyId},
};
use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// ── Policy types ───────────────────────────────────────────────────

/// The two insurance products this brokerage sells.
///
/// Legacy campaign criteria were written with display strings
/// (`"Seguro Auto"` / `"Seguro Residencial"`) while newer records use the
/// normalized `auto` / `residencial`. `parse` is the single canonical
/// mapping: every path (evaluator, store load, validator) goes through it,
/// and we always serialize back the normalized form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyType {
    Auto,
    Residencial,
}

impl PolicyType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "auto" | "seguro auto" => Some(PolicyType::Auto),
            "residencial" | "seguro residencial" => Some(PolicyType::Residencial),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyType::Auto => "auto",
            PolicyType::Residencial => "residencial",
        }
    }
}

impl fmt::Display for PolicyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PolicyType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PolicyType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        PolicyType::parse(&raw)
            .ok_or_else(|| de::Error::custom(format!("unrecognized policy type '{raw}'")))
    }
}

// ── Campaign enums ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignType {
    Value,
    PolicyCount,
    Growth,
}

impl CampaignType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignType::Value => "value",
            CampaignType::PolicyCount => "policy_count",
            CampaignType::Growth => "growth",
        }
    }

    pub fn parse(s: &str) -> EngineResult<Self> {
        match s {
            "value" => Ok(CampaignType::Value),
            "policy_count" => Ok(CampaignType::PolicyCount),
            "growth" => Ok(CampaignType::Growth),
            _ => Err(EngineError::InvalidField {
                field: "campaign_type",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Active,
    Completed,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Active => "active",
            CampaignStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> EngineResult<Self> {
        match s {
            "active" => Ok(CampaignStatus::Active),
            "completed" => Ok(CampaignStatus::Completed),
            _ => Err(EngineError::InvalidField {
                field: "status",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceptanceStatus {
    Accepted,
    Pending,
    Rejected,
}

impl AcceptanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AcceptanceStatus::Accepted => "accepted",
            AcceptanceStatus::Pending => "pending",
            AcceptanceStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> EngineResult<Self> {
        match s {
            "accepted" => Ok(AcceptanceStatus::Accepted),
            "pending" => Ok(AcceptanceStatus::Pending),
            "rejected" => Ok(AcceptanceStatus::Rejected),
            _ => Err(EngineError::InvalidField {
                field: "acceptance_status",
                value: s.to_string(),
            }),
        }
    }
}

// ── Criteria ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Quantity,
    Value,
}

/// One filterable sub-target within a composite campaign.
/// Stateless: derived fresh from policies on every evaluation,
/// never persisted as partial state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    #[serde(default)]
    pub policy_type: Option<PolicyType>,
    pub target_type: TargetType,
    pub target_value: f64,
    #[serde(default)]
    pub min_value_per_policy: Option<f64>,
}

// ── Records ────────────────────────────────────────────────────────

/// A sales campaign ("goal"). Created by the back-office UI with criteria
/// frozen at creation; this subsystem only mutates the cached progress
/// columns and never deletes campaigns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub title: String,
    pub campaign_type: CampaignType,
    pub target: f64,
    pub current_value: f64,
    pub progress_percentage: f64,
    pub status: CampaignStatus,
    /// `Some` is guaranteed non-empty; see module docs.
    pub criteria: Option<Vec<Criterion>>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub last_updated: DateTime<Utc>,
    pub achieved_at: Option<DateTime<Utc>>,
    pub record_type: String,
    pub active: bool,
    pub acceptance_status: AcceptanceStatus,
}

impl Campaign {
    /// Normalize an empty criteria list to `None`.
    pub fn normalize_criteria(criteria: Option<Vec<Criterion>>) -> Option<Vec<Criterion>> {
        criteria.filter(|c| !c.is_empty())
    }
}

/// An insurance policy. Immutable from this subsystem's perspective;
/// owned by the policy-issuance workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    pub id: PolicyId,
    pub policy_type: PolicyType,
    pub premium_value: f64,
    pub created_at: DateTime<Utc>,
}

/// External audit trail row. The consistency auditor reads and flags
/// these; it never mutates policy data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: String,
    pub policy_id: Option<PolicyId>,
    pub policy_number: String,
}
