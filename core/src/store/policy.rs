use super::{fmt_ts, parse_ts, CampaignStore};
use crate::{
    error::{EngineError, EngineResult},
    model::{Policy, PolicyType},
};
use rusqlite::params;

struct RawPolicy {
    id: String,
    policy_type: String,
    premium_value: f64,
    created_at: String,
}

impl RawPolicy {
    fn into_policy(self) -> EngineResult<Policy> {
        let policy_type =
            PolicyType::parse(&self.policy_type).ok_or(EngineError::InvalidField {
                field: "policy_type",
                value: self.policy_type.clone(),
            })?;
        Ok(Policy {
            id: self.id,
            policy_type,
            premium_value: self.premium_value,
            created_at: parse_ts(&self.created_at)?,
        })
    }
}

fn raw_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawPolicy> {
    Ok(RawPolicy {
        id: row.get(0)?,
        policy_type: row.get(1)?,
        premium_value: row.get(2)?,
        created_at: row.get(3)?,
    })
}

impl CampaignStore {
    pub fn insert_policy(&self, policy: &Policy) -> EngineResult<()> {
        self.conn().execute(
            "INSERT INTO policy (id, policy_type, premium_value, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                policy.id,
                policy.policy_type.as_str(),
                policy.premium_value,
                fmt_ts(&policy.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn list_policies(&self) -> EngineResult<Vec<Policy>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, policy_type, premium_value, created_at
             FROM policy ORDER BY created_at ASC, id ASC",
        )?;
        let raws = stmt
            .query_map([], raw_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        raws.into_iter().map(RawPolicy::into_policy).collect()
    }

    // ── Policy-campaign links ──────────────────────────────────────

    pub fn link_policy(
        &self,
        policy_id: &str,
        campaign_id: &str,
        active: bool,
    ) -> EngineResult<()> {
        self.conn().execute(
            "INSERT INTO policy_campaign_link (policy_id, campaign_id, active)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (policy_id, campaign_id) DO UPDATE SET active = ?3",
            params![policy_id, campaign_id, active],
        )?;
        Ok(())
    }

    pub fn set_link_active(
        &self,
        policy_id: &str,
        campaign_id: &str,
        active: bool,
    ) -> EngineResult<()> {
        self.conn().execute(
            "UPDATE policy_campaign_link SET active = ?3
             WHERE policy_id = ?1 AND campaign_id = ?2",
            params![policy_id, campaign_id, active],
        )?;
        Ok(())
    }

    /// Policies whose link to `campaign_id` is currently active. This is
    /// the only policy set progress is ever computed from.
    pub fn list_active_linked_policies(&self, campaign_id: &str) -> EngineResult<Vec<Policy>> {
        let mut stmt = self.conn().prepare(
            "SELECT p.id, p.policy_type, p.premium_value, p.created_at
             FROM policy p
             JOIN policy_campaign_link l ON l.policy_id = p.id
             WHERE l.campaign_id = ?1 AND l.active = 1
             ORDER BY p.created_at ASC, p.id ASC",
        )?;
        let raws = stmt
            .query_map(params![campaign_id], raw_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        raws.into_iter().map(RawPolicy::into_policy).collect()
    }
}
