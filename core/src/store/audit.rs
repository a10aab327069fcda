use super::{parse_ts, CampaignStore};
use crate::{
    error::{EngineError, EngineResult},
    model::{AuditRecord, Policy, PolicyType},
};
use rusqlite::params;

impl CampaignStore {
    pub fn insert_audit_record(&self, record: &AuditRecord) -> EngineResult<()> {
        self.conn().execute(
            "INSERT INTO audit_record (id, policy_id, policy_number)
             VALUES (?1, ?2, ?3)",
            params![record.id, record.policy_id, record.policy_number],
        )?;
        Ok(())
    }

    pub fn list_audit_records(&self) -> EngineResult<Vec<AuditRecord>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT id, policy_id, policy_number FROM audit_record ORDER BY id ASC")?;
        let records = stmt
            .query_map([], |row| {
                Ok(AuditRecord {
                    id: row.get(0)?,
                    policy_id: row.get(1)?,
                    policy_number: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Audit rows whose policy_id is null. Reported, never auto-deleted.
    pub fn list_orphan_audit_records(&self) -> EngineResult<Vec<AuditRecord>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, policy_id, policy_number FROM audit_record
             WHERE policy_id IS NULL ORDER BY id ASC",
        )?;
        let records = stmt
            .query_map([], |row| {
                Ok(AuditRecord {
                    id: row.get(0)?,
                    policy_id: row.get(1)?,
                    policy_number: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Policies with no corresponding audit record by policy_id.
    pub fn list_unaudited_policies(&self) -> EngineResult<Vec<Policy>> {
        let mut stmt = self.conn().prepare(
            "SELECT p.id, p.policy_type, p.premium_value, p.created_at
             FROM policy p
             LEFT JOIN audit_record a ON a.policy_id = p.id
             WHERE a.id IS NULL
             ORDER BY p.created_at ASC, p.id ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, raw_type, premium_value, created_at)| {
                let policy_type =
                    PolicyType::parse(&raw_type).ok_or(EngineError::InvalidField {
                        field: "policy_type",
                        value: raw_type.clone(),
                    })?;
                Ok(Policy {
                    id,
                    policy_type,
                    premium_value,
                    created_at: parse_ts(&created_at)?,
                })
            })
            .collect()
    }
}
