use super::{fmt_ts, parse_ts, CampaignStore};
use crate::{
    error::{EngineError, EngineResult},
    scheduler::{PassTrigger, RecalculationResult},
};
use chrono::{DateTime, Utc};
use rusqlite::params;

/// One persisted recalculation pass, as read back from run history.
#[derive(Debug, Clone)]
pub struct RecalcRunRow {
    pub id: i64,
    pub trigger: PassTrigger,
    pub success: bool,
    pub recalculated_count: usize,
    pub errors: Vec<String>,
    pub started_at: DateTime<Utc>,
}

impl CampaignStore {
    pub fn insert_recalc_run(&self, result: &RecalculationResult) -> EngineResult<()> {
        self.conn().execute(
            "INSERT INTO recalc_run
             (trigger_source, success, recalculated_count, error_count, errors, started_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                result.trigger.as_str(),
                result.success,
                result.recalculated_count as i64,
                result.errors.len() as i64,
                serde_json::to_string(&result.errors)?,
                fmt_ts(&result.started_at),
            ],
        )?;
        Ok(())
    }

    /// Run history, most recent first.
    pub fn list_recalc_runs(&self) -> EngineResult<Vec<RecalcRunRow>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, trigger_source, success, recalculated_count, errors, started_at
             FROM recalc_run ORDER BY id DESC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, bool>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, raw_trigger, success, count, errors_json, started_at)| {
                let trigger =
                    PassTrigger::parse(&raw_trigger).ok_or(EngineError::InvalidField {
                        field: "trigger_source",
                        value: raw_trigger.clone(),
                    })?;
                Ok(RecalcRunRow {
                    id,
                    trigger,
                    success,
                    recalculated_count: count as usize,
                    errors: serde_json::from_str(&errors_json)?,
                    started_at: parse_ts(&started_at)?,
                })
            })
            .collect()
    }

    /// Delete all run history rows. Returns how many were removed.
    pub fn clear_recalc_runs(&self) -> EngineResult<usize> {
        let removed = self.conn().execute("DELETE FROM recalc_run", [])?;
        Ok(removed)
    }
}
