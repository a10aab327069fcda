use super::{fmt_ts, fmt_ts_opt, parse_ts, parse_ts_opt, CampaignStore};
use crate::{
    error::EngineResult,
    model::{AcceptanceStatus, Campaign, CampaignStatus, CampaignType, Criterion},
};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

/// Raw campaign row as stored; converted to the domain type outside the
/// rusqlite row closure so parse failures surface as engine errors.
struct RawCampaign {
    id: String,
    title: String,
    campaign_type: String,
    target: f64,
    current_value: f64,
    progress_percentage: f64,
    status: String,
    criteria: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    last_updated: String,
    achieved_at: Option<String>,
    record_type: String,
    active: bool,
    acceptance_status: String,
}

impl RawCampaign {
    fn into_campaign(self) -> EngineResult<Campaign> {
        let criteria: Option<Vec<Criterion>> = match self.criteria.as_deref() {
            Some(raw) if !raw.trim().is_empty() => Some(serde_json::from_str(raw)?),
            _ => None,
        };
        Ok(Campaign {
            id: self.id,
            title: self.title,
            campaign_type: CampaignType::parse(&self.campaign_type)?,
            target: self.target,
            current_value: self.current_value,
            progress_percentage: self.progress_percentage,
            status: CampaignStatus::parse(&self.status)?,
            criteria: Campaign::normalize_criteria(criteria),
            start_date: parse_ts_opt(self.start_date)?,
            end_date: parse_ts_opt(self.end_date)?,
            last_updated: parse_ts(&self.last_updated)?,
            achieved_at: parse_ts_opt(self.achieved_at)?,
            record_type: self.record_type,
            active: self.active,
            acceptance_status: AcceptanceStatus::parse(&self.acceptance_status)?,
        })
    }
}

const CAMPAIGN_COLS: &str = "id, title, campaign_type, target, current_value, \
     progress_percentage, status, criteria, start_date, end_date, \
     last_updated, achieved_at, record_type, active, acceptance_status";

fn raw_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawCampaign> {
    Ok(RawCampaign {
        id: row.get(0)?,
        title: row.get(1)?,
        campaign_type: row.get(2)?,
        target: row.get(3)?,
        current_value: row.get(4)?,
        progress_percentage: row.get(5)?,
        status: row.get(6)?,
        criteria: row.get(7)?,
        start_date: row.get(8)?,
        end_date: row.get(9)?,
        last_updated: row.get(10)?,
        achieved_at: row.get(11)?,
        record_type: row.get(12)?,
        active: row.get(13)?,
        acceptance_status: row.get(14)?,
    })
}

impl CampaignStore {
    pub fn insert_campaign(&self, campaign: &Campaign) -> EngineResult<()> {
        let criteria_json = campaign
            .criteria
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        self.conn().execute(
            "INSERT INTO campaign
             (id, title, campaign_type, target, current_value,
              progress_percentage, status, criteria, start_date, end_date,
              last_updated, achieved_at, record_type, active, acceptance_status)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15)",
            params![
                campaign.id,
                campaign.title,
                campaign.campaign_type.as_str(),
                campaign.target,
                campaign.current_value,
                campaign.progress_percentage,
                campaign.status.as_str(),
                criteria_json,
                fmt_ts_opt(&campaign.start_date),
                fmt_ts_opt(&campaign.end_date),
                fmt_ts(&campaign.last_updated),
                fmt_ts_opt(&campaign.achieved_at),
                campaign.record_type,
                campaign.active,
                campaign.acceptance_status.as_str(),
            ],
        )?;
        Ok(())
    }

    pub fn get_campaign(&self, id: &str) -> EngineResult<Option<Campaign>> {
        let raw = self
            .conn()
            .query_row(
                &format!("SELECT {CAMPAIGN_COLS} FROM campaign WHERE id = ?1"),
                params![id],
                raw_from_row,
            )
            .optional()?;
        raw.map(RawCampaign::into_campaign).transpose()
    }

    /// Ids of campaigns eligible for recalculation: campaign records that
    /// are active and accepted. Ordered by id so passes are deterministic.
    pub fn list_eligible_campaign_ids(&self) -> EngineResult<Vec<String>> {
        let mut stmt = self.conn().prepare(
            "SELECT id FROM campaign
             WHERE record_type = 'campaign' AND active = 1
               AND acceptance_status = 'accepted'
             ORDER BY id ASC",
        )?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    /// The one write this subsystem performs on campaigns.
    pub fn update_campaign_progress(
        &self,
        id: &str,
        current_value: f64,
        progress_percentage: f64,
        status: CampaignStatus,
        last_updated: DateTime<Utc>,
        achieved_at: Option<DateTime<Utc>>,
    ) -> EngineResult<()> {
        self.conn().execute(
            "UPDATE campaign
             SET current_value = ?2, progress_percentage = ?3, status = ?4,
                 last_updated = ?5, achieved_at = ?6
             WHERE id = ?1",
            params![
                id,
                current_value,
                progress_percentage,
                status.as_str(),
                fmt_ts(&last_updated),
                fmt_ts_opt(&achieved_at),
            ],
        )?;
        Ok(())
    }

    /// Overwrite a campaign's raw criteria payload. Maintenance helper for
    /// backfilling legacy criteria blobs; normal code paths always write
    /// through `insert_campaign`.
    pub fn overwrite_campaign_criteria(&self, id: &str, raw_json: &str) -> EngineResult<()> {
        self.conn().execute(
            "UPDATE campaign SET criteria = ?2 WHERE id = ?1",
            params![id, raw_json],
        )?;
        Ok(())
    }

    pub fn campaign_count(&self) -> EngineResult<i64> {
        let count =
            self.conn()
                .query_row("SELECT COUNT(*) FROM campaign", [], |row| row.get(0))?;
        Ok(count)
    }
}
