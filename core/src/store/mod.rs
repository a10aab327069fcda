//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database. The calculator, auditor,
//! and scheduler call store methods — they never execute SQL directly.

mod audit;
mod campaign;
mod policy;
mod runs;

pub use runs::RecalcRunRow;

use crate::error::EngineResult;
use chrono::{DateTime, Utc};
use rusqlite::Connection;

pub struct CampaignStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file/URI
}

impl CampaignStore {
    /// Open (or create) the campaign database at `path`. URI filenames are
    /// accepted, so tests can use `file:x?mode=memory&cache=shared` to let
    /// several connections share one in-memory database.
    pub fn open(path: &str) -> EngineResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> EngineResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, path: None })
    }

    /// Reopen a new connection to the same database. The scheduler's
    /// worker thread uses this so each thread owns its own connection.
    /// For plain in-memory databases this returns an isolated database.
    pub fn reopen(&self) -> EngineResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// True for a plain `:memory:` store, which `reopen()` cannot share
    /// with another connection.
    pub fn is_private_memory(&self) -> bool {
        self.path.is_none()
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> EngineResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_schema.sql"))?;
        Ok(())
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Timestamp column helpers ───────────────────────────────────────

pub(crate) fn parse_ts(raw: &str) -> EngineResult<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}

pub(crate) fn parse_ts_opt(raw: Option<String>) -> EngineResult<Option<DateTime<Utc>>> {
    raw.as_deref().map(parse_ts).transpose()
}

pub(crate) fn fmt_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

pub(crate) fn fmt_ts_opt(ts: &Option<DateTime<Utc>>) -> Option<String> {
    ts.as_ref().map(fmt_ts)
}
