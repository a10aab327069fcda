//! campaign-core — the campaign progress recalculation and consistency
//! engine behind the brokerage back office.
//!
//! The back-office UI creates campaigns ("goals") and links policies to
//! them; this crate periodically recomputes each eligible campaign's
//! progress from its linked policies, detects drift between the cached
//! and recomputed values, and self-heals the cache. It also audits the
//! external audit trail for orphan records and unaudited policies.
//!
//! Control flow: scheduler tick → store lists eligible campaigns → for
//! each, the calculator pulls active-linked policies → the evaluator
//! scores each criterion → the calculator aggregates and applies an
//! epsilon-gated corrective write → the auditor reports consistency
//! findings for operators.

pub mod auditor;
pub mod calculator;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod model;
pub mod scheduler;
pub mod store;
pub mod types;

pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use scheduler::RecalculationScheduler;
pub use store::CampaignStore;
