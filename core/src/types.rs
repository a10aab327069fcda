//! Shared primitive types used across the entire engine.

/// A stable, unique identifier for a campaign ("goal") record.
pub type CampaignId = String;

/// A stable, unique identifier for an insurance policy.
pub type PolicyId = String;
