//! Criterion evaluator — scores a single criterion against a policy set.
//!
//! Pure and deterministic: no store access, no clock, no side effects.
//! Both the scheduled recalculation path and the on-demand validator call
//! this same function; there is deliberately no second implementation.

use crate::model::{Criterion, Policy, TargetType};

/// Result of evaluating one criterion against a policy set.
#[derive(Debug, Clone, PartialEq)]
pub struct CriterionScore {
    pub percentage: f64,
    pub completed: bool,
    pub matched_count: usize,
    pub matched_value: f64,
}

/// Score `criterion` against `policies`.
///
/// A policy matches when it passes the criterion's policy-type filter (if
/// set) and its premium is at or above `min_value_per_policy` (if set).
/// A non-positive `target_value` yields 0% rather than a divide-by-zero.
pub fn evaluate(criterion: &Criterion, policies: &[Policy]) -> CriterionScore {
    let mut matched_count = 0usize;
    let mut matched_value = 0.0f64;

    for policy in policies {
        let type_ok = criterion
            .policy_type
            .map_or(true, |t| t == policy.policy_type);
        let floor_ok = criterion
            .min_value_per_policy
            .map_or(true, |min| policy.premium_value >= min);
        if type_ok && floor_ok {
            matched_count += 1;
            matched_value += policy.premium_value;
        }
    }

    let percentage = if criterion.target_value <= 0.0 {
        0.0
    } else {
        match criterion.target_type {
            TargetType::Quantity => matched_count as f64 / criterion.target_value * 100.0,
            TargetType::Value => matched_value / criterion.target_value * 100.0,
        }
    };

    CriterionScore {
        percentage,
        completed: percentage >= 100.0,
        matched_count,
        matched_value,
    }
}
