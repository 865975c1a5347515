//! Weighted score aggregation and the pass/fail verdict
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::progress::GameKind;
use crate::requirements::CertificationConfig;

/// One requirement paired with the score the learner actually holds.
///
/// Callers supply `actual_score = 0.0` for games never played.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementCheck {
    pub game_type: GameKind,
    pub required_score: f64,
    pub actual_score: f64,
}

/// A requirement the learner has not met yet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedRequirement {
    pub game_type: GameKind,
    pub required_score: f64,
    pub actual_score: f64,
    /// Percentage points still missing; non-negative by construction.
    pub gap: f64,
}

/// Aggregated verdict over one set of requirement checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreEvaluation {
    /// Weighted sum of actual scores; games without a configured weight
    /// contribute nothing.
    pub overall_score: f64,
    pub all_requirements_met: bool,
    pub failing: Vec<FailedRequirement>,
}

/// Evaluate requirement checks against a weight table.
///
/// Pure computation: no side effects, no error conditions.
#[must_use]
pub fn evaluate(checks: &[RequirementCheck], config: &CertificationConfig) -> ScoreEvaluation {
    let overall_score = checks
        .iter()
        .map(|check| check.actual_score * config.weight_for(check.game_type))
        .sum();
    let failing: Vec<FailedRequirement> = checks
        .iter()
        .filter(|check| check.actual_score < check.required_score)
        .map(|check| FailedRequirement {
            game_type: check.game_type,
            required_score: check.required_score,
            actual_score: check.actual_score,
            gap: check.required_score - check.actual_score,
        })
        .collect();
    ScoreEvaluation {
        overall_score,
        all_requirements_met: failing.is_empty(),
        failing,
    }
}

/// Build requirement checks from a score map, one per configured game.
///
/// Games missing from the map check against a score of 0.
#[must_use]
pub fn checks_from_scores(
    scores: &HashMap<GameKind, f64>,
    config: &CertificationConfig,
) -> Vec<RequirementCheck> {
    config
        .requirements
        .iter()
        .map(|req| RequirementCheck {
            game_type: req.game_type,
            required_score: req.required_score,
            actual_score: scores.get(&req.game_type).copied().unwrap_or(0.0),
        })
        .collect()
}
