//! Retest cooldown gate and attempt-history trend analysis
use serde::{Deserialize, Serialize};

use crate::progress::{CertificationAttempt, GameProgress};
use crate::requirements::CertificationConfig;

const MS_PER_HOUR: i64 = 3_600_000;

/// Result of the cooldown check. A blocked retest is a normal negative
/// outcome the caller must branch on, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetestGate {
    pub allowed: bool,
    /// Whole hours until the next attempt opens; 0 when allowed.
    pub hours_remaining: i64,
}

impl RetestGate {
    const OPEN: Self = Self {
        allowed: true,
        hours_remaining: 0,
    };
}

/// Check whether enough wall-clock time has passed since the last attempt.
///
/// The gate opens exactly at `last_attempt + cooldown_hours` hours, not
/// before. Remaining time is reported in whole hours, rounded up.
#[must_use]
pub fn check_retest(last_attempt: i64, cooldown_hours: i64, now: i64) -> RetestGate {
    let ready_at = last_attempt + cooldown_hours.saturating_mul(MS_PER_HOUR);
    if now >= ready_at {
        return RetestGate::OPEN;
    }
    RetestGate {
        allowed: false,
        hours_remaining: ((ready_at - now) as u64).div_ceil(MS_PER_HOUR as u64) as i64,
    }
}

/// True when every attempt scored at least as well as the one before it.
/// A single attempt (or none) trivially counts as improving.
#[must_use]
pub fn is_improving(attempts: &[CertificationAttempt]) -> bool {
    attempts
        .windows(2)
        .all(|pair| pair[1].overall_score >= pair[0].overall_score)
}

/// Mean of consecutive score deltas across the attempt history.
/// With fewer than two attempts there is no trend and the mean is 0.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn average_improvement(attempts: &[CertificationAttempt]) -> f64 {
    if attempts.len() < 2 {
        return 0.0;
    }
    let total: f64 = attempts
        .windows(2)
        .map(|pair| pair[1].overall_score - pair[0].overall_score)
        .sum();
    total / (attempts.len() - 1) as f64
}

/// True when every configured requirement is covered by a progress record
/// whose best score clears the bar. A missing record counts as not met.
#[must_use]
pub fn meets_requirements(progress: &[GameProgress], config: &CertificationConfig) -> bool {
    config.requirements.iter().all(|req| {
        progress
            .iter()
            .find(|game| game.game_type == req.game_type)
            .is_some_and(|game| game.best_score >= req.required_score)
    })
}
