//! Cross-device progress snapshots: backup, restore, diff, and conflict
//! resolution
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::progress::{AchievementSet, GameProgress, OverallProgress};

const MS_PER_MINUTE: i64 = 60_000;
const MS_PER_HOUR: i64 = 3_600_000;
const MS_PER_DAY: i64 = 86_400_000;

/// Point-in-time bundle of a learner's progress, exchanged between devices
/// as a single JSON text blob. Field names are the ones deployed clients
/// already transport.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    /// Absent overall progress is an explicit empty state, not an omission.
    #[serde(default)]
    pub overall_progress: Option<OverallProgress>,
    #[serde(default)]
    pub game_progress: Vec<GameProgress>,
    /// Wall-clock milliseconds when the snapshot was taken. Absent on the
    /// degenerate empty bundle.
    #[serde(default)]
    pub sync_time: Option<i64>,
}

impl ProgressSnapshot {
    /// Capture a snapshot at `now`.
    #[must_use]
    pub const fn capture(
        overall_progress: Option<OverallProgress>,
        game_progress: Vec<GameProgress>,
        now: i64,
    ) -> Self {
        Self {
            overall_progress,
            game_progress,
            sync_time: Some(now),
        }
    }

    /// Serialize the bundle to the backup text blob.
    ///
    /// # Errors
    ///
    /// Returns a `serde_json::Error` if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a backup text blob back into a bundle.
    ///
    /// Corrupt text is a hard failure surfaced to the caller. The literal
    /// text `"null"` is valid per the serialization format and restores to
    /// the empty bundle.
    ///
    /// # Errors
    ///
    /// Returns a `serde_json::Error` when the text is not a structurally
    /// valid snapshot.
    pub fn restore(text: &str) -> Result<Self, serde_json::Error> {
        let parsed: Option<Self> = serde_json::from_str(text)?;
        Ok(parsed.unwrap_or_default())
    }
}

/// Structural check on an untrusted bundle before any typed parse.
///
/// A valid bundle is a non-null object carrying a `syncTime` and a
/// `gameProgress` array whose every element has at least `gameType` and
/// `completedLevels`. `overallProgress` is not deep-validated. Never fails;
/// a malformed value is simply reported as invalid.
#[must_use]
pub fn validate_bundle(value: &Value) -> bool {
    let Some(object) = value.as_object() else {
        return false;
    };
    if object.get("syncTime").is_none_or(Value::is_null) {
        return false;
    }
    let Some(games) = object.get("gameProgress").and_then(Value::as_array) else {
        return false;
    };
    games.iter().all(|game| {
        game.as_object().is_some_and(|fields| {
            fields.contains_key("gameType") && fields.contains_key("completedLevels")
        })
    })
}

/// Movement between two snapshots of the same learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressDelta {
    pub overall_completion_change: f64,
    pub score_change: f64,
    /// Change in total game minutes.
    pub time_change: f64,
    /// Achievement ids present in the new snapshot but not the old one,
    /// matched per game, sorted and deduplicated.
    pub new_achievements: Vec<String>,
}

impl ProgressDelta {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.overall_completion_change.abs() < f64::EPSILON
            && self.score_change.abs() < f64::EPSILON
            && self.time_change.abs() < f64::EPSILON
            && self.new_achievements.is_empty()
    }
}

/// Diff two snapshots. Absent overall progress on either side reads as a
/// zero baseline; that defaulting is deliberate and matches the deployed
/// clients.
#[must_use]
pub fn diff(old: &ProgressSnapshot, new: &ProgressSnapshot) -> ProgressDelta {
    let old_overall = old.overall_progress.as_ref();
    let new_overall = new.overall_progress.as_ref();
    let baseline =
        |side: Option<&OverallProgress>, pick: fn(&OverallProgress) -> f64| side.map_or(0.0, pick);

    let mut new_achievements: Vec<String> = new
        .game_progress
        .iter()
        .flat_map(|game| {
            let earned_before: AchievementSet = old
                .game_progress
                .iter()
                .find(|candidate| candidate.game_type == game.game_type)
                .map(|matched| matched.achievements.clone())
                .unwrap_or_default();
            game.achievements
                .iter()
                .filter(move |id| !earned_before.contains(*id))
                .cloned()
                .collect::<Vec<_>>()
        })
        .collect();
    new_achievements.sort();
    new_achievements.dedup();

    ProgressDelta {
        overall_completion_change: baseline(new_overall, |o| o.overall_completion)
            - baseline(old_overall, |o| o.overall_completion),
        score_change: baseline(new_overall, |o| o.total_score)
            - baseline(old_overall, |o| o.total_score),
        time_change: baseline(new_overall, |o| o.total_game_time)
            - baseline(old_overall, |o| o.total_game_time),
        new_achievements,
    }
}

/// Resolve divergent device snapshots: the strictly newer `sync_time` wins
/// in full, a tie keeps the first argument, and a missing `sync_time` loses
/// to any present one.
///
/// Last-write-wins at whole-snapshot granularity is a known limitation: an
/// older snapshot's device progress is dropped wholesale rather than merged
/// field by field, so a device that synced last with less progress can
/// regress another device's record.
#[must_use]
pub fn resolve(local: ProgressSnapshot, remote: ProgressSnapshot) -> ProgressSnapshot {
    if remote.sync_time > local.sync_time {
        log::debug!(
            "sync conflict resolved toward remote snapshot ({:?} > {:?})",
            remote.sync_time,
            local.sync_time
        );
        remote
    } else {
        local
    }
}

/// Learner-facing label for how long ago a device last synced.
#[must_use]
pub fn last_synced_label(last_sync: Option<i64>, now: i64) -> String {
    let Some(last) = last_sync else {
        return "Never synced".to_string();
    };
    let elapsed = (now - last).max(0);
    if elapsed < MS_PER_MINUTE {
        "Just now".to_string()
    } else if elapsed < MS_PER_HOUR {
        plural(elapsed / MS_PER_MINUTE, "minute")
    } else if elapsed < MS_PER_DAY {
        plural(elapsed / MS_PER_HOUR, "hour")
    } else {
        plural(elapsed / MS_PER_DAY, "day")
    }
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{count} {unit}s ago")
    }
}
