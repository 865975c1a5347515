//! Learner progress records and the rules for updating them
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashMap;

/// Achievement ids held inline without allocation for the common case.
pub type AchievementSet = SmallVec<[String; 4]>;

/// The mini-games that feed the certification score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameKind {
    /// Match recovered artifacts to their period and culture.
    ArtifactIdentification,
    /// Grid excavation with tool choice and damage tracking.
    Excavation,
    /// Chart a wreck site from sonar readings.
    SiteMapping,
    /// Stabilize and preserve finds after recovery.
    Conservation,
}

impl GameKind {
    /// Every game kind, in the order shown to learners.
    pub const ALL: [Self; 4] = [
        Self::ArtifactIdentification,
        Self::Excavation,
        Self::SiteMapping,
        Self::Conservation,
    ];
}

impl std::fmt::Display for GameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ArtifactIdentification => write!(f, "Artifact Identification"),
            Self::Excavation => write!(f, "Excavation"),
            Self::SiteMapping => write!(f, "Site Mapping"),
            Self::Conservation => write!(f, "Conservation"),
        }
    }
}

/// Per-game progress for one learner.
///
/// Field names serialize in camelCase: these records travel inside the sync
/// blob that deployed clients already produce and consume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameProgress {
    pub game_type: GameKind,
    pub completed_levels: u32,
    pub total_levels: u32,
    pub best_score: f64,
    #[serde(default)]
    pub average_score: f64,
    /// Minutes spent in this game across all sessions.
    #[serde(default)]
    pub time_spent: f64,
    /// Wall-clock milliseconds of the most recent session.
    #[serde(default)]
    pub last_played: i64,
    /// Sessions folded into `average_score`. Older blobs omit it.
    #[serde(default)]
    pub sessions_played: u32,
    /// Append-only achievement identifiers.
    #[serde(default)]
    pub achievements: AchievementSet,
}

impl GameProgress {
    /// Fresh record for a game the learner has not played yet.
    #[must_use]
    pub fn new(game_type: GameKind, total_levels: u32) -> Self {
        Self {
            game_type,
            completed_levels: 0,
            total_levels,
            best_score: 0.0,
            average_score: 0.0,
            time_spent: 0.0,
            last_played: 0,
            sessions_played: 0,
            achievements: AchievementSet::new(),
        }
    }

    /// Level completion as a percentage, clamped to the record's own bounds.
    #[must_use]
    pub fn completion_pct(&self) -> f64 {
        if self.total_levels == 0 {
            return 0.0;
        }
        let ratio = f64::from(self.completed_levels.min(self.total_levels))
            / f64::from(self.total_levels);
        ratio * 100.0
    }

    /// Fold one finished session into the record.
    ///
    /// `completed_levels`, `best_score`, and `achievements` only ever grow;
    /// `average_score`, `time_spent`, and `last_played` track the sessions
    /// as they happen.
    pub fn apply_session(&mut self, session: &SessionResult) {
        self.total_levels = self.total_levels.max(session.total_levels);
        self.completed_levels = self
            .completed_levels
            .max(session.completed_levels)
            .min(self.total_levels);
        if session.score > self.best_score {
            self.best_score = session.score;
        }
        let played = f64::from(self.sessions_played);
        self.average_score = (self.average_score * played + session.score) / (played + 1.0);
        self.sessions_played = self.sessions_played.saturating_add(1);
        self.time_spent += session.minutes.max(0.0);
        self.last_played = self.last_played.max(session.played_at);
        for earned in &session.achievements {
            if !self.achievements.iter().any(|have| have == earned) {
                self.achievements.push(earned.clone());
            }
        }
    }
}

/// Outcome of a single play session, reported by the game client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResult {
    pub game_type: GameKind,
    pub score: f64,
    pub completed_levels: u32,
    /// Level count of the game content the session ran against.
    pub total_levels: u32,
    /// Minutes spent in this session.
    pub minutes: f64,
    /// Wall-clock milliseconds when the session ended.
    pub played_at: i64,
    #[serde(default)]
    pub achievements: AchievementSet,
}

/// Where the learner stands on the capstone certification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificationStatus {
    NotEligible,
    Eligible,
    Certified,
}

impl CertificationStatus {
    /// Certification is sticky; eligibility follows the readiness check.
    #[must_use]
    pub const fn derive(requirements_met: bool, previously_certified: bool) -> Self {
        if previously_certified {
            Self::Certified
        } else if requirements_met {
            Self::Eligible
        } else {
            Self::NotEligible
        }
    }
}

/// Roll-up across all of a learner's games, recomputed whenever any
/// per-game record changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallProgress {
    /// Mean of per-game level completion percentages, 0-100.
    pub overall_completion: f64,
    pub certification_status: CertificationStatus,
    /// Wall-clock milliseconds of the most recent activity in any game.
    pub last_activity: i64,
    /// Total minutes across all games.
    pub total_game_time: f64,
    /// Sum of per-game best scores.
    pub total_score: f64,
}

impl OverallProgress {
    /// Recompute the roll-up from the per-game records.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn derive(games: &[GameProgress], status: CertificationStatus) -> Self {
        let completion = if games.is_empty() {
            0.0
        } else {
            games.iter().map(GameProgress::completion_pct).sum::<f64>() / games.len() as f64
        };
        Self {
            overall_completion: completion,
            certification_status: status,
            last_activity: games.iter().map(|g| g.last_played).max().unwrap_or(0),
            total_game_time: games.iter().map(|g| g.time_spent).sum(),
            total_score: games.iter().map(|g| g.best_score).sum(),
        }
    }
}

/// One certification attempt, immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificationAttempt {
    /// Wall-clock milliseconds when the attempt was evaluated.
    pub timestamp: i64,
    /// Per-game scores at the time of the attempt.
    pub scores: HashMap<GameKind, f64>,
    pub overall_score: f64,
    pub passed: bool,
}
