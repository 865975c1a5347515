//! Certification requirement configuration
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::progress::GameKind;

/// Score bar and weight for one game in the certification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requirement {
    pub game_type: GameKind,
    /// Minimum best score, 0-100.
    pub required_score: f64,
    /// Share of the weighted overall score. Weights sum to 1.0.
    pub weight: f64,
}

/// Full requirement table for the capstone certification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificationConfig {
    pub requirements: Vec<Requirement>,
    /// Hours a learner must wait between certification attempts.
    #[serde(default = "CertificationConfig::default_cooldown_hours")]
    pub cooldown_hours: i64,
}

/// How far the weight sum may drift from 1.0 before the table is rejected.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

impl CertificationConfig {
    #[must_use]
    pub const fn default_cooldown_hours() -> i64 {
        48
    }

    /// Parse a requirement table from configuration JSON.
    ///
    /// # Errors
    ///
    /// Returns a `serde_json::Error` if the JSON does not match the schema.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// The weight configured for a game, 0.0 when the game is not part of
    /// the certification.
    #[must_use]
    pub fn weight_for(&self, kind: GameKind) -> f64 {
        self.requirements
            .iter()
            .find(|req| req.game_type == kind)
            .map_or(0.0, |req| req.weight)
    }

    /// Look up the requirement for a game, if it is part of the table.
    #[must_use]
    pub fn requirement_for(&self, kind: GameKind) -> Option<&Requirement> {
        self.requirements.iter().find(|req| req.game_type == kind)
    }

    /// Validate the table invariants before use.
    ///
    /// # Errors
    ///
    /// Returns `RequirementError` when a score leaves 0-100, a weight is
    /// negative, the weights do not sum to 1.0, a game appears twice, or the
    /// cooldown is negative.
    pub fn validate(&self) -> Result<(), RequirementError> {
        if self.requirements.is_empty() {
            return Err(RequirementError::Empty);
        }
        for req in &self.requirements {
            if !(0.0..=100.0).contains(&req.required_score) {
                return Err(RequirementError::ScoreOutOfRange {
                    game: req.game_type,
                    value: req.required_score,
                });
            }
            if req.weight < 0.0 {
                return Err(RequirementError::NegativeWeight {
                    game: req.game_type,
                    value: req.weight,
                });
            }
            let dupes = self
                .requirements
                .iter()
                .filter(|other| other.game_type == req.game_type)
                .count();
            if dupes > 1 {
                return Err(RequirementError::DuplicateGame { game: req.game_type });
            }
        }
        let sum: f64 = self.requirements.iter().map(|req| req.weight).sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(RequirementError::WeightSum { sum });
        }
        if self.cooldown_hours < 0 {
            return Err(RequirementError::NegativeCooldown {
                hours: self.cooldown_hours,
            });
        }
        Ok(())
    }
}

impl Default for CertificationConfig {
    fn default() -> Self {
        Self {
            requirements: vec![
                Requirement {
                    game_type: GameKind::ArtifactIdentification,
                    required_score: 70.0,
                    weight: 0.3,
                },
                Requirement {
                    game_type: GameKind::Excavation,
                    required_score: 70.0,
                    weight: 0.3,
                },
                Requirement {
                    game_type: GameKind::SiteMapping,
                    required_score: 65.0,
                    weight: 0.2,
                },
                Requirement {
                    game_type: GameKind::Conservation,
                    required_score: 65.0,
                    weight: 0.2,
                },
            ],
            cooldown_hours: Self::default_cooldown_hours(),
        }
    }
}

/// Invalid requirement table.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RequirementError {
    #[error("requirement table is empty")]
    Empty,
    #[error("{game} required score must be between 0 and 100 (got {value:.2})")]
    ScoreOutOfRange { game: GameKind, value: f64 },
    #[error("{game} weight must not be negative (got {value:.2})")]
    NegativeWeight { game: GameKind, value: f64 },
    #[error("{game} appears more than once in the requirement table")]
    DuplicateGame { game: GameKind },
    #[error("weights must sum to 1.0 (got {sum:.6})")]
    WeightSum { sum: f64 },
    #[error("cooldown hours must not be negative (got {hours})")]
    NegativeCooldown { hours: i64 },
}
