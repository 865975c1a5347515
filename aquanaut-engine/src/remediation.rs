//! Practice planning for learners who fall short of the bar
use serde::{Deserialize, Serialize};

use crate::progress::GameKind;
use crate::score::FailedRequirement;

/// Minutes of practice assumed per percentage point of gap.
const MINUTES_PER_GAP_POINT: f64 = 2.0;

/// How urgently an activity needs attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Bucket a score gap. Ties at 20 and 10 resolve to the lower-urgency
    /// bucket.
    #[must_use]
    pub fn from_gap(gap: f64) -> Self {
        if gap > 20.0 {
            Self::High
        } else if gap > 10.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// Difficulty tier to recommend for the next practice session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    /// Recommend a tier from the learner's current score in an activity.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= 70.0 {
            Self::Advanced
        } else if score >= 60.0 {
            Self::Intermediate
        } else {
            Self::Beginner
        }
    }
}

/// One recommended practice activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeItem {
    pub game_type: GameKind,
    pub priority: Priority,
    pub difficulty: Difficulty,
    pub gap: f64,
    /// Learner-facing explanation of what is missing.
    pub feedback: String,
}

/// Prioritized practice recommendations plus a time estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemediationPlan {
    /// Highest-urgency activities first, widest gap first within a bucket.
    pub items: Vec<PracticeItem>,
    /// Total practice minutes estimated to close every gap.
    pub estimated_minutes: f64,
}

impl RemediationPlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Build a practice plan from the failing requirements of an evaluation.
///
/// Pure function of its inputs; an empty failure list produces an empty plan.
#[must_use]
pub fn plan_remediation(failing: &[FailedRequirement]) -> RemediationPlan {
    let mut items: Vec<PracticeItem> = failing
        .iter()
        .map(|miss| PracticeItem {
            game_type: miss.game_type,
            priority: Priority::from_gap(miss.gap),
            difficulty: Difficulty::from_score(miss.actual_score),
            gap: miss.gap,
            feedback: feedback_line(miss),
        })
        .collect();
    items.sort_by(|a, b| {
        urgency_rank(a.priority)
            .cmp(&urgency_rank(b.priority))
            .then(b.gap.total_cmp(&a.gap))
    });
    let estimated_minutes = failing
        .iter()
        .map(|miss| miss.gap * MINUTES_PER_GAP_POINT)
        .sum();
    RemediationPlan {
        items,
        estimated_minutes,
    }
}

const fn urgency_rank(priority: Priority) -> u8 {
    match priority {
        Priority::High => 0,
        Priority::Medium => 1,
        Priority::Low => 2,
    }
}

fn feedback_line(miss: &FailedRequirement) -> String {
    format!(
        "You are {gap:.1}% away from the {required:.0}% needed in {game}. A few more dives will get you there!",
        gap = miss.gap,
        required = miss.required_score,
        game = miss.game_type,
    )
}
