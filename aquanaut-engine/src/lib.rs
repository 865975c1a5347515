//! Aquanaut Academy Engine
//!
//! Platform-agnostic certification and progress logic for the Aquanaut
//! Academy underwater-archaeology learning games. This crate provides score
//! aggregation, remediation planning, retest policy, certificate issuance,
//! and cross-device progress sync without UI or platform-specific
//! dependencies.

pub mod certificate;
pub mod progress;
pub mod remediation;
pub mod requirements;
pub mod retest;
pub mod score;
pub mod sync;

// Re-export commonly used types
pub use certificate::{
    CERTIFICATE_TYPE, CODE_PREFIX, Certificate, VerificationOutcome, digital_signature,
    verification_code,
};
pub use progress::{
    AchievementSet, CertificationAttempt, CertificationStatus, GameKind, GameProgress,
    OverallProgress, SessionResult,
};
pub use remediation::{Difficulty, PracticeItem, Priority, RemediationPlan, plan_remediation};
pub use requirements::{CertificationConfig, Requirement, RequirementError};
pub use retest::{RetestGate, average_improvement, check_retest, is_improving, meets_requirements};
pub use score::{FailedRequirement, RequirementCheck, ScoreEvaluation, checks_from_scores, evaluate};
pub use sync::{ProgressDelta, ProgressSnapshot, diff, last_synced_label, resolve, validate_bundle};

use std::collections::HashMap;

/// Trait for abstracting learner progress persistence
/// Platform-specific implementations should provide this
pub trait LearnerStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load every per-game progress record for a learner
    ///
    /// # Errors
    ///
    /// Returns an error if the records cannot be loaded.
    fn game_progress(&self, learner_id: &str) -> Result<Vec<GameProgress>, Self::Error>;

    /// Write one per-game progress record
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    fn save_game_progress(
        &self,
        learner_id: &str,
        progress: &GameProgress,
    ) -> Result<(), Self::Error>;

    /// Load the learner's roll-up record, if one exists yet
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be loaded.
    fn overall_progress(&self, learner_id: &str) -> Result<Option<OverallProgress>, Self::Error>;

    /// Write the learner's roll-up record
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    fn save_overall_progress(
        &self,
        learner_id: &str,
        overall: &OverallProgress,
    ) -> Result<(), Self::Error>;

    /// Load the attempt history, oldest first
    ///
    /// # Errors
    ///
    /// Returns an error if the history cannot be loaded.
    fn attempts(&self, learner_id: &str) -> Result<Vec<CertificationAttempt>, Self::Error>;

    /// Append one attempt to the history
    ///
    /// # Errors
    ///
    /// Returns an error if the attempt cannot be appended.
    fn push_attempt(
        &self,
        learner_id: &str,
        attempt: &CertificationAttempt,
    ) -> Result<(), Self::Error>;
}

/// Trait for abstracting certificate persistence, keyed by verification code
pub trait CertificateStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Persist a freshly minted certificate
    ///
    /// # Errors
    ///
    /// Returns an error if the certificate cannot be stored.
    fn insert(&self, certificate: &Certificate) -> Result<(), Self::Error>;

    /// Look up a certificate by its verification code
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup cannot be performed.
    fn find_by_code(&self, code: &str) -> Result<Option<Certificate>, Self::Error>;

    /// Flip a certificate's validity flag, returning whether the code
    /// matched an existing record. Records are never deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the update cannot be written.
    fn set_validity(&self, code: &str, is_valid: bool) -> Result<bool, Self::Error>;
}

/// Result of one certification attempt submission.
///
/// Cooldown blocks and failed requirement checks are ordinary outcomes the
/// caller branches on, never errors.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    /// Every requirement met: a certificate was minted and stored.
    Certified {
        certificate: Certificate,
        evaluation: ScoreEvaluation,
    },
    /// Requirements missed: practice plan plus the gate for the next try.
    NotReady {
        evaluation: ScoreEvaluation,
        plan: RemediationPlan,
        retry: RetestGate,
    },
    /// The cooldown window since the last attempt has not elapsed; nothing
    /// was recorded.
    OnCooldown(RetestGate),
}

/// Main engine wiring the certification flow over the storage seams
pub struct CertificationEngine<P, C>
where
    P: LearnerStore,
    C: CertificateStore,
{
    progress_store: P,
    certificate_store: C,
    config: CertificationConfig,
}

impl<P, C> CertificationEngine<P, C>
where
    P: LearnerStore,
    C: CertificateStore,
{
    /// Create an engine with the default requirement table.
    pub fn new(progress_store: P, certificate_store: C) -> Self {
        Self {
            progress_store,
            certificate_store,
            config: CertificationConfig::default(),
        }
    }

    /// Create an engine with a custom requirement table.
    ///
    /// # Errors
    ///
    /// Returns `RequirementError` if the table violates its invariants.
    pub fn with_config(
        progress_store: P,
        certificate_store: C,
        config: CertificationConfig,
    ) -> Result<Self, RequirementError> {
        config.validate()?;
        Ok(Self {
            progress_store,
            certificate_store,
            config,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &CertificationConfig {
        &self.config
    }

    /// Fold a finished game session into the learner's records and
    /// recompute the roll-up.
    ///
    /// # Errors
    ///
    /// Returns the store's error if any record cannot be read or written.
    pub fn record_session(
        &self,
        learner_id: &str,
        session: &SessionResult,
    ) -> Result<OverallProgress, P::Error> {
        let mut games = self.progress_store.game_progress(learner_id)?;
        let slot = match games
            .iter()
            .position(|game| game.game_type == session.game_type)
        {
            Some(found) => found,
            None => {
                games.push(GameProgress::new(session.game_type, session.total_levels));
                games.len() - 1
            }
        };
        games[slot].apply_session(session);
        let updated = games[slot].clone();
        self.progress_store
            .save_game_progress(learner_id, &updated)?;

        let previously_certified = self
            .progress_store
            .overall_progress(learner_id)?
            .is_some_and(|overall| {
                overall.certification_status == CertificationStatus::Certified
            });
        let status = CertificationStatus::derive(
            retest::meets_requirements(&games, &self.config),
            previously_certified,
        );
        let overall = OverallProgress::derive(&games, status);
        self.progress_store
            .save_overall_progress(learner_id, &overall)?;
        Ok(overall)
    }

    /// Run one certification attempt: cooldown gate, then aggregation, then
    /// either a certificate or a practice plan.
    ///
    /// Games missing from `scores` check against 0. A cooldown block records
    /// nothing.
    ///
    /// # Errors
    ///
    /// Returns an error only for storage failures; every policy outcome is
    /// an `AttemptOutcome` variant.
    pub fn submit_attempt(
        &self,
        learner_id: &str,
        learner_name: &str,
        scores: &HashMap<GameKind, f64>,
        now: i64,
    ) -> Result<AttemptOutcome, anyhow::Error> {
        let history = self.progress_store.attempts(learner_id)?;
        if let Some(last) = history.last() {
            let gate = retest::check_retest(last.timestamp, self.config.cooldown_hours, now);
            if !gate.allowed {
                return Ok(AttemptOutcome::OnCooldown(gate));
            }
        }

        let checks = score::checks_from_scores(scores, &self.config);
        let evaluation = score::evaluate(&checks, &self.config);
        let attempt = CertificationAttempt {
            timestamp: now,
            scores: checks
                .iter()
                .map(|check| (check.game_type, check.actual_score))
                .collect(),
            overall_score: evaluation.overall_score,
            passed: evaluation.all_requirements_met,
        };
        self.progress_store.push_attempt(learner_id, &attempt)?;

        if evaluation.all_requirements_met {
            let certificate = certificate::issue(learner_id, learner_name, &attempt.scores, now);
            self.certificate_store.insert(&certificate)?;
            let games = self.progress_store.game_progress(learner_id)?;
            let overall = OverallProgress::derive(&games, CertificationStatus::Certified);
            self.progress_store
                .save_overall_progress(learner_id, &overall)?;
            return Ok(AttemptOutcome::Certified {
                certificate,
                evaluation,
            });
        }

        let plan = remediation::plan_remediation(&evaluation.failing);
        let retry = retest::check_retest(now, self.config.cooldown_hours, now);
        Ok(AttemptOutcome::NotReady {
            evaluation,
            plan,
            retry,
        })
    }

    /// Look up a verification code.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the lookup cannot be performed.
    pub fn verify_certificate(&self, code: &str) -> Result<VerificationOutcome, C::Error> {
        Ok(VerificationOutcome::from_lookup(
            self.certificate_store.find_by_code(code)?,
        ))
    }

    /// Revoke a certificate. Idempotent; the record is kept for audit.
    /// Returns whether the code matched a certificate.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the update cannot be written.
    pub fn revoke_certificate(&self, code: &str) -> Result<bool, C::Error> {
        let existed = self.certificate_store.set_validity(code, false)?;
        if existed {
            log::warn!("certificate {code} revoked");
        }
        Ok(existed)
    }

    /// Serialize the learner's current progress as a backup blob.
    ///
    /// # Errors
    ///
    /// Returns an error if the records cannot be read or serialized.
    pub fn backup(&self, learner_id: &str, now: i64) -> Result<String, anyhow::Error> {
        let snapshot = ProgressSnapshot::capture(
            self.progress_store.overall_progress(learner_id)?,
            self.progress_store.game_progress(learner_id)?,
            now,
        );
        Ok(snapshot.to_json()?)
    }

    /// Reconcile a snapshot pushed by another device against local state and
    /// persist the winner (last-write-wins at snapshot granularity).
    ///
    /// # Errors
    ///
    /// Returns an error when the pushed blob is corrupt or storage fails.
    pub fn sync_with(
        &self,
        learner_id: &str,
        remote_blob: &str,
        now: i64,
    ) -> Result<ProgressSnapshot, anyhow::Error> {
        let remote = ProgressSnapshot::restore(remote_blob)?;
        let local = ProgressSnapshot::capture(
            self.progress_store.overall_progress(learner_id)?,
            self.progress_store.game_progress(learner_id)?,
            now,
        );
        let winner = sync::resolve(local, remote);
        for game in &winner.game_progress {
            self.progress_store.save_game_progress(learner_id, game)?;
        }
        if let Some(overall) = &winner.overall_progress {
            self.progress_store
                .save_overall_progress(learner_id, overall)?;
        }
        Ok(winner)
    }
}
