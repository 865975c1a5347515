use aquanaut_engine::{
    AchievementSet, AttemptOutcome, Certificate, CertificateStore, CertificationAttempt,
    CertificationEngine, CertificationStatus, GameKind, GameProgress, LearnerStore,
    OverallProgress, Priority, SessionResult, VerificationOutcome, average_improvement,
    is_improving, meets_requirements,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::convert::Infallible;
use std::rc::Rc;

const NOW: i64 = 1_700_000_000_000;
const HOUR_MS: i64 = 3_600_000;

#[derive(Clone, Default)]
struct MemoryStore {
    games: Rc<RefCell<HashMap<String, Vec<GameProgress>>>>,
    overall: Rc<RefCell<HashMap<String, OverallProgress>>>,
    attempts: Rc<RefCell<HashMap<String, Vec<CertificationAttempt>>>>,
    certificates: Rc<RefCell<HashMap<String, Certificate>>>,
}

impl LearnerStore for MemoryStore {
    type Error = Infallible;

    fn game_progress(&self, learner_id: &str) -> Result<Vec<GameProgress>, Self::Error> {
        Ok(self.games.borrow().get(learner_id).cloned().unwrap_or_default())
    }

    fn save_game_progress(
        &self,
        learner_id: &str,
        progress: &GameProgress,
    ) -> Result<(), Self::Error> {
        let mut games = self.games.borrow_mut();
        let records = games.entry(learner_id.to_string()).or_default();
        match records
            .iter_mut()
            .find(|game| game.game_type == progress.game_type)
        {
            Some(existing) => *existing = progress.clone(),
            None => records.push(progress.clone()),
        }
        Ok(())
    }

    fn overall_progress(&self, learner_id: &str) -> Result<Option<OverallProgress>, Self::Error> {
        Ok(self.overall.borrow().get(learner_id).cloned())
    }

    fn save_overall_progress(
        &self,
        learner_id: &str,
        overall: &OverallProgress,
    ) -> Result<(), Self::Error> {
        self.overall
            .borrow_mut()
            .insert(learner_id.to_string(), overall.clone());
        Ok(())
    }

    fn attempts(&self, learner_id: &str) -> Result<Vec<CertificationAttempt>, Self::Error> {
        Ok(self
            .attempts
            .borrow()
            .get(learner_id)
            .cloned()
            .unwrap_or_default())
    }

    fn push_attempt(
        &self,
        learner_id: &str,
        attempt: &CertificationAttempt,
    ) -> Result<(), Self::Error> {
        self.attempts
            .borrow_mut()
            .entry(learner_id.to_string())
            .or_default()
            .push(attempt.clone());
        Ok(())
    }
}

impl CertificateStore for MemoryStore {
    type Error = Infallible;

    fn insert(&self, certificate: &Certificate) -> Result<(), Self::Error> {
        self.certificates
            .borrow_mut()
            .insert(certificate.verification_code.clone(), certificate.clone());
        Ok(())
    }

    fn find_by_code(&self, code: &str) -> Result<Option<Certificate>, Self::Error> {
        Ok(self.certificates.borrow().get(code).cloned())
    }

    fn set_validity(&self, code: &str, is_valid: bool) -> Result<bool, Self::Error> {
        Ok(self
            .certificates
            .borrow_mut()
            .get_mut(code)
            .map(|cert| cert.is_valid = is_valid)
            .is_some())
    }
}

fn session(kind: GameKind, score: f64, levels: u32, at: i64) -> SessionResult {
    SessionResult {
        game_type: kind,
        score,
        completed_levels: levels,
        total_levels: 10,
        minutes: 6.0,
        played_at: at,
        achievements: AchievementSet::new(),
    }
}

#[test]
fn learner_journey_from_first_dive_to_certificate() {
    let store = MemoryStore::default();
    let engine = CertificationEngine::new(store.clone(), store.clone());
    let learner = "mara-04";

    // Early sessions: strong on artifacts, weak everywhere else.
    engine
        .record_session(learner, &session(GameKind::ArtifactIdentification, 88.0, 8, NOW))
        .unwrap();
    engine
        .record_session(learner, &session(GameKind::Excavation, 52.0, 3, NOW + 1_000))
        .unwrap();
    engine
        .record_session(learner, &session(GameKind::SiteMapping, 64.0, 4, NOW + 2_000))
        .unwrap();
    let overall = engine
        .record_session(learner, &session(GameKind::Conservation, 41.0, 2, NOW + 3_000))
        .unwrap();
    assert_eq!(overall.certification_status, CertificationStatus::NotEligible);
    assert!(!meets_requirements(
        &store.game_progress(learner).unwrap(),
        engine.config()
    ));

    // First attempt fails and produces a prioritized plan.
    let first_try = NOW + 4_000;
    let scores: HashMap<GameKind, f64> = HashMap::from([
        (GameKind::ArtifactIdentification, 88.0),
        (GameKind::Excavation, 52.0),
        (GameKind::SiteMapping, 64.0),
        (GameKind::Conservation, 41.0),
    ]);
    let outcome = engine
        .submit_attempt(learner, "Mara", &scores, first_try)
        .unwrap();
    let AttemptOutcome::NotReady { plan, retry, evaluation } = outcome else {
        panic!("first attempt should miss the bar");
    };
    assert!(!evaluation.all_requirements_met);
    assert_eq!(plan.items[0].game_type, GameKind::Conservation);
    assert_eq!(plan.items[0].priority, Priority::High);
    assert!(plan.estimated_minutes > 0.0);
    assert_eq!(retry.hours_remaining, 48);

    // Cooldown blocks a same-day retry without recording an attempt.
    let blocked = engine
        .submit_attempt(learner, "Mara", &scores, first_try + 20 * HOUR_MS)
        .unwrap();
    let AttemptOutcome::OnCooldown(gate) = blocked else {
        panic!("retry inside the cooldown window must be blocked");
    };
    assert!(gate.hours_remaining <= 28 && gate.hours_remaining > 0);
    assert_eq!(store.attempts(learner).unwrap().len(), 1);

    // Practice closes the gaps; the retest after the cooldown passes.
    engine
        .record_session(learner, &session(GameKind::Excavation, 81.0, 7, first_try + 30 * HOUR_MS))
        .unwrap();
    engine
        .record_session(learner, &session(GameKind::SiteMapping, 76.0, 6, first_try + 31 * HOUR_MS))
        .unwrap();
    engine
        .record_session(learner, &session(GameKind::Conservation, 72.0, 6, first_try + 32 * HOUR_MS))
        .unwrap();

    let second_try = first_try + 48 * HOUR_MS;
    let improved: HashMap<GameKind, f64> = HashMap::from([
        (GameKind::ArtifactIdentification, 88.0),
        (GameKind::Excavation, 81.0),
        (GameKind::SiteMapping, 76.0),
        (GameKind::Conservation, 72.0),
    ]);
    let outcome = engine
        .submit_attempt(learner, "Mara", &improved, second_try)
        .unwrap();
    let AttemptOutcome::Certified { certificate, evaluation } = outcome else {
        panic!("second attempt should certify");
    };
    assert!(evaluation.all_requirements_met);
    assert!(certificate.verification_code.starts_with("UWA-"));
    assert_eq!(certificate.digital_signature.len(), 16);
    assert!(certificate.signature_matches());

    // History shows a rising trend.
    let history = store.attempts(learner).unwrap();
    assert_eq!(history.len(), 2);
    assert!(is_improving(&history));
    assert!(average_improvement(&history) > 0.0);

    // Verification distinguishes valid, revoked, and unknown codes.
    let code = certificate.verification_code.clone();
    assert!(matches!(
        engine.verify_certificate(&code).unwrap(),
        VerificationOutcome::Valid(_)
    ));
    assert!(engine.revoke_certificate(&code).unwrap());
    assert!(engine.revoke_certificate(&code).unwrap(), "revoke is idempotent");
    let revoked = engine.verify_certificate(&code).unwrap();
    let VerificationOutcome::Revoked(kept) = revoked else {
        panic!("revoked certificate must still be found");
    };
    assert_eq!(kept.learner_name, "Mara");
    assert!(matches!(
        engine.verify_certificate("UWA-UNKNOWN").unwrap(),
        VerificationOutcome::NotFound
    ));
    assert!(!engine.revoke_certificate("UWA-UNKNOWN").unwrap());
}

#[test]
fn certification_survives_session_after_passing() {
    let store = MemoryStore::default();
    let engine = CertificationEngine::new(store.clone(), store.clone());
    let learner = "tide-11";

    for kind in GameKind::ALL {
        engine
            .record_session(learner, &session(kind, 90.0, 10, NOW))
            .unwrap();
    }
    let scores: HashMap<GameKind, f64> =
        GameKind::ALL.iter().map(|kind| (*kind, 90.0)).collect();
    let outcome = engine
        .submit_attempt(learner, "Kai", &scores, NOW + 1_000)
        .unwrap();
    assert!(matches!(outcome, AttemptOutcome::Certified { .. }));

    // A later low-scoring session never strips certified status.
    let overall = engine
        .record_session(learner, &session(GameKind::Excavation, 10.0, 1, NOW + 2_000))
        .unwrap();
    assert_eq!(overall.certification_status, CertificationStatus::Certified);
}

#[test]
fn attempt_with_unplayed_game_checks_against_zero() {
    let store = MemoryStore::default();
    let engine = CertificationEngine::new(store.clone(), store.clone());
    let scores: HashMap<GameKind, f64> = HashMap::from([
        (GameKind::ArtifactIdentification, 95.0),
        (GameKind::Excavation, 95.0),
        (GameKind::SiteMapping, 95.0),
    ]);

    let outcome = engine
        .submit_attempt("solo-22", "Ren", &scores, NOW)
        .unwrap();
    let AttemptOutcome::NotReady { evaluation, plan, .. } = outcome else {
        panic!("missing conservation score must fail the attempt");
    };
    let miss = &evaluation.failing[0];
    assert_eq!(miss.game_type, GameKind::Conservation);
    assert!((miss.gap - 65.0).abs() < 1e-9);
    assert!(plan.items[0].feedback.contains("65.0%"));
}
