//! Certificate minting, verification, and revocation.
//! Code format: UWA-<TIMESTAMP36>-<HASH36>, e.g. UWA-LOYW3V28-1Z324J
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::progress::GameKind;

/// Fixed certificate type for the capstone.
pub const CERTIFICATE_TYPE: &str = "underwater_archaeology";

/// Public prefix printed on every verification code.
pub const CODE_PREFIX: &str = "UWA-";

const CODE_MAX_LEN: usize = 20;
const SIGNATURE_LEN: usize = 16;

/// Rolling hash used by already-issued certificates: 32-bit signed overflow
/// arithmetic over UTF-16 code units, truncated at every step.
///
/// This is a legacy format reproduced bit-for-bit, not a security boundary.
/// It is not collision-resistant and must not be treated as tamper-proof.
fn legacy_hash(input: &str) -> i32 {
    let mut hash: i32 = 0;
    for unit in input.encode_utf16() {
        hash = hash.wrapping_mul(31).wrapping_add(i32::from(unit));
    }
    hash
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    if value == 0 {
        return "0".to_string();
    }
    let mut digits: Vec<char> = Vec::new();
    while value > 0 {
        digits.push(char::from(DIGITS[(value % 36) as usize]));
        value /= 36;
    }
    digits.iter().rev().collect()
}

/// A minted certificate. Never deleted; revocation only flips `is_valid`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub learner_id: String,
    pub learner_name: String,
    pub certificate_type: String,
    /// Wall-clock milliseconds of issuance.
    pub issue_date: i64,
    /// Per-game scores at the passing attempt.
    pub scores: HashMap<GameKind, f64>,
    pub verification_code: String,
    /// 16 uppercase hex characters binding learner, code, and issue date.
    pub digital_signature: String,
    pub is_valid: bool,
}

impl Certificate {
    /// Recompute the signature from the certificate's own fields and compare.
    #[must_use]
    pub fn signature_matches(&self) -> bool {
        digital_signature(&self.learner_id, &self.verification_code, self.issue_date)
            == self.digital_signature
    }
}

/// Derive the public verification code for a learner at an issue time.
///
/// Base36 of the timestamp and of the rolling hash of `"{learner}-{now}"`,
/// joined under the `UWA-` prefix and truncated to at most 20 characters.
#[must_use]
pub fn verification_code(learner_id: &str, now: i64) -> String {
    let hash = legacy_hash(&format!("{learner_id}-{now}"));
    let timestamp = u64::try_from(now).unwrap_or(0);
    let mut code = format!(
        "{CODE_PREFIX}{}-{}",
        to_base36(timestamp),
        to_base36(u64::from(hash.unsigned_abs()))
    );
    code.truncate(CODE_MAX_LEN);
    code
}

/// Derive the integrity checksum for a certificate.
#[must_use]
pub fn digital_signature(learner_id: &str, code: &str, issue_date: i64) -> String {
    let hash = legacy_hash(&format!("{learner_id}:{code}:{issue_date}:UWAC"));
    format!("{:0width$X}", hash.unsigned_abs(), width = SIGNATURE_LEN)
}

/// Mint a certificate for a passing attempt.
///
/// The caller is responsible for only issuing on a passing verdict; issuance
/// does not re-validate the scores.
#[must_use]
pub fn issue(
    learner_id: &str,
    learner_name: &str,
    scores: &HashMap<GameKind, f64>,
    now: i64,
) -> Certificate {
    let code = verification_code(learner_id, now);
    let signature = digital_signature(learner_id, &code, now);
    log::debug!("issued certificate {code} for learner {learner_id}");
    Certificate {
        learner_id: learner_id.to_string(),
        learner_name: learner_name.to_string(),
        certificate_type: CERTIFICATE_TYPE.to_string(),
        issue_date: now,
        scores: scores.clone(),
        verification_code: code,
        digital_signature: signature,
        is_valid: true,
    }
}

/// Outcome of looking up a verification code. "Not found" and "found but
/// revoked" are distinct non-error results.
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationOutcome {
    /// Certificate exists and has not been revoked.
    Valid(Certificate),
    /// Certificate exists but was revoked.
    Revoked(Certificate),
    /// No certificate carries this code.
    NotFound,
}

impl VerificationOutcome {
    /// Classify a store lookup result.
    #[must_use]
    pub fn from_lookup(found: Option<Certificate>) -> Self {
        match found {
            Some(cert) if cert.is_valid => Self::Valid(cert),
            Some(cert) => Self::Revoked(cert),
            None => Self::NotFound,
        }
    }

    /// The scores payload, when the code resolved to a certificate.
    #[must_use]
    pub fn scores(&self) -> Option<&HashMap<GameKind, f64>> {
        match self {
            Self::Valid(cert) | Self::Revoked(cert) => Some(&cert.scores),
            Self::NotFound => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000_000;

    fn scores() -> HashMap<GameKind, f64> {
        HashMap::from([
            (GameKind::ArtifactIdentification, 90.0),
            (GameKind::Excavation, 85.0),
        ])
    }

    #[test]
    fn user1_code_stable() {
        assert_eq!(verification_code("user1", NOW), "UWA-LOYW3V28-1Z324J");
    }

    #[test]
    fn user1_signature_stable() {
        let cert = issue("user1", "Jordan", &scores(), NOW);
        assert_eq!(cert.digital_signature, "00000000511B6051");
        assert!(cert.signature_matches());
    }

    #[test]
    fn negative_hash_keeps_magnitude() {
        // "kai-reef-07" at this timestamp hashes negative; the code uses the
        // absolute value, exactly like issued certificates do.
        assert_eq!(
            verification_code("kai-reef-07", 1_722_470_400_123),
            "UWA-LZAIEIRF-UYB3WI"
        );
        assert_eq!(
            digital_signature("kai-reef-07", "UWA-LZAIEIRF-UYB3WI", 1_722_470_400_123),
            "0000000077C9112F"
        );
    }

    #[test]
    fn different_learners_same_timestamp_differ() {
        let first = verification_code("user1", NOW);
        let second = verification_code("user2", NOW);
        assert_ne!(first, second);
        assert_eq!(second, "UWA-LOYW3V28-QWN4JO");
    }

    #[test]
    fn code_shape_holds() {
        let code = verification_code("a-very-long-learner-identifier", NOW);
        assert!(code.starts_with(CODE_PREFIX));
        assert!(code.len() <= CODE_MAX_LEN);
        assert!(
            code.chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-')
        );
    }

    #[test]
    fn signature_is_sixteen_upper_hex() {
        let cert = issue("user2", "Sam", &scores(), NOW);
        assert_eq!(cert.digital_signature.len(), SIGNATURE_LEN);
        assert!(
            cert.digital_signature
                .chars()
                .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase())
        );
    }

    #[test]
    fn issue_fills_fixed_fields() {
        let cert = issue("user1", "Jordan", &scores(), NOW);
        assert_eq!(cert.certificate_type, CERTIFICATE_TYPE);
        assert_eq!(cert.issue_date, NOW);
        assert!(cert.is_valid);
        assert_eq!(cert.scores, scores());
    }

    #[test]
    fn lookup_outcomes_are_distinct() {
        let mut cert = issue("user1", "Jordan", &scores(), NOW);
        assert!(matches!(
            VerificationOutcome::from_lookup(Some(cert.clone())),
            VerificationOutcome::Valid(_)
        ));
        cert.is_valid = false;
        let revoked = VerificationOutcome::from_lookup(Some(cert));
        assert!(matches!(revoked, VerificationOutcome::Revoked(_)));
        assert!(revoked.scores().is_some(), "revoked still exposes scores");
        assert_eq!(
            VerificationOutcome::from_lookup(None),
            VerificationOutcome::NotFound
        );
    }

    #[test]
    fn certificate_serializes_with_client_field_names() {
        let cert = issue("user1", "Jordan", &scores(), NOW);
        let json = serde_json::to_value(&cert).expect("serialize");
        assert!(json.get("verificationCode").is_some());
        assert!(json.get("digitalSignature").is_some());
        assert!(json.get("isValid").is_some());
    }
}
