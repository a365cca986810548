//! Decision records: the append-only audit entries, one per processed
//! request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use strum::{Display, EnumString};

use crate::{
  Error, Result,
  assign::Assignment,
  plan::MatchedRule,
  validate::Validation,
};

/// Timestamp granularity of the decision id bucket.
pub const DECISION_ID_TIME_FORMAT: &str = "%Y%m%d%H%M%S";

/// `dec-<request_id>-<YYYYMMDDHHMMSS>`. Two calls for the same request within
/// the same second agree.
pub fn decision_id(request_id: &str, at: DateTime<Utc>) -> String {
  format!("dec-{request_id}-{}", at.format(DECISION_ID_TIME_FORMAT))
}

// ─── Trace ───────────────────────────────────────────────────────────────────

/// A pipeline stage, named as the operation the transport exposes.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Stage {
  ValidatePreset,
  PlanSteps,
  AssignArtist,
  RecordDecision,
}

/// One stage invocation, in pipeline order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
  pub stage:     Stage,
  pub input:     serde_json::Value,
  pub output:    serde_json::Value,
  pub timestamp: DateTime<Utc>,
}

// ─── Decision ────────────────────────────────────────────────────────────────

/// The durable record. Never mutated once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
  pub decision_id:   String,
  pub request_id:    String,
  pub recorded_at:   DateTime<Utc>,
  pub validation:    Validation,
  /// Empty when validation failed.
  pub steps:         Vec<String>,
  pub matched_rules: Vec<MatchedRule>,
  pub queue:         Option<String>,
  /// `None` when validation failed and the resolver never ran.
  pub assignment:    Option<Assignment>,
  pub trace:         Vec<TraceEntry>,
  /// Hex SHA-256 over the canonical JSON of every other field.
  #[serde(default)]
  pub digest:        String,
}

/// Borrowed view of a [`Decision`] without its digest; the hashed form.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Canonical<'a> {
  decision_id:   &'a str,
  request_id:    &'a str,
  recorded_at:   &'a DateTime<Utc>,
  validation:    &'a Validation,
  steps:         &'a [String],
  matched_rules: &'a [MatchedRule],
  queue:         &'a Option<String>,
  assignment:    &'a Option<Assignment>,
  trace:         &'a [TraceEntry],
}

impl Decision {
  /// The artist id, if one was assigned.
  pub fn artist_id(&self) -> Option<&str> {
    self.assignment.as_ref().and_then(|a| a.artist_id.as_deref())
  }

  pub fn compute_digest(&self) -> Result<String> {
    let canonical = Canonical {
      decision_id:   &self.decision_id,
      request_id:    &self.request_id,
      recorded_at:   &self.recorded_at,
      validation:    &self.validation,
      steps:         &self.steps,
      matched_rules: &self.matched_rules,
      queue:         &self.queue,
      assignment:    &self.assignment,
      trace:         &self.trace,
    };
    let bytes = serde_json::to_vec(&canonical)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
  }

  /// Fill in `digest`. Called once, right before the first append.
  pub fn seal(mut self) -> Result<Self> {
    self.digest = self.compute_digest()?;
    Ok(self)
  }

  /// Check a record read back from storage.
  pub fn verify(&self) -> Result<()> {
    if self.compute_digest()? == self.digest {
      Ok(())
    } else {
      Err(Error::DigestMismatch(self.decision_id.clone()))
    }
  }
}

/// What the recorder reports back to its caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordReceipt {
  pub decision_id: String,
  pub recorded_at: DateTime<Utc>,
  pub success:     bool,
  /// A record with the same id was already stored; nothing was written.
  pub duplicate:   bool,
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn at(h: u32, m: u32, s: u32, ms: u32) -> DateTime<Utc> {
    Utc
      .with_ymd_and_hms(2026, 3, 14, h, m, s)
      .unwrap()
      .checked_add_signed(chrono::Duration::milliseconds(ms.into()))
      .unwrap()
  }

  fn sample() -> Decision {
    let recorded_at = at(9, 30, 0, 0);
    Decision {
      decision_id: decision_id("req-002", recorded_at),
      request_id: "req-002".into(),
      recorded_at,
      validation: Validation {
        ok:     false,
        errors: vec!["Missing required texture channel: 'a'".into()],
      },
      steps: vec![],
      matched_rules: vec![],
      queue: None,
      assignment: None,
      trace: vec![],
      digest: String::new(),
    }
  }

  #[test]
  fn id_has_fixed_shape() {
    assert_eq!(decision_id("req-001", at(9, 5, 7, 0)), "dec-req-001-20260314090507");
  }

  #[test]
  fn id_is_stable_within_a_second() {
    assert_eq!(decision_id("req-001", at(9, 5, 7, 10)), decision_id("req-001", at(9, 5, 7, 990)));
    assert_ne!(decision_id("req-001", at(9, 5, 7, 990)), decision_id("req-001", at(9, 5, 8, 0)));
  }

  #[test]
  fn sealed_record_verifies() {
    let d = sample().seal().unwrap();
    assert_eq!(d.digest.len(), 64);
    d.verify().unwrap();
  }

  #[test]
  fn tampering_breaks_the_digest() {
    let mut d = sample().seal().unwrap();
    d.validation.ok = true;
    assert!(matches!(d.verify(), Err(Error::DigestMismatch(_))));
  }

  #[test]
  fn float_in_trace_survives_a_json_round_trip() {
    let mut d = sample();
    d.trace.push(TraceEntry {
      stage:     Stage::PlanSteps,
      input:     serde_json::json!({ "requestId": "req-002" }),
      output:    serde_json::json!({ "score": 1.0715660391465826e-75 }),
      timestamp: at(9, 30, 0, 0),
    });
    let sealed = d.seal().unwrap();

    let stored = serde_json::to_string(&sealed).unwrap();
    let read_back: Decision = serde_json::from_str(&stored).unwrap();
    assert_eq!(read_back, sealed);
    read_back.verify().unwrap();
  }

  #[test]
  fn failed_validation_serializes_null_assignment() {
    let json = serde_json::to_value(sample()).unwrap();
    assert_eq!(json["assignment"], serde_json::Value::Null);
    assert_eq!(json["steps"], serde_json::json!([]));
    assert_eq!(json["decisionId"], "dec-req-002-20260314093000");
  }
}
