//! The Decision Recorder: sole owner of the append path.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::{
  Error, Result,
  assign::Assignment,
  decision::{Decision, RecordReceipt, TraceEntry, decision_id},
  plan::Plan,
  store::{Appended, DecisionQuery, DecisionStore},
  validate::Validation,
};

/// Everything the prior stages produced for one request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionInput {
  pub request_id: String,
  pub validation: Validation,
  #[serde(default)]
  pub plan:       Option<Plan>,
  #[serde(default)]
  pub assignment: Option<Assignment>,
  #[serde(default)]
  pub trace:      Vec<TraceEntry>,
}

/// Build the sealed record for `input` as of `at`. A failed validation always
/// yields an empty step list and no assignment.
pub fn build_decision(input: DecisionInput, at: DateTime<Utc>) -> Result<Decision> {
  let DecisionInput { request_id, validation, plan, assignment, trace } = input;
  let (plan, assignment) = if validation.ok {
    (plan.unwrap_or_default(), assignment)
  } else {
    (Plan::default(), None)
  };

  Decision {
    decision_id: decision_id(&request_id, at),
    request_id,
    recorded_at: at,
    validation,
    steps: plan.steps,
    matched_rules: plan.matched_rules,
    queue: plan.queue,
    assignment,
    trace,
    digest: String::new(),
  }
  .seal()
}

/// Appends decision records to `S` and reads them back.
///
/// The recorder does not re-run or second-guess upstream stages; it trusts
/// the pipeline ordering of its caller.
#[derive(Debug)]
pub struct Recorder<S> {
  store: S,
}

impl<S: DecisionStore> Recorder<S> {
  pub fn new(store: S) -> Self { Self { store } }

  /// Append the decision for `input`. Storage failures are returned as
  /// [`Error::Store`] and never retried.
  pub async fn record(&self, input: DecisionInput, at: DateTime<Utc>) -> Result<RecordReceipt> {
    let decision = build_decision(input, at)?;

    let appended = self
      .store
      .append(&decision)
      .await
      .map_err(|e| Error::Store(Box::new(e)))?;

    let (recorded_at, duplicate) = match appended {
      Appended::Written => (decision.recorded_at, false),
      Appended::Duplicate { recorded_at } => (recorded_at, true),
    };

    Ok(RecordReceipt {
      decision_id: decision.decision_id,
      recorded_at,
      success: true,
      duplicate,
    })
  }

  /// Read one decision back, verifying its digest.
  pub async fn get(&self, decision_id: &str) -> Result<Option<Decision>> {
    let decision = self
      .store
      .get(decision_id)
      .await
      .map_err(|e| Error::Store(Box::new(e)))?;
    if let Some(d) = &decision {
      d.verify()?;
    }
    Ok(decision)
  }

  /// Read decisions back in append order, verifying every digest.
  pub async fn list(&self, query: &DecisionQuery) -> Result<Vec<Decision>> {
    let decisions = self.store.list(query).await.map_err(|e| Error::Store(Box::new(e)))?;
    for d in &decisions {
      d.verify()?;
    }
    Ok(decisions)
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;
  use crate::assign::AssignmentStatus;

  fn input(ok: bool) -> DecisionInput {
    DecisionInput {
      request_id: "req-x".into(),
      validation: Validation {
        ok,
        errors: if ok { vec![] } else { vec!["Invalid naming configuration".into()] },
      },
      plan:       Some(Plan {
        steps:         vec!["qa".into()],
        matched_rules: vec![],
        queue:         None,
      }),
      assignment: Some(Assignment {
        artist_id:   Some("a-1".into()),
        artist_name: Some("Ada".into()),
        reason:      "Ada has required skills [] and capacity (0/1)".into(),
        status:      AssignmentStatus::Assigned,
      }),
      trace:      vec![],
    }
  }

  #[test]
  fn failed_validation_drops_plan_and_assignment() {
    let at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
    let d = build_decision(input(false), at).unwrap();

    assert!(d.steps.is_empty());
    assert!(d.assignment.is_none());
    assert_eq!(d.validation.errors, vec!["Invalid naming configuration".to_owned()]);
    assert_eq!(d.decision_id, "dec-req-x-20260102030405");
    d.verify().unwrap();
  }

  #[test]
  fn passed_validation_keeps_stage_outputs() {
    let at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
    let d = build_decision(input(true), at).unwrap();

    assert_eq!(d.steps, vec!["qa".to_owned()]);
    assert_eq!(d.artist_id(), Some("a-1"));
  }

  #[test]
  fn input_accepts_camel_case_json() {
    let input: DecisionInput = serde_json::from_str(
      r#"{"requestId":"req-1","validation":{"ok":false,"errors":["x"]}}"#,
    )
    .unwrap();
    assert_eq!(input.request_id, "req-1");
    assert!(input.plan.is_none());
    assert!(input.trace.is_empty());
  }
}
