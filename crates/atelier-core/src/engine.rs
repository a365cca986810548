//! The decision pipeline: validate → plan → assign → record.
//!
//! An [`Engine`] is `Send + Sync`; wrap it in an `Arc` and run as many
//! request pipelines concurrently as needed. The dataset is read-only, the
//! capacity ledger and the store serialise their own writers.

use std::{sync::Arc, time::Instant};

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
  Error, Result,
  assign::{Assignment, CapacityLedger, CapacityMode},
  clock::{Clock, SystemClock},
  dataset::Dataset,
  decision::{Decision, RecordReceipt, Stage, TraceEntry},
  events::{EngineEvent, EventSink, NullSink},
  plan::{self, Plan},
  record::{DecisionInput, Recorder},
  request::Request,
  store::{DecisionQuery, DecisionStore},
  validate::{self, Validation},
};

/// Everything one pipeline run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
  pub request_id: String,
  pub validation: Validation,
  /// `None` when validation failed and planning was skipped.
  pub plan:       Option<Plan>,
  /// `None` when validation failed and assignment was skipped.
  pub assignment: Option<Assignment>,
  pub receipt:    RecordReceipt,
}

pub struct Engine<S> {
  dataset:  Arc<Dataset>,
  capacity: CapacityLedger,
  recorder: Recorder<S>,
  events:   Arc<dyn EventSink>,
  clock:    Arc<dyn Clock>,
}

impl<S: DecisionStore> Engine<S> {
  /// An engine in [`CapacityMode::Soft`] that reports nowhere and reads the
  /// system clock.
  pub fn new(dataset: Arc<Dataset>, store: S) -> Self {
    Self {
      dataset,
      capacity: CapacityLedger::new(CapacityMode::Soft),
      recorder: Recorder::new(store),
      events: Arc::new(NullSink),
      clock: Arc::new(SystemClock),
    }
  }

  pub fn with_capacity_mode(mut self, mode: CapacityMode) -> Self {
    self.capacity = CapacityLedger::new(mode);
    self
  }

  pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
    self.events = events;
    self
  }

  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  pub fn dataset(&self) -> &Dataset { &self.dataset }

  pub fn capacity(&self) -> &CapacityLedger { &self.capacity }

  // ── Stages ────────────────────────────────────────────────────────────────

  fn request(&self, request_id: &str) -> Result<&Request> {
    self
      .dataset
      .request_by_id(request_id)
      .ok_or_else(|| Error::RequestNotFound(request_id.to_owned()))
  }

  /// Run one stage with tool-call events around it.
  fn instrumented<T>(
    &self,
    tool: Stage,
    request_id: &str,
    run: impl FnOnce(&Dataset, &Request) -> T,
  ) -> Result<T> {
    let request = self.request(request_id)?;
    self.events.emit(EngineEvent::ToolCalled { tool, request_id: request_id.to_owned() });

    let started = Instant::now();
    let out = run(&self.dataset, request);

    self.events.emit(EngineEvent::ToolCompleted {
      tool,
      request_id: request_id.to_owned(),
      duration_ms: started.elapsed().as_secs_f64() * 1000.0,
    });
    Ok(out)
  }

  pub fn validate(&self, request_id: &str) -> Result<Validation> {
    let validation = self.instrumented(Stage::ValidatePreset, request_id, validate::validate)?;

    let request_id = request_id.to_owned();
    self.events.emit(if validation.ok {
      EngineEvent::ValidationPassed { request_id }
    } else {
      EngineEvent::ValidationFailed { request_id, errors: validation.errors.clone() }
    });
    Ok(validation)
  }

  pub fn plan(&self, request_id: &str) -> Result<Plan> {
    self.instrumented(Stage::PlanSteps, request_id, plan::plan)
  }

  pub fn assign(&self, request_id: &str) -> Result<Assignment> {
    self.instrumented(Stage::AssignArtist, request_id, |dataset, request| {
      self.capacity.assign(dataset, request)
    })
  }

  /// Record the decision for `input` at the engine clock's current time.
  pub async fn record(&self, input: DecisionInput) -> Result<RecordReceipt> {
    let request_id = input.request_id.clone();
    self.events.emit(EngineEvent::ToolCalled {
      tool:       Stage::RecordDecision,
      request_id: request_id.clone(),
    });
    let started = Instant::now();

    let receipt = self.recorder.record(input, self.clock.now()).await?;

    self.events.emit(EngineEvent::DecisionRecorded {
      decision_id: receipt.decision_id.clone(),
      request_id:  request_id.clone(),
      duplicate:   receipt.duplicate,
    });
    self.events.emit(EngineEvent::ToolCompleted {
      tool: Stage::RecordDecision,
      request_id,
      duration_ms: started.elapsed().as_secs_f64() * 1000.0,
    });
    Ok(receipt)
  }

  // ── Pipeline ──────────────────────────────────────────────────────────────

  fn trace_entry<T: Serialize>(
    &self,
    stage: Stage,
    request_id: &str,
    out: &T,
  ) -> Result<TraceEntry> {
    Ok(TraceEntry {
      stage,
      input: json!({ "requestId": request_id }),
      output: serde_json::to_value(out)?,
      timestamp: self.clock.now(),
    })
  }

  /// Run the whole pipeline for one request and record exactly one decision.
  ///
  /// A failed validation short-circuits: the planner and resolver are not
  /// invoked and the recorded decision carries the validation errors.
  ///
  /// When the record turns out to be a duplicate, any capacity this run
  /// reserved is released and the outcome reports the stored assignment.
  pub async fn process(&self, request_id: &str) -> Result<Outcome> {
    let validation = self.validate(request_id)?;
    let mut trace = vec![self.trace_entry(Stage::ValidatePreset, request_id, &validation)?];

    let (plan, assignment) = if validation.ok {
      let plan = self.plan(request_id)?;
      trace.push(self.trace_entry(Stage::PlanSteps, request_id, &plan)?);
      let assignment = self.assign(request_id)?;
      trace.push(self.trace_entry(Stage::AssignArtist, request_id, &assignment)?);
      (Some(plan), Some(assignment))
    } else {
      (None, None)
    };

    let recorded = self
      .record(DecisionInput {
        request_id: request_id.to_owned(),
        validation: validation.clone(),
        plan: plan.clone(),
        assignment: assignment.clone(),
        trace,
      })
      .await;

    // A reservation only stands if this run's record was written.
    let receipt = match recorded {
      Ok(receipt) => receipt,
      Err(e) => {
        self.release(assignment.as_ref());
        return Err(e);
      }
    };
    let assignment = if receipt.duplicate {
      self.release(assignment.as_ref());
      self.decision(&receipt.decision_id).await?.and_then(|d| d.assignment)
    } else {
      assignment
    };

    Ok(Outcome { request_id: request_id.to_owned(), validation, plan, assignment, receipt })
  }

  fn release(&self, assignment: Option<&Assignment>) {
    if let Some(assignment) = assignment {
      self.capacity.release(assignment);
    }
  }

  // ── Read-back ─────────────────────────────────────────────────────────────

  pub async fn decision(&self, decision_id: &str) -> Result<Option<Decision>> {
    self.recorder.get(decision_id).await
  }

  pub async fn decisions(&self, query: &DecisionQuery) -> Result<Vec<Decision>> {
    self.recorder.list(query).await
  }
}
