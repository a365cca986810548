//! Engine event reporting.
//!
//! The engine never logs through a global; it reports to the [`EventSink`] it
//! was built with. [`TracingSink`] forwards to `tracing`, [`MemorySink`]
//! keeps events for inspection.

use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use crate::decision::Stage;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
  ToolCalled {
    tool:       Stage,
    request_id: String,
  },
  ValidationPassed {
    request_id: String,
  },
  ValidationFailed {
    request_id: String,
    errors:     Vec<String>,
  },
  ToolCompleted {
    tool:        Stage,
    request_id:  String,
    duration_ms: f64,
  },
  DecisionRecorded {
    decision_id: String,
    request_id:  String,
    duplicate:   bool,
  },
}

pub trait EventSink: Send + Sync {
  fn emit(&self, event: EngineEvent);
}

/// Drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
  fn emit(&self, _event: EngineEvent) {}
}

/// Forwards events to `tracing` under the `atelier::engine` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
  fn emit(&self, event: EngineEvent) {
    match event {
      EngineEvent::ToolCalled { tool, request_id } => {
        tracing::debug!(target: "atelier::engine", %tool, %request_id, "tool.called");
      }
      EngineEvent::ValidationPassed { request_id } => {
        tracing::info!(target: "atelier::engine", %request_id, "validation.passed");
      }
      EngineEvent::ValidationFailed { request_id, errors } => {
        tracing::info!(target: "atelier::engine", %request_id, ?errors, "validation.failed");
      }
      EngineEvent::ToolCompleted { tool, request_id, duration_ms } => {
        tracing::debug!(target: "atelier::engine", %tool, %request_id, duration_ms, "tool.completed");
      }
      EngineEvent::DecisionRecorded { decision_id, request_id, duplicate } => {
        tracing::info!(
          target: "atelier::engine",
          %decision_id,
          %request_id,
          duplicate,
          "decision.recorded"
        );
      }
    }
  }
}

/// Collects events in emission order.
#[derive(Debug, Default)]
pub struct MemorySink(Mutex<Vec<EngineEvent>>);

impl MemorySink {
  pub fn events(&self) -> Vec<EngineEvent> {
    self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
  }

  /// Stages that were invoked, in order.
  pub fn tools_called(&self) -> Vec<Stage> {
    self
      .events()
      .iter()
      .filter_map(|e| match e {
        EngineEvent::ToolCalled { tool, .. } => Some(*tool),
        _ => None,
      })
      .collect()
  }
}

impl EventSink for MemorySink {
  fn emit(&self, event: EngineEvent) {
    self.0.lock().unwrap_or_else(PoisonError::into_inner).push(event);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tools_called_lists_only_invocations() {
    let sink = MemorySink::default();
    let request_id = String::from("req-001");
    sink.emit(EngineEvent::ToolCalled {
      tool:       Stage::ValidatePreset,
      request_id: request_id.clone(),
    });
    sink.emit(EngineEvent::ToolCompleted {
      tool:        Stage::ValidatePreset,
      request_id:  request_id.clone(),
      duration_ms: 0.4,
    });
    sink.emit(EngineEvent::ValidationPassed { request_id: request_id.clone() });
    sink.emit(EngineEvent::ToolCalled { tool: Stage::PlanSteps, request_id });

    assert_eq!(sink.tools_called(), vec![Stage::ValidatePreset, Stage::PlanSteps]);
    assert_eq!(sink.events().len(), 4);
  }
}
