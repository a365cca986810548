//! Handlers for the stage operations.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/tools/validate_preset` | Body: `{"requestId":"req-001"}` |
//! | `POST` | `/tools/plan_steps` | Same body |
//! | `POST` | `/tools/assign_artist` | Same body |
//! | `POST` | `/tools/record_decision` | Body: a `DecisionInput`; 201 when written, 200 on duplicate |
//! | `POST` | `/requests/:id/process` | Full pipeline, one decision recorded |
//!
//! Unknown request ids answer 404; malformed bodies answer 400.

use std::sync::Arc;

use atelier_core::{
  assign::Assignment,
  decision::RecordReceipt,
  engine::{Engine, Outcome},
  plan::Plan,
  record::DecisionInput,
  store::DecisionStore,
  validate::Validation,
};
use axum::{
  Json,
  extract::{Path, State, rejection::JsonRejection},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestRef {
  pub request_id: String,
}

impl RequestRef {
  fn id(&self) -> Result<&str, ApiError> {
    if self.request_id.trim().is_empty() {
      return Err(ApiError::BadRequest("requestId must not be empty".into()));
    }
    Ok(&self.request_id)
  }
}

/// `POST /tools/validate_preset`
pub async fn validate_preset<S: DecisionStore>(
  State(engine): State<Arc<Engine<S>>>,
  body: Result<Json<RequestRef>, JsonRejection>,
) -> Result<Json<Validation>, ApiError> {
  let Json(body) = body?;
  Ok(Json(engine.validate(body.id()?)?))
}

/// `POST /tools/plan_steps`
pub async fn plan_steps<S: DecisionStore>(
  State(engine): State<Arc<Engine<S>>>,
  body: Result<Json<RequestRef>, JsonRejection>,
) -> Result<Json<Plan>, ApiError> {
  let Json(body) = body?;
  Ok(Json(engine.plan(body.id()?)?))
}

/// `POST /tools/assign_artist`
pub async fn assign_artist<S: DecisionStore>(
  State(engine): State<Arc<Engine<S>>>,
  body: Result<Json<RequestRef>, JsonRejection>,
) -> Result<Json<Assignment>, ApiError> {
  let Json(body) = body?;
  Ok(Json(engine.assign(body.id()?)?))
}

/// `POST /tools/record_decision`
pub async fn record_decision<S: DecisionStore>(
  State(engine): State<Arc<Engine<S>>>,
  input: Result<Json<DecisionInput>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
  let Json(input) = input?;
  let receipt: RecordReceipt = engine.record(input).await?;
  let status = if receipt.duplicate { StatusCode::OK } else { StatusCode::CREATED };
  Ok((status, Json(receipt)))
}

/// `POST /requests/:id/process`
pub async fn process<S: DecisionStore>(
  State(engine): State<Arc<Engine<S>>>,
  Path(id): Path<String>,
) -> Result<Json<Outcome>, ApiError> {
  Ok(Json(engine.process(&id).await?))
}
