//! Handlers for `/decisions` read-back.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/decisions` | Optional `?requestId=&limit=` |
//! | `GET`  | `/decisions/:id` | 404 if not found |
//!
//! Every record is digest-checked before it is returned.

use std::sync::Arc;

use atelier_core::{
  decision::Decision,
  engine::Engine,
  store::{DecisionQuery, DecisionStore},
};
use axum::{
  Json,
  extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
  pub request_id: Option<String>,
  pub limit:      Option<usize>,
}

/// `GET /decisions[?requestId=<id>][&limit=<n>]`
pub async fn list<S: DecisionStore>(
  State(engine): State<Arc<Engine<S>>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Decision>>, ApiError> {
  let query = DecisionQuery { request_id: params.request_id, limit: params.limit };
  Ok(Json(engine.decisions(&query).await?))
}

/// `GET /decisions/:id`
pub async fn get_one<S: DecisionStore>(
  State(engine): State<Arc<Engine<S>>>,
  Path(id): Path<String>,
) -> Result<Json<Decision>, ApiError> {
  let decision = engine
    .decision(&id)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("decision {id} not found")))?;
  Ok(Json(decision))
}
