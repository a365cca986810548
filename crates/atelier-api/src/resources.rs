//! Read-only views of the loaded dataset.

use std::{collections::BTreeMap, sync::Arc};

use atelier_core::{
  artist::Artist, engine::Engine, preset::Preset, request::Request, rule::Rule,
  store::DecisionStore,
};
use axum::{Json, extract::State};

/// `GET /resources/requests`, in id order.
pub async fn requests<S: DecisionStore>(
  State(engine): State<Arc<Engine<S>>>,
) -> Json<Vec<Request>> {
  Json(engine.dataset().requests_all().cloned().collect())
}

/// `GET /resources/artists`, in file order.
pub async fn artists<S: DecisionStore>(State(engine): State<Arc<Engine<S>>>) -> Json<Vec<Artist>> {
  Json(engine.dataset().artists_all().to_vec())
}

/// `GET /resources/presets`, keyed by account.
pub async fn presets<S: DecisionStore>(
  State(engine): State<Arc<Engine<S>>>,
) -> Json<BTreeMap<String, Preset>> {
  Json(engine.dataset().presets_all().clone())
}

/// `GET /resources/rules`, in evaluation order.
pub async fn rules<S: DecisionStore>(State(engine): State<Arc<Engine<S>>>) -> Json<Vec<Rule>> {
  Json(engine.dataset().rules_all().to_vec())
}
