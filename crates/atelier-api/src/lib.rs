//! JSON HTTP API for the Atelier decision engine.
//!
//! Exposes an axum [`Router`] backed by an [`Engine`] over any
//! [`atelier_core::store::DecisionStore`]. TLS and auth are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = atelier_api::api_router(Arc::new(engine));
//! axum::serve(listener, app).await?;
//! ```

pub mod decisions;
pub mod error;
pub mod resources;
pub mod tools;

use std::sync::Arc;

use atelier_core::{engine::Engine, store::DecisionStore};
use axum::{
  Router,
  routing::{get, post},
};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Build the API router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(engine: Arc<Engine<S>>) -> Router<()>
where
  S: DecisionStore + 'static,
{
  Router::new()
    // Stage operations
    .route("/tools/validate_preset", post(tools::validate_preset::<S>))
    .route("/tools/plan_steps", post(tools::plan_steps::<S>))
    .route("/tools/assign_artist", post(tools::assign_artist::<S>))
    .route("/tools/record_decision", post(tools::record_decision::<S>))
    .route("/requests/{id}/process", post(tools::process::<S>))
    // Read-only dataset
    .route("/resources/requests", get(resources::requests::<S>))
    .route("/resources/artists", get(resources::artists::<S>))
    .route("/resources/presets", get(resources::presets::<S>))
    .route("/resources/rules", get(resources::rules::<S>))
    // Decision log
    .route("/decisions", get(decisions::list::<S>))
    .route("/decisions/{id}", get(decisions::get_one::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(engine)
}

#[cfg(test)]
mod tests;
