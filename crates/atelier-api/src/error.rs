//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::JsonRejection,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("engine error: {0}")]
  Engine(#[source] atelier_core::Error),
}

impl From<atelier_core::Error> for ApiError {
  fn from(e: atelier_core::Error) -> Self {
    match e {
      atelier_core::Error::RequestNotFound(id) => {
        ApiError::NotFound(format!("request {id} not found"))
      }
      other => ApiError::Engine(other),
    }
  }
}

impl From<JsonRejection> for ApiError {
  fn from(e: JsonRejection) -> Self { ApiError::BadRequest(e.body_text()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Engine(e) => {
        tracing::error!(error = %e, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
