//! The `DecisionStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `atelier-store-sqlite`).
//! The engine and the API depend on this abstraction, not on any concrete
//! backend.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::decision::Decision;

/// Outcome of [`DecisionStore::append`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Appended {
  /// The record was written.
  Written,
  /// A record with the same decision id already exists; the store is
  /// unchanged. Carries the stored record's timestamp.
  Duplicate { recorded_at: DateTime<Utc> },
}

/// Parameters for [`DecisionStore::list`].
#[derive(Debug, Clone, Default)]
pub struct DecisionQuery {
  pub request_id: Option<String>,
  pub limit:      Option<usize>,
}

/// Abstraction over an append-only decision sink.
///
/// Records are never updated or deleted. Implementations serialise concurrent
/// writers so no partial record is ever visible.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait DecisionStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Append a sealed decision atomically. Appending an id that is already
  /// present is not an error and leaves the existing record in place.
  fn append<'a>(
    &'a self,
    decision: &'a Decision,
  ) -> impl Future<Output = Result<Appended, Self::Error>> + Send + 'a;

  /// Fetch one decision by id. Returns `None` if not found.
  fn get<'a>(
    &'a self,
    decision_id: &'a str,
  ) -> impl Future<Output = Result<Option<Decision>, Self::Error>> + Send + 'a;

  /// Decisions in append order, optionally filtered by request.
  fn list<'a>(
    &'a self,
    query: &'a DecisionQuery,
  ) -> impl Future<Output = Result<Vec<Decision>, Self::Error>> + Send + 'a;
}
