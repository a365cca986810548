//! Core types and the decision engine for the Atelier request triage system.
//!
//! This crate is deliberately free of HTTP and database dependencies. It owns
//! the read-only reference datasets, the four pipeline stages (validate, plan,
//! assign, record) and the [`store::DecisionStore`] abstraction that storage
//! backends implement.

pub mod artist;
pub mod assign;
pub mod clock;
pub mod dataset;
pub mod decision;
pub mod engine;
pub mod error;
pub mod events;
pub mod plan;
pub mod preset;
pub mod record;
pub mod request;
pub mod rule;
pub mod store;
pub mod validate;

pub use error::{DataLoadError, Error, Result};
