//! Error types for `atelier-core`.
//!
//! Only structural faults live here. Expected domain outcomes (a failed
//! validation, a request no rule matches, a request nobody can take) are
//! ordinary result values of the stage that produced them.

use std::path::PathBuf;

use thiserror::Error;

/// Malformed or missing reference data. Fatal for the run.
#[derive(Debug, Error)]
pub enum DataLoadError {
  #[error("failed to read {path}: {source}")]
  Io {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse {path}: {source}")]
  Parse {
    path:   PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("duplicate request id: {0}")]
  DuplicateRequest(String),

  #[error("duplicate artist id: {0}")]
  DuplicateArtist(String),

  #[error("artist {artist} has capacity_used {used} above capacity_max {max}")]
  CapacityExceeded { artist: String, used: u32, max: u32 },

  #[error("artist {artist} has no skills")]
  NoSkills { artist: String },

  #[error("preset for {account} declares unknown channel {channel:?}")]
  UnknownChannel { account: String, channel: String },

  #[error("preset for {account} declares an empty naming pattern")]
  EmptyNamingPattern { account: String },

  #[error("preset for {account} has a malformed naming pattern: {reason}")]
  MalformedNamingPattern { account: String, reason: String },

  #[error("rule {rule} references unknown attribute {attribute:?}")]
  UnknownRuleAttribute { rule: usize, attribute: String },

  #[error("rule {rule} compares {attribute:?} against a value of the wrong kind")]
  RuleValueMismatch { rule: usize, attribute: String },
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("data load error: {0}")]
  DataLoad(#[from] DataLoadError),

  #[error("request not found: {0}")]
  RequestNotFound(String),

  /// The decision sink failed. Never retried: a lost audit record is worse
  /// than a stopped run.
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("digest mismatch for decision {0}")]
  DigestMismatch(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
