//! Encoding and decoding helpers between decision records and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings. The record itself lives in
//! `payload_json`; the other columns exist for indexing and are checked
//! against the payload on the way out.

use atelier_core::decision::Decision;
use chrono::{DateTime, SecondsFormat, Utc};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Decision rows ───────────────────────────────────────────────────────────

/// Column values for one `INSERT INTO decisions`.
pub struct EncodedDecision {
  pub decision_id:  String,
  pub request_id:   String,
  pub recorded_at:  String,
  pub ok:           bool,
  pub artist_id:    Option<String>,
  pub digest:       String,
  pub payload_json: String,
}

pub fn encode_decision(d: &Decision) -> Result<EncodedDecision> {
  Ok(EncodedDecision {
    decision_id:  d.decision_id.clone(),
    request_id:   d.request_id.clone(),
    recorded_at:  encode_dt(d.recorded_at),
    ok:           d.validation.ok,
    artist_id:    d.artist_id().map(str::to_owned),
    digest:       d.digest.clone(),
    payload_json: serde_json::to_string(d)?,
  })
}

/// Raw strings read from a `decisions` row.
pub struct RawDecision {
  pub decision_id:  String,
  pub recorded_at:  String,
  pub digest:       String,
  pub payload_json: String,
}

pub const DECISION_COLUMNS: &str = "decision_id, recorded_at, digest, payload_json";

impl RawDecision {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      decision_id:  row.get(0)?,
      recorded_at:  row.get(1)?,
      digest:       row.get(2)?,
      payload_json: row.get(3)?,
    })
  }

  pub fn into_decision(self) -> Result<Decision> {
    let decision: Decision = serde_json::from_str(&self.payload_json)?;
    let recorded_at = decode_dt(&self.recorded_at)?;

    if decision.decision_id != self.decision_id
      || decision.recorded_at != recorded_at
      || decision.digest != self.digest
    {
      return Err(Error::CorruptRow(self.decision_id));
    }
    Ok(decision)
  }
}
