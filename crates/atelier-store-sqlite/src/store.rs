//! [`SqliteStore`], the SQLite implementation of [`DecisionStore`].

use std::path::Path;

use rusqlite::OptionalExtension as _;

use atelier_core::{
  decision::Decision,
  store::{Appended, DecisionQuery, DecisionStore},
};

use crate::{
  Error, Result,
  encode::{DECISION_COLUMNS, RawDecision, decode_dt, encode_decision},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An append-only decision log backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Number of stored decisions.
  pub async fn count(&self) -> Result<u64> {
    let n: i64 = self
      .conn
      .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM decisions", [], |r| r.get(0))?))
      .await?;
    Ok(u64::try_from(n).unwrap_or(0))
  }
}

// ─── DecisionStore impl ──────────────────────────────────────────────────────

impl DecisionStore for SqliteStore {
  type Error = Error;

  async fn append(&self, decision: &Decision) -> Result<Appended> {
    let row = encode_decision(decision)?;

    // Insert-or-read happens in one transaction on the connection thread, so
    // two writers racing on the same id see exactly one `Written`.
    let existing: Option<String> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let inserted = tx.execute(
          "INSERT INTO decisions (
             decision_id, request_id, recorded_at, ok, artist_id, digest, payload_json
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
           ON CONFLICT(decision_id) DO NOTHING",
          rusqlite::params![
            row.decision_id,
            row.request_id,
            row.recorded_at,
            row.ok,
            row.artist_id,
            row.digest,
            row.payload_json,
          ],
        )?;

        let existing = if inserted == 0 {
          Some(tx.query_row(
            "SELECT recorded_at FROM decisions WHERE decision_id = ?1",
            rusqlite::params![row.decision_id],
            |r| r.get(0),
          )?)
        } else {
          None
        };
        tx.commit()?;
        Ok(existing)
      })
      .await?;

    match existing {
      None => Ok(Appended::Written),
      Some(at) => Ok(Appended::Duplicate { recorded_at: decode_dt(&at)? }),
    }
  }

  async fn get(&self, decision_id: &str) -> Result<Option<Decision>> {
    let id = decision_id.to_owned();

    let raw: Option<RawDecision> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {DECISION_COLUMNS} FROM decisions WHERE decision_id = ?1"),
              rusqlite::params![id],
              RawDecision::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawDecision::into_decision).transpose()
  }

  async fn list(&self, query: &DecisionQuery) -> Result<Vec<Decision>> {
    let request_id = query.request_id.clone();
    // SQLite treats a negative LIMIT as "no limit".
    let limit = query.limit.and_then(|n| i64::try_from(n).ok()).unwrap_or(-1);

    let raws: Vec<RawDecision> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {DECISION_COLUMNS} FROM decisions
           WHERE (?1 IS NULL OR request_id = ?1)
           ORDER BY seq
           LIMIT ?2"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![request_id, limit], RawDecision::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDecision::into_decision).collect()
  }
}
