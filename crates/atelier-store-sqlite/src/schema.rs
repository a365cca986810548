//! SQL schema for the Atelier decision store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Decisions are strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS decisions (
    seq          INTEGER PRIMARY KEY AUTOINCREMENT,
    decision_id  TEXT NOT NULL UNIQUE,  -- dec-<request_id>-<YYYYMMDDHHMMSS>
    request_id   TEXT NOT NULL,
    recorded_at  TEXT NOT NULL,         -- RFC 3339 UTC
    ok           INTEGER NOT NULL,      -- validation outcome, 0 | 1
    artist_id    TEXT,                  -- NULL when nobody was assigned
    digest       TEXT NOT NULL,         -- hex SHA-256 of the canonical record
    payload_json TEXT NOT NULL          -- the full Decision
);

CREATE INDEX IF NOT EXISTS decisions_request_idx ON decisions(request_id);

PRAGMA user_version = 1;
";
