//! SQL schema for the Strata SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA busy_timeout = 5000;

-- Version rows are append-only on content. The only UPDATE ever issued
-- flips the terminal fields (is_current, is_deleted, effective_to), once,
-- when a row is superseded or its entity deleted.
CREATE TABLE IF NOT EXISTS dimension (
    surrogate_key  INTEGER PRIMARY KEY,  -- globally unique, never reused
    natural_key    TEXT NOT NULL,
    attributes     TEXT NOT NULL,        -- JSON array of nullable strings
    fingerprint    TEXT NOT NULL,        -- SHA-256 hex over the attributes
    is_current     INTEGER NOT NULL,     -- 0 | 1
    is_deleted     INTEGER NOT NULL,     -- 0 | 1
    effective_from TEXT NOT NULL,        -- ISO 8601 UTC
    effective_to   TEXT NOT NULL         -- ISO 8601 UTC; open-end sentinel while current
);

CREATE INDEX IF NOT EXISTS dimension_natural_idx ON dimension(natural_key);

-- The active slice is what change detection joins against.
CREATE INDEX IF NOT EXISTS dimension_active_idx
    ON dimension(natural_key) WHERE is_current = 1 AND is_deleted = 0;

PRAGMA user_version = 1;
";
