//! SQL schema for the custody SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Upserted on every interaction; rows are never deleted.
CREATE TABLE IF NOT EXISTS users (
    user_id     INTEGER PRIMARY KEY,   -- external chat-transport id
    handle      TEXT,
    given_name  TEXT,
    family_name TEXT,
    created_at  TEXT NOT NULL          -- ISO 8601 UTC; assigned by the store
);

CREATE TABLE IF NOT EXISTS items (
    item_id     INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL UNIQUE,  -- case-sensitive uniqueness
    description TEXT,
    owner_id    INTEGER REFERENCES users(user_id),
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS requests (
    request_id   INTEGER PRIMARY KEY AUTOINCREMENT,
    item_id      INTEGER NOT NULL REFERENCES items(item_id),
    requester_id INTEGER NOT NULL REFERENCES users(user_id),
    owner_id     INTEGER NOT NULL REFERENCES users(user_id),  -- snapshot at creation
    status       TEXT NOT NULL DEFAULT 'pending',  -- 'pending' | 'accepted' | 'rejected'
    message      TEXT,
    created_at   TEXT NOT NULL,
    resolved_at  TEXT                  -- NULL until the request leaves 'pending'
);

-- The audit trail. Strictly append-only:
-- no UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS transactions (
    transaction_id INTEGER PRIMARY KEY AUTOINCREMENT,
    item_id        INTEGER NOT NULL REFERENCES items(item_id),
    from_user_id   INTEGER REFERENCES users(user_id),  -- NULL for initial assignment
    to_user_id     INTEGER NOT NULL REFERENCES users(user_id),
    kind           TEXT NOT NULL,      -- 'initial_assignment' | 'transfer'
    created_at     TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS items_owner_idx        ON items(owner_id);
CREATE INDEX IF NOT EXISTS requests_owner_idx     ON requests(owner_id, status);
CREATE INDEX IF NOT EXISTS requests_requester_idx ON requests(requester_id);
CREATE INDEX IF NOT EXISTS transactions_item_idx  ON transactions(item_id);

PRAGMA user_version = 1;
";
