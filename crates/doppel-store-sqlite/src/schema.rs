//! SQL schema for the Doppel SQLite store.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per dedup record, keyed by '{low}-{high}-{flag}'.
CREATE TABLE IF NOT EXISTS dedup_records (
    unique_id     TEXT PRIMARY KEY,
    resource_id   TEXT NOT NULL,      -- '{low}-{high}'
    low_id        INTEGER NOT NULL,
    high_id       INTEGER NOT NULL,
    resource_type INTEGER NOT NULL,
    flag          TEXT NOT NULL,
    note          TEXT,
    withdrawn     INTEGER NOT NULL DEFAULT 0,
    extra         TEXT NOT NULL DEFAULT '{}',  -- JSON object of plugin fields
    last_indexed  TEXT NOT NULL,
    CHECK (low_id <= high_id)
);

-- Signature values of a record, in insertion order per field.
CREATE TABLE IF NOT EXISTS dedup_signatures (
    unique_id TEXT NOT NULL REFERENCES dedup_records(unique_id) ON DELETE CASCADE,
    field     TEXT NOT NULL,
    position  INTEGER NOT NULL,
    value     TEXT NOT NULL,
    PRIMARY KEY (unique_id, field, position)
);

-- Human decisions; never touched by index maintenance.
CREATE TABLE IF NOT EXISTS dedup_reject (
    first_item_id      INTEGER NOT NULL,
    second_item_id     INTEGER NOT NULL,
    resource_type_id   INTEGER NOT NULL,
    submitter_decision TEXT,
    workflow_decision  TEXT,
    admin_decision     TEXT,
    note               TEXT,
    reader_note        TEXT,
    fake               INTEGER NOT NULL DEFAULT 0,
    tofix              INTEGER NOT NULL DEFAULT 0,
    updated_at         TEXT NOT NULL,
    PRIMARY KEY (first_item_id, second_item_id, resource_type_id),
    CHECK (first_item_id <= second_item_id)
);

CREATE TABLE IF NOT EXISTS resources (
    resource_id   INTEGER NOT NULL,
    resource_type INTEGER NOT NULL,
    withdrawn     INTEGER NOT NULL DEFAULT 0,
    last_modified TEXT,
    metadata      TEXT NOT NULL DEFAULT '{}',  -- JSON object of value lists
    locations     TEXT NOT NULL DEFAULT '[]',
    PRIMARY KEY (resource_id, resource_type)
);

CREATE INDEX IF NOT EXISTS dedup_records_type_flag_idx ON dedup_records(resource_type, flag);
CREATE INDEX IF NOT EXISTS dedup_records_low_idx       ON dedup_records(low_id);
CREATE INDEX IF NOT EXISTS dedup_records_high_idx      ON dedup_records(high_id);
CREATE INDEX IF NOT EXISTS dedup_signatures_value_idx  ON dedup_signatures(field, value);
CREATE INDEX IF NOT EXISTS dedup_reject_second_idx     ON dedup_reject(second_item_id);

PRAGMA user_version = 1;
";
