//! Versioned schema migrations keyed on `PRAGMA user_version`.

use crate::error::Result;
use rusqlite::Connection;

/// One entry per schema version; entry `i` brings the database to version
/// `i + 1`. Append new migrations, never edit shipped ones.
const MIGRATIONS: &[&str] = &[V1_SCHEMA];

pub fn run(conn: &mut Connection) -> Result<()> {
    let current: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    for (i, sql) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i64;
        if version > current {
            let tx = conn.transaction()?;
            tx.execute_batch(sql)?;
            tx.pragma_update(None, "user_version", version)?;
            tx.commit()?;
        }
    }
    Ok(())
}

const V1_SCHEMA: &str = r#"
CREATE TABLE leads (
    id                TEXT PRIMARY KEY,
    name              TEXT NOT NULL,
    company           TEXT,
    stage             TEXT,
    stage_rank        INTEGER NOT NULL DEFAULT 0,
    stage_changed_at  TEXT,
    last_contacted_at TEXT,
    assignee          TEXT,
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL
);

CREATE TABLE reminders (
    id         TEXT PRIMARY KEY,
    lead_id    TEXT NOT NULL REFERENCES leads(id),
    assignee   TEXT,
    due_at     TEXT NOT NULL,
    status     TEXT NOT NULL DEFAULT 'pending',
    reason     TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE UNIQUE INDEX reminders_one_pending_per_lead
    ON reminders(lead_id) WHERE status = 'pending';
CREATE INDEX reminders_due ON reminders(status, due_at);

CREATE TABLE activities (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    actor      TEXT NOT NULL,
    action     TEXT NOT NULL,
    lead_id    TEXT NOT NULL,
    metadata   TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX activities_by_lead ON activities(lead_id, created_at);
"#;
