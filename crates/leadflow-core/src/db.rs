//! SQLite-backed store for leads, reminders, and the activity log.
//!
//! # Concurrency
//!
//! All access goes through a single connection behind a non-poisoning mutex,
//! and the stage write itself is an IMMEDIATE transaction whose `UPDATE`
//! carries a `stage_rank < :target` guard. Two racing `advance` calls for the
//! same lead therefore cannot regress the stage, and at most one of them
//! observes a successful write for a given target.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use uuid::Uuid;

use crate::error::Result;
use crate::migrations;
use crate::rules::{hooks_for, EntryHook};
use crate::types::{stage_rank, Stage};

// ---------------------------------------------------------------------------
// Db
// ---------------------------------------------------------------------------

pub struct Db {
    conn: Mutex<Connection>,
}

impl Db {
    /// Open or create the database at `path` and run pending migrations.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// In-memory database, used by tests and `leadflow init --dry-run`-style
    /// tooling. Same schema and pragmas as `open`.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        // journal_mode returns a row, so it can't go through pragma_update.
        conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(Duration::from_secs(5))?;
        migrations::run(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub(crate) fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut conn = self.conn.lock();
        f(&mut conn)
    }
}

// ---------------------------------------------------------------------------
// Stage writes
// ---------------------------------------------------------------------------

/// Result of the guarded stage write.
#[derive(Debug, Clone, PartialEq)]
pub enum AdvanceWrite {
    /// No lead with the given id.
    NotFound,
    /// Target is not strictly forward of the current stage; nothing written.
    Rejected { current: Option<Stage> },
    /// Stage persisted; carries what the caller needs for logging and
    /// side-effect dispatch without a second read.
    Advanced {
        from: Option<Stage>,
        name: String,
        assignee: Option<String>,
    },
}

/// Row data returned by the unconditional stage override.
#[derive(Debug, Clone, PartialEq)]
pub struct StageWrite {
    pub previous: Option<Stage>,
    pub name: String,
    pub assignee: Option<String>,
}

impl Db {
    /// Atomically advance a lead's stage if and only if `target` is strictly
    /// forward of the current stage. Entry hooks for the target stage run in
    /// the same transaction.
    pub fn try_advance_stage(
        &self,
        id: Uuid,
        target: Stage,
        now: DateTime<Utc>,
    ) -> Result<AdvanceWrite> {
        self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let row = tx
                .query_row(
                    "SELECT stage, name, assignee FROM leads WHERE id = ?1",
                    params![id.to_string()],
                    |r| {
                        Ok((
                            r.get::<_, Option<String>>(0)?,
                            r.get::<_, String>(1)?,
                            r.get::<_, Option<String>>(2)?,
                        ))
                    },
                )
                .optional()?;
            let Some((stage_str, name, assignee)) = row else {
                return Ok(AdvanceWrite::NotFound);
            };

            let from = stage_str.as_deref().map(str::parse::<Stage>).transpose()?;
            let target_rank = stage_rank(Some(target));
            if target_rank <= stage_rank(from) {
                return Ok(AdvanceWrite::Rejected { current: from });
            }

            // Conditional guard in the UPDATE itself, on top of the
            // transaction: the write can only ever move the rank up.
            let changed = tx.execute(
                "UPDATE leads SET stage = ?1, stage_rank = ?2, stage_changed_at = ?3, updated_at = ?3 \
                 WHERE id = ?4 AND stage_rank < ?2",
                params![target.as_str(), target_rank, now, id.to_string()],
            )?;
            if changed == 0 {
                return Ok(AdvanceWrite::Rejected { current: from });
            }

            apply_entry_hooks(&tx, target, id, now)?;
            tx.commit()?;
            Ok(AdvanceWrite::Advanced {
                from,
                name,
                assignee,
            })
        })
    }

    /// Manual stage override: always applies, no forward-only guard. This is
    /// the interactive correction path; the automatic path is
    /// [`Db::try_advance_stage`].
    pub fn set_stage(&self, id: Uuid, target: Stage, now: DateTime<Utc>) -> Result<StageWrite> {
        self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let row = tx
                .query_row(
                    "SELECT stage, name, assignee FROM leads WHERE id = ?1",
                    params![id.to_string()],
                    |r| {
                        Ok((
                            r.get::<_, Option<String>>(0)?,
                            r.get::<_, String>(1)?,
                            r.get::<_, Option<String>>(2)?,
                        ))
                    },
                )
                .optional()?;
            let Some((stage_str, name, assignee)) = row else {
                return Err(crate::error::LeadflowError::LeadNotFound(id));
            };
            let previous = stage_str.as_deref().map(str::parse::<Stage>).transpose()?;

            tx.execute(
                "UPDATE leads SET stage = ?1, stage_rank = ?2, stage_changed_at = ?3, updated_at = ?3 \
                 WHERE id = ?4",
                params![target.as_str(), stage_rank(Some(target)), now, id.to_string()],
            )?;
            apply_entry_hooks(&tx, target, id, now)?;
            tx.commit()?;
            Ok(StageWrite {
                previous,
                name,
                assignee,
            })
        })
    }
}

fn apply_entry_hooks(
    tx: &rusqlite::Transaction<'_>,
    stage: Stage,
    id: Uuid,
    now: DateTime<Utc>,
) -> Result<()> {
    for hook in hooks_for(stage) {
        match hook {
            EntryHook::StampLastContacted => {
                tx.execute(
                    "UPDATE leads SET last_contacted_at = ?1 WHERE id = ?2",
                    params![now, id.to_string()],
                )?;
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
