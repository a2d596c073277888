use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::Db;
use crate::error::Result;

/// Actor recorded for engine-driven transitions.
pub const SYSTEM_ACTOR: &str = "system";

/// Action name for automatic (rule-driven) stage changes.
pub const AUTO_STAGE_CHANGED: &str = "lead.auto_stage_changed";

/// Action name for manual stage overrides.
pub const STAGE_CHANGED: &str = "lead.stage_changed";

// ---------------------------------------------------------------------------
// Activity
// ---------------------------------------------------------------------------

/// Append-only audit record. Never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: i64,
    pub actor: String,
    pub action: String,
    pub lead_id: Uuid,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl Activity {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let lead_id: String = row.get(3)?;
        let lead_id = Uuid::parse_str(&lead_id)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;
        let metadata: String = row.get(4)?;
        let metadata = serde_json::from_str(&metadata)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;
        Ok(Self {
            id: row.get(0)?,
            actor: row.get(1)?,
            action: row.get(2)?,
            lead_id,
            metadata,
            created_at: row.get(5)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Store operations
// ---------------------------------------------------------------------------

impl Db {
    pub fn append_activity(
        &self,
        actor: &str,
        action: &str,
        lead_id: Uuid,
        metadata: &serde_json::Value,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO activities (actor, action, lead_id, metadata, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    actor,
                    action,
                    lead_id.to_string(),
                    metadata.to_string(),
                    Utc::now(),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Activity for one lead, oldest first.
    pub fn list_activity(&self, lead_id: Uuid) -> Result<Vec<Activity>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, actor, action, lead_id, metadata, created_at \
                 FROM activities WHERE lead_id = ?1 ORDER BY id",
            )?;
            let records = stmt
                .query_map(params![lead_id.to_string()], Activity::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(records)
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lead::Lead;

    #[test]
    fn append_and_list() {
        let db = Db::open_in_memory().unwrap();
        let lead = Lead::new("Acme");
        db.insert_lead(&lead).unwrap();

        let metadata = serde_json::json!({"from": null, "to": "contacted", "trigger": "t"});
        db.append_activity(SYSTEM_ACTOR, AUTO_STAGE_CHANGED, lead.id, &metadata)
            .unwrap();

        let records = db.list_activity(lead.id).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].actor, "system");
        assert_eq!(records[0].action, AUTO_STAGE_CHANGED);
        assert_eq!(records[0].metadata["to"], "contacted");
    }

    #[test]
    fn list_is_scoped_to_lead() {
        let db = Db::open_in_memory().unwrap();
        let a = Lead::new("A");
        let b = Lead::new("B");
        db.insert_lead(&a).unwrap();
        db.insert_lead(&b).unwrap();

        let meta = serde_json::json!({});
        db.append_activity(SYSTEM_ACTOR, AUTO_STAGE_CHANGED, a.id, &meta)
            .unwrap();
        db.append_activity(SYSTEM_ACTOR, AUTO_STAGE_CHANGED, a.id, &meta)
            .unwrap();

        assert_eq!(db.list_activity(a.id).unwrap().len(), 2);
        assert!(db.list_activity(b.id).unwrap().is_empty());
    }

    #[test]
    fn records_come_back_oldest_first() {
        let db = Db::open_in_memory().unwrap();
        let lead = Lead::new("Acme");
        db.insert_lead(&lead).unwrap();

        for action in ["one", "two", "three"] {
            db.append_activity(SYSTEM_ACTOR, action, lead.id, &serde_json::json!({}))
                .unwrap();
        }
        let actions: Vec<String> = db
            .list_activity(lead.id)
            .unwrap()
            .into_iter()
            .map(|a| a.action)
            .collect();
        assert_eq!(actions, vec!["one", "two", "three"]);
    }
}
