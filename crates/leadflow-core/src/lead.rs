use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::Db;
use crate::error::Result;
use crate::types::Stage;

// ---------------------------------------------------------------------------
// Lead
// ---------------------------------------------------------------------------

/// A trackable entity in the pipeline. `stage` is `None` until the lead first
/// enters the pipeline; the transition engine owns all stage mutations after
/// that.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    pub stage: Option<Stage>,
    pub stage_changed_at: Option<DateTime<Utc>>,
    pub last_contacted_at: Option<DateTime<Utc>>,
    pub assignee: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            company: None,
            stage: None,
            stage_changed_at: None,
            last_contacted_at: None,
            assignee: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let id: String = row.get(0)?;
        let id = Uuid::parse_str(&id)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?;
        let stage: Option<String> = row.get(3)?;
        let stage = stage
            .as_deref()
            .map(str::parse::<Stage>)
            .transpose()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;
        Ok(Self {
            id,
            name: row.get(1)?,
            company: row.get(2)?,
            stage,
            stage_changed_at: row.get(4)?,
            last_contacted_at: row.get(5)?,
            assignee: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }
}

const LEAD_COLUMNS: &str = "id, name, company, stage, stage_changed_at, last_contacted_at, \
                            assignee, created_at, updated_at";

// ---------------------------------------------------------------------------
// Store operations
// ---------------------------------------------------------------------------

impl Db {
    pub fn insert_lead(&self, lead: &Lead) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO leads (id, name, company, stage, stage_rank, stage_changed_at, \
                 last_contacted_at, assignee, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    lead.id.to_string(),
                    lead.name,
                    lead.company,
                    lead.stage.map(Stage::as_str),
                    crate::types::stage_rank(lead.stage),
                    lead.stage_changed_at,
                    lead.last_contacted_at,
                    lead.assignee,
                    lead.created_at,
                    lead.updated_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_lead(&self, id: Uuid) -> Result<Option<Lead>> {
        self.with_conn(|conn| {
            let lead = conn
                .query_row(
                    &format!("SELECT {LEAD_COLUMNS} FROM leads WHERE id = ?1"),
                    params![id.to_string()],
                    Lead::from_row,
                )
                .optional()?;
            Ok(lead)
        })
    }

    pub fn list_leads(&self) -> Result<Vec<Lead>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {LEAD_COLUMNS} FROM leads ORDER BY created_at"))?;
            let leads = stmt
                .query_map([], Lead::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(leads)
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get_roundtrip() {
        let db = Db::open_in_memory().unwrap();
        let mut lead = Lead::new("Acme Corp");
        lead.company = Some("Acme".to_string());
        lead.assignee = Some("dana".to_string());
        db.insert_lead(&lead).unwrap();

        let loaded = db.get_lead(lead.id).unwrap().unwrap();
        assert_eq!(loaded.name, "Acme Corp");
        assert_eq!(loaded.company.as_deref(), Some("Acme"));
        assert_eq!(loaded.assignee.as_deref(), Some("dana"));
        assert_eq!(loaded.stage, None);
        assert_eq!(loaded.created_at, lead.created_at);
    }

    #[test]
    fn get_missing_lead_is_none() {
        let db = Db::open_in_memory().unwrap();
        assert!(db.get_lead(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn list_orders_by_creation() {
        let db = Db::open_in_memory().unwrap();
        let mut first = Lead::new("First");
        first.created_at = Utc::now() - chrono::Duration::minutes(5);
        let second = Lead::new("Second");
        db.insert_lead(&second).unwrap();
        db.insert_lead(&first).unwrap();

        let names: Vec<String> = db
            .list_leads()
            .unwrap()
            .into_iter()
            .map(|l| l.name)
            .collect();
        assert_eq!(names, vec!["First".to_string(), "Second".to_string()]);
    }

    #[test]
    fn stage_survives_roundtrip() {
        let db = Db::open_in_memory().unwrap();
        let lead = Lead::new("Acme");
        db.insert_lead(&lead).unwrap();
        db.try_advance_stage(lead.id, Stage::Contacted, Utc::now())
            .unwrap();
        let loaded = db.get_lead(lead.id).unwrap().unwrap();
        assert_eq!(loaded.stage, Some(Stage::Contacted));
    }
}
