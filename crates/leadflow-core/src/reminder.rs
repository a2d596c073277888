//! Follow-up reminders and the scheduling rule applied on stage entry.
//!
//! Invariant: at most one `pending` reminder per lead. The scheduler
//! dismisses any outstanding pending reminder and inserts the replacement in
//! a single transaction, and a partial unique index on
//! `reminders(lead_id) WHERE status = 'pending'` backstops the invariant at
//! the schema level.

use chrono::{DateTime, Duration, Utc};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::Db;
use crate::error::{LeadflowError, Result};
use crate::rules::FollowUpRules;
use crate::types::{ReminderStatus, Stage};

// ---------------------------------------------------------------------------
// Reminder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    pub id: Uuid,
    pub lead_id: Uuid,
    /// Copied from the lead at scheduling time, not re-resolved later.
    pub assignee: Option<String>,
    pub due_at: DateTime<Utc>,
    pub status: ReminderStatus,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl Reminder {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let id: String = row.get(0)?;
        let id = Uuid::parse_str(&id)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?;
        let lead_id: String = row.get(1)?;
        let lead_id = Uuid::parse_str(&lead_id)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;
        let status: String = row.get(4)?;
        let status = status
            .parse::<ReminderStatus>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;
        Ok(Self {
            id,
            lead_id,
            assignee: row.get(2)?,
            due_at: row.get(3)?,
            status,
            reason: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}

const REMINDER_COLUMNS: &str = "id, lead_id, assignee, due_at, status, reason, created_at";

// ---------------------------------------------------------------------------
// Scheduling
// ---------------------------------------------------------------------------

/// Consult the rule table for the stage just entered. No rule, no reminder —
/// and any pending reminder from an earlier stage is left untouched. With a
/// rule, supersede the outstanding pending reminder (if any) and insert the
/// new one.
pub fn schedule_if_applicable(
    db: &Db,
    rules: &FollowUpRules,
    lead_id: Uuid,
    stage: Stage,
    assignee: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Option<Reminder>> {
    let Some(rule) = rules.rule_for(stage) else {
        return Ok(None);
    };
    let reminder = Reminder {
        id: Uuid::new_v4(),
        lead_id,
        assignee: assignee.map(str::to_string),
        due_at: now + Duration::days(i64::from(rule.delay_days)),
        status: ReminderStatus::Pending,
        reason: rule.reason.clone(),
        created_at: now,
    };
    db.replace_pending_reminder(&reminder)?;
    Ok(Some(reminder))
}

// ---------------------------------------------------------------------------
// Store operations
// ---------------------------------------------------------------------------

impl Db {
    /// Dismiss any pending reminder for the lead and insert `reminder`, as
    /// one transaction.
    pub fn replace_pending_reminder(&self, reminder: &Reminder) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "UPDATE reminders SET status = 'dismissed' WHERE lead_id = ?1 AND status = 'pending'",
                params![reminder.lead_id.to_string()],
            )?;
            tx.execute(
                "INSERT INTO reminders (id, lead_id, assignee, due_at, status, reason, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    reminder.id.to_string(),
                    reminder.lead_id.to_string(),
                    reminder.assignee,
                    reminder.due_at,
                    reminder.status.as_str(),
                    reminder.reason,
                    reminder.created_at,
                ],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn find_pending_reminder(&self, lead_id: Uuid) -> Result<Option<Reminder>> {
        self.with_conn(|conn| {
            let reminder = conn
                .query_row(
                    &format!(
                        "SELECT {REMINDER_COLUMNS} FROM reminders \
                         WHERE lead_id = ?1 AND status = 'pending'"
                    ),
                    params![lead_id.to_string()],
                    Reminder::from_row,
                )
                .optional()?;
            Ok(reminder)
        })
    }

    /// All reminders for one lead, newest first.
    pub fn list_reminders_for(&self, lead_id: Uuid) -> Result<Vec<Reminder>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {REMINDER_COLUMNS} FROM reminders \
                 WHERE lead_id = ?1 ORDER BY created_at DESC"
            ))?;
            let reminders = stmt
                .query_map(params![lead_id.to_string()], Reminder::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(reminders)
        })
    }

    /// Pending reminders due by `now`, soonest first. The email-send sweep
    /// reads from here.
    pub fn list_due_reminders(&self, now: DateTime<Utc>) -> Result<Vec<Reminder>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {REMINDER_COLUMNS} FROM reminders \
                 WHERE status = 'pending' AND due_at <= ?1 ORDER BY due_at"
            ))?;
            let reminders = stmt
                .query_map(params![now], Reminder::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(reminders)
        })
    }

    pub fn mark_reminder_sent(&self, id: Uuid) -> Result<()> {
        self.set_reminder_status(id, ReminderStatus::Sent)
    }

    pub fn dismiss_reminder(&self, id: Uuid) -> Result<()> {
        self.set_reminder_status(id, ReminderStatus::Dismissed)
    }

    fn set_reminder_status(&self, id: Uuid, status: ReminderStatus) -> Result<()> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE reminders SET status = ?1 WHERE id = ?2",
                params![status.as_str(), id.to_string()],
            )?;
            if changed == 0 {
                return Err(LeadflowError::ReminderNotFound(id));
            }
            Ok(())
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
    use crate::rules::default_rules;

    fn db_with_lead() -> (Db, Uuid) {
        let db = Db::open_in_memory().unwrap();
        let mut lead = Lead::new("Acme");
        lead.assignee = Some("dana".to_string());
        let id = lead.id;
        db.insert_lead(&lead).unwrap();
        (db, id)
    }

    #[test]
    fn no_rule_schedules_nothing() {
        let (db, id) = db_with_lead();
        let rules = default_rules();
        let scheduled = schedule_if_applicable(
            &db,
            &rules,
            id,
            Stage::DiscoveryScheduled,
            Some("dana"),
            Utc::now(),
        )
        .unwrap();
        assert!(scheduled.is_none());
        assert!(db.find_pending_reminder(id).unwrap().is_none());
    }

    #[test]
    fn rule_schedules_pending_reminder() {
        let (db, id) = db_with_lead();
        let now = Utc::now();
        let scheduled =
            schedule_if_applicable(&db, &default_rules(), id, Stage::Contacted, Some("dana"), now)
                .unwrap()
                .unwrap();
        assert_eq!(scheduled.status, ReminderStatus::Pending);
        assert_eq!(scheduled.reason, "Follow up after initial contact");
        assert_eq!(scheduled.due_at, now + Duration::days(3));
        assert_eq!(scheduled.assignee.as_deref(), Some("dana"));

        let pending = db.find_pending_reminder(id).unwrap().unwrap();
        assert_eq!(pending.id, scheduled.id);
    }

    #[test]
    fn supersession_replaces_pending() {
        let (db, id) = db_with_lead();
        let rules = default_rules();
        let now = Utc::now();
        let first = schedule_if_applicable(&db, &rules, id, Stage::Contacted, None, now)
            .unwrap()
            .unwrap();
        let second =
            schedule_if_applicable(&db, &rules, id, Stage::DiscoveryCompleted, None, now)
                .unwrap()
                .unwrap();

        let pending = db.find_pending_reminder(id).unwrap().unwrap();
        assert_eq!(pending.id, second.id);
        assert_eq!(pending.reason, "Send proposal after discovery call");
        assert_eq!(pending.due_at, now + Duration::days(2));

        let all = db.list_reminders_for(id).unwrap();
        assert_eq!(all.len(), 2);
        let dismissed = all.iter().find(|r| r.id == first.id).unwrap();
        assert_eq!(dismissed.status, ReminderStatus::Dismissed);
    }

    #[test]
    fn rule_less_stage_leaves_earlier_pending_untouched() {
        let (db, id) = db_with_lead();
        let rules = default_rules();
        let first = schedule_if_applicable(&db, &rules, id, Stage::Contacted, None, Utc::now())
            .unwrap()
            .unwrap();

        // contract_signed has no rule; the stale reminder survives.
        let scheduled =
            schedule_if_applicable(&db, &rules, id, Stage::ContractSigned, None, Utc::now())
                .unwrap();
        assert!(scheduled.is_none());
        let pending = db.find_pending_reminder(id).unwrap().unwrap();
        assert_eq!(pending.id, first.id);
    }

    #[test]
    fn due_listing_honors_boundary() {
        let (db, id) = db_with_lead();
        let mut rules = FollowUpRules::empty();
        rules.insert(
            Stage::Contacted,
            crate::rules::FollowUpRule {
                delay_days: 0,
                reason: "today".to_string(),
            },
        );
        let now = Utc::now();
        schedule_if_applicable(&db, &rules, id, Stage::Contacted, None, now).unwrap();

        assert_eq!(db.list_due_reminders(now).unwrap().len(), 1);
        assert!(db
            .list_due_reminders(now - Duration::seconds(1))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn sent_and_dismissed_leave_due_listing() {
        let (db, id) = db_with_lead();
        let mut rules = FollowUpRules::empty();
        rules.insert(
            Stage::Contacted,
            crate::rules::FollowUpRule {
                delay_days: 0,
                reason: "today".to_string(),
            },
        );
        let now = Utc::now();
        let reminder = schedule_if_applicable(&db, &rules, id, Stage::Contacted, None, now)
            .unwrap()
            .unwrap();

        db.mark_reminder_sent(reminder.id).unwrap();
        assert!(db.list_due_reminders(now).unwrap().is_empty());
        assert!(db.find_pending_reminder(id).unwrap().is_none());
    }

    #[test]
    fn unknown_reminder_status_change_errors() {
        let (db, _id) = db_with_lead();
        assert!(matches!(
            db.mark_reminder_sent(Uuid::new_v4()),
            Err(LeadflowError::ReminderNotFound(_))
        ));
        assert!(matches!(
            db.dismiss_reminder(Uuid::new_v4()),
            Err(LeadflowError::ReminderNotFound(_))
        ));
    }
}
