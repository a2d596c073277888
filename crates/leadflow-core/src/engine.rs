//! The pipeline transition engine.
//!
//! `advance` is the automatic, rule-driven path: forward-only, idempotent by
//! rejection, invoked by user actions, webhook handlers, and scheduled jobs
//! alike. `set_stage` is the interactive correction path: always applies.
//! Past the committed stage write, everything is best-effort — the activity
//! log, the notification, and the follow-up reminder can all fail without
//! the caller ever seeing it.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::activity;
use crate::db::{AdvanceWrite, Db};
use crate::effects::{self, EffectQueue, EffectWorker, TransitionEvent};
use crate::error::Result;
use crate::notify::Notifier;
use crate::rules::FollowUpRules;
use crate::types::Stage;

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Result of an `advance` call.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The stage moved forward.
    Advanced { from: Option<Stage>, to: Stage },
    /// The forward-only guard rejected the target; nothing was written, no
    /// side effect fired. Repeated calls with the same or an earlier stage
    /// land here.
    Rejected {
        current: Option<Stage>,
        target: Stage,
    },
    /// The lead does not exist. Background triggers treat this as skippable;
    /// interactive surfaces may turn it into a 404.
    NotFound,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct Engine {
    db: Arc<Db>,
    effects: EffectQueue,
    worker: EffectWorker,
}

impl Engine {
    pub fn new(db: Arc<Db>, rules: FollowUpRules, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let (effects, worker) = effects::spawn(Arc::clone(&db), rules, notifier)?;
        Ok(Self {
            db,
            effects,
            worker,
        })
    }

    /// Move a lead forward to `target`. The write, the guard, and the entry
    /// hooks are one atomic unit; the activity record and the queued side
    /// effects follow the commit and cannot undo it.
    pub fn advance(&self, lead_id: Uuid, target: Stage, trigger: &str) -> Result<Outcome> {
        let now = Utc::now();
        match self.db.try_advance_stage(lead_id, target, now)? {
            AdvanceWrite::NotFound => Ok(Outcome::NotFound),
            AdvanceWrite::Rejected { current } => Ok(Outcome::Rejected { current, target }),
            AdvanceWrite::Advanced {
                from,
                name,
                assignee,
            } => {
                let metadata = serde_json::json!({
                    "from": from.map(Stage::as_str),
                    "to": target.as_str(),
                    "trigger": trigger,
                });
                if let Err(e) = self.db.append_activity(
                    activity::SYSTEM_ACTOR,
                    activity::AUTO_STAGE_CHANGED,
                    lead_id,
                    &metadata,
                ) {
                    tracing::warn!(lead = %lead_id, error = %e, "activity log write failed after stage change");
                }

                self.effects.enqueue(TransitionEvent {
                    lead_id,
                    lead_name: name,
                    from,
                    to: target,
                    assignee,
                    trigger: trigger.to_string(),
                });

                Ok(Outcome::Advanced { from, to: target })
            }
        }
    }

    /// Manual stage override for interactive corrections: no forward-only
    /// guard, logged under the acting user. Returns the previous stage.
    pub fn set_stage(&self, lead_id: Uuid, target: Stage, actor: &str) -> Result<Option<Stage>> {
        let now = Utc::now();
        let write = self.db.set_stage(lead_id, target, now)?;

        let metadata = serde_json::json!({
            "from": write.previous.map(Stage::as_str),
            "to": target.as_str(),
            "trigger": "manual_override",
        });
        if let Err(e) =
            self.db
                .append_activity(actor, activity::STAGE_CHANGED, lead_id, &metadata)
        {
            tracing::warn!(lead = %lead_id, error = %e, "activity log write failed after stage override");
        }

        self.effects.enqueue(TransitionEvent {
            lead_id,
            lead_name: write.name,
            from: write.previous,
            to: target,
            assignee: write.assignee,
            trigger: "manual_override".to_string(),
        });

        Ok(write.previous)
    }

    /// Drain queued side effects and stop the worker. Call on orderly exit;
    /// dropping the engine instead lets the worker wind down detached.
    pub fn shutdown(self) {
        drop(self.effects);
        self.worker.join();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LeadflowError;
    use crate::lead::Lead;
    use crate::notify::LogNotifier;
    use crate::rules::default_rules;
    use crate::types::ReminderStatus;
    use parking_lot::Mutex;

    struct Recording {
        events: Mutex<Vec<(Option<Stage>, Stage)>>,
    }

    impl Recording {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                events: Mutex::new(Vec::new()),
            })
        }
    }

    impl Notifier for Recording {
        fn notify_stage_change(&self, event: &TransitionEvent) -> Result<()> {
            self.events.lock().push((event.from, event.to));
            Ok(())
        }
    }

    struct Failing;
    impl Notifier for Failing {
        fn notify_stage_change(&self, _event: &TransitionEvent) -> Result<()> {
            Err(LeadflowError::Notify("notifier down".to_string()))
        }
    }

    fn setup(notifier: Arc<dyn Notifier>) -> (Arc<Db>, Engine, Uuid) {
        let db = Arc::new(Db::open_in_memory().unwrap());
        let mut lead = Lead::new("Acme Corp");
        lead.assignee = Some("dana".to_string());
        let id = lead.id;
        db.insert_lead(&lead).unwrap();
        let engine = Engine::new(Arc::clone(&db), default_rules(), notifier).unwrap();
        (db, engine, id)
    }

    #[test]
    fn advance_from_unset_runs_full_pipeline() {
        let recording = Recording::new();
        let (db, engine, id) = setup(recording.clone());

        let outcome = engine.advance(id, Stage::Contacted, "lead_assigned").unwrap();
        assert_eq!(
            outcome,
            Outcome::Advanced {
                from: None,
                to: Stage::Contacted
            }
        );
        engine.shutdown();

        // Stage persisted, activity logged once with the trigger verbatim.
        assert_eq!(
            db.get_lead(id).unwrap().unwrap().stage,
            Some(Stage::Contacted)
        );
        let records = db.list_activity(id).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action, activity::AUTO_STAGE_CHANGED);
        assert_eq!(records[0].actor, "system");
        assert_eq!(records[0].metadata["from"], serde_json::Value::Null);
        assert_eq!(records[0].metadata["to"], "contacted");
        assert_eq!(records[0].metadata["trigger"], "lead_assigned");

        // Notification fired once.
        assert_eq!(
            recording.events.lock().as_slice(),
            &[(None, Stage::Contacted)]
        );

        // Reminder scheduled per the contacted rule, assignee copied.
        let pending = db.find_pending_reminder(id).unwrap().unwrap();
        assert_eq!(pending.reason, "Follow up after initial contact");
        assert_eq!(pending.assignee.as_deref(), Some("dana"));
        let expected_due = pending.created_at + chrono::Duration::days(3);
        assert_eq!(pending.due_at, expected_due);
    }

    #[test]
    fn rejected_transition_has_no_side_effects() {
        let recording = Recording::new();
        let (db, engine, id) = setup(recording.clone());

        engine
            .advance(id, Stage::ContractSigned, "signed")
            .unwrap();
        let outcome = engine.advance(id, Stage::Contacted, "stale").unwrap();
        assert_eq!(
            outcome,
            Outcome::Rejected {
                current: Some(Stage::ContractSigned),
                target: Stage::Contacted
            }
        );
        engine.shutdown();

        assert_eq!(
            db.get_lead(id).unwrap().unwrap().stage,
            Some(Stage::ContractSigned)
        );
        // Only the successful transition logged and notified.
        assert_eq!(db.list_activity(id).unwrap().len(), 1);
        assert_eq!(recording.events.lock().len(), 1);
        // contract_signed has no rule, so no reminder exists either.
        assert!(db.find_pending_reminder(id).unwrap().is_none());
    }

    #[test]
    fn same_stage_is_a_noop() {
        let (db, engine, id) = setup(Recording::new());
        engine.advance(id, Stage::Negotiation, "first").unwrap();
        let outcome = engine.advance(id, Stage::Negotiation, "again").unwrap();
        assert!(matches!(outcome, Outcome::Rejected { .. }));
        engine.shutdown();
        assert_eq!(db.list_activity(id).unwrap().len(), 1);
    }

    #[test]
    fn monotonic_progression_logs_each_step() {
        let (db, engine, id) = setup(Recording::new());
        let steps = [
            Stage::NewLead,
            Stage::Contacted,
            Stage::DiscoveryScheduled,
            Stage::ProposalSent,
            Stage::Retention,
        ];
        for (i, stage) in steps.iter().enumerate() {
            let outcome = engine.advance(id, *stage, "step").unwrap();
            let expected_from = if i == 0 { None } else { Some(steps[i - 1]) };
            assert_eq!(
                outcome,
                Outcome::Advanced {
                    from: expected_from,
                    to: *stage
                }
            );
        }
        engine.shutdown();

        assert_eq!(db.get_lead(id).unwrap().unwrap().stage, Some(Stage::Retention));
        assert_eq!(db.list_activity(id).unwrap().len(), steps.len());
    }

    #[test]
    fn missing_lead_is_reported_not_raised() {
        let (_db, engine, _id) = setup(Recording::new());
        let outcome = engine
            .advance(Uuid::new_v4(), Stage::Contacted, "webhook")
            .unwrap();
        assert_eq!(outcome, Outcome::NotFound);
        engine.shutdown();
    }

    #[test]
    fn reminder_supersession_across_ruled_stages() {
        let (db, engine, id) = setup(Recording::new());
        engine.advance(id, Stage::Contacted, "t1").unwrap();
        engine.advance(id, Stage::DiscoveryCompleted, "t2").unwrap();
        engine.shutdown();

        let all = db.list_reminders_for(id).unwrap();
        let pending: Vec<_> = all
            .iter()
            .filter(|r| r.status == ReminderStatus::Pending)
            .collect();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].reason, "Send proposal after discovery call");
        assert_eq!(
            all.iter()
                .filter(|r| r.status == ReminderStatus::Dismissed)
                .count(),
            1
        );
    }

    #[test]
    fn rule_less_stage_keeps_stale_pending_reminder() {
        let (db, engine, id) = setup(Recording::new());
        engine.advance(id, Stage::Contacted, "t1").unwrap();
        engine.advance(id, Stage::ContractSigned, "t2").unwrap();
        engine.shutdown();

        let pending = db.find_pending_reminder(id).unwrap().unwrap();
        assert_eq!(pending.reason, "Follow up after initial contact");
    }

    #[test]
    fn notifier_failure_does_not_fail_advance() {
        let (db, engine, id) = setup(Arc::new(Failing));
        let outcome = engine.advance(id, Stage::Contacted, "t").unwrap();
        assert!(matches!(outcome, Outcome::Advanced { .. }));
        engine.shutdown();

        // Stage change and reminder both landed despite the dead notifier.
        assert_eq!(
            db.get_lead(id).unwrap().unwrap().stage,
            Some(Stage::Contacted)
        );
        assert!(db.find_pending_reminder(id).unwrap().is_some());
    }

    #[test]
    fn manual_override_moves_backward_and_logs_actor() {
        let recording = Recording::new();
        let (db, engine, id) = setup(recording.clone());
        engine.advance(id, Stage::ContractSigned, "signed").unwrap();

        let previous = engine.set_stage(id, Stage::Contacted, "alice").unwrap();
        assert_eq!(previous, Some(Stage::ContractSigned));
        engine.shutdown();

        assert_eq!(
            db.get_lead(id).unwrap().unwrap().stage,
            Some(Stage::Contacted)
        );
        let records = db.list_activity(id).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].action, activity::STAGE_CHANGED);
        assert_eq!(records[1].actor, "alice");
        assert_eq!(records[1].metadata["from"], "contract_signed");
    }

    #[test]
    fn manual_override_missing_lead_errors() {
        let (_db, engine, _id) = setup(Recording::new());
        let err = engine.set_stage(Uuid::new_v4(), Stage::Contacted, "alice");
        assert!(matches!(err, Err(LeadflowError::LeadNotFound(_))));
        engine.shutdown();
    }
}
