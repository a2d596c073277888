//! Post-commit side-effect dispatch.
//!
//! Notification and reminder scheduling run on a dedicated worker thread fed
//! by a bounded channel. The caller of `advance` never waits on them and
//! never sees their failures; failures surface in the log instead of being
//! silently discarded. Shutdown drains the queue before joining so queued
//! effects are not orphaned at process exit.

use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread;

use uuid::Uuid;

use crate::db::Db;
use crate::error::Result;
use crate::notify::Notifier;
use crate::reminder;
use crate::rules::FollowUpRules;
use crate::types::Stage;

/// A committed stage change, queued for notification and reminder
/// scheduling.
#[derive(Debug, Clone)]
pub struct TransitionEvent {
    pub lead_id: Uuid,
    pub lead_name: String,
    pub from: Option<Stage>,
    pub to: Stage,
    pub assignee: Option<String>,
    pub trigger: String,
}

const QUEUE_DEPTH: usize = 256;

// ---------------------------------------------------------------------------
// EffectQueue / EffectWorker
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct EffectQueue {
    tx: SyncSender<TransitionEvent>,
}

impl EffectQueue {
    /// Non-blocking enqueue. A full or closed queue drops the event with a
    /// warning; the stage change itself has already committed.
    pub fn enqueue(&self, event: TransitionEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(ev)) => {
                tracing::warn!(lead = %ev.lead_id, to = %ev.to, "side-effect queue full, dropping event");
            }
            Err(TrySendError::Disconnected(ev)) => {
                tracing::warn!(lead = %ev.lead_id, to = %ev.to, "side-effect worker stopped, dropping event");
            }
        }
    }
}

pub struct EffectWorker {
    handle: thread::JoinHandle<()>,
}

impl EffectWorker {
    /// Wait for the worker to finish. All `EffectQueue` clones must be
    /// dropped first or this blocks forever.
    pub fn join(self) {
        if self.handle.join().is_err() {
            tracing::error!("side-effect worker panicked");
        }
    }
}

/// Spawn the worker thread. Dropping every `EffectQueue` clone drains and
/// stops it.
pub fn spawn(
    db: Arc<Db>,
    rules: FollowUpRules,
    notifier: Arc<dyn Notifier>,
) -> Result<(EffectQueue, EffectWorker)> {
    let (tx, rx) = sync_channel(QUEUE_DEPTH);
    let handle = thread::Builder::new()
        .name("leadflow-effects".to_string())
        .spawn(move || run(rx, db, rules, notifier))?;
    Ok((EffectQueue { tx }, EffectWorker { handle }))
}

fn run(
    rx: Receiver<TransitionEvent>,
    db: Arc<Db>,
    rules: FollowUpRules,
    notifier: Arc<dyn Notifier>,
) {
    while let Ok(event) = rx.recv() {
        if let Err(e) = notifier.notify_stage_change(&event) {
            tracing::warn!(lead = %event.lead_id, to = %event.to, error = %e, "stage-change notification failed");
        }
        if let Err(e) = reminder::schedule_if_applicable(
            &db,
            &rules,
            event.lead_id,
            event.to,
            event.assignee.as_deref(),
            chrono::Utc::now(),
        ) {
            tracing::warn!(lead = %event.lead_id, to = %event.to, error = %e, "follow-up scheduling failed");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
