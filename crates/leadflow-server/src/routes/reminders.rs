use axum::extract::{Path, State};
use axum::Json;
use leadflow_core::reminder::Reminder;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

fn reminder_json(reminder: &Reminder) -> serde_json::Value {
    serde_json::json!({
        "id": reminder.id,
        "lead_id": reminder.lead_id,
        "assignee": reminder.assignee,
        "due_at": reminder.due_at,
        "status": reminder.status.as_str(),
        "reason": reminder.reason,
        "created_at": reminder.created_at,
    })
}

/// GET /api/leads/:id/reminders — all reminders for one lead, newest first.
pub async fn list_for_lead(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let db = app.db.clone();
    let reminders = tokio::task::spawn_blocking(move || db.list_reminders_for(id))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    let list: Vec<serde_json::Value> = reminders.iter().map(reminder_json).collect();
    Ok(Json(serde_json::json!(list)))
}

/// GET /api/reminders/due — pending reminders due now, soonest first.
pub async fn list_due(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let db = app.db.clone();
    let reminders = tokio::task::spawn_blocking(move || db.list_due_reminders(chrono::Utc::now()))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    let list: Vec<serde_json::Value> = reminders.iter().map(reminder_json).collect();
    Ok(Json(serde_json::json!(list)))
}

/// POST /api/reminders/:id/dismiss — user dismissal.
pub async fn dismiss(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let db = app.db.clone();
    tokio::task::spawn_blocking(move || db.dismiss_reminder(id))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(Json(serde_json::json!({ "id": id, "status": "dismissed" })))
}

/// POST /api/reminders/:id/sent — recorded by the email-send flow once the
/// follow-up actually went out.
pub async fn mark_sent(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let db = app.db.clone();
    tokio::task::spawn_blocking(move || db.mark_reminder_sent(id))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(Json(serde_json::json!({ "id": id, "status": "sent" })))
}
