use axum::extract::{Path, State};
use axum::Json;
use leadflow_core::engine::Outcome;
use leadflow_core::lead::Lead;
use leadflow_core::types::Stage;
use leadflow_core::LeadflowError;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

fn lead_json(lead: &Lead) -> serde_json::Value {
    serde_json::json!({
        "id": lead.id,
        "name": lead.name,
        "company": lead.company,
        "stage": lead.stage.map(Stage::as_str),
        "stage_changed_at": lead.stage_changed_at,
        "last_contacted_at": lead.last_contacted_at,
        "assignee": lead.assignee,
        "created_at": lead.created_at,
        "updated_at": lead.updated_at,
    })
}

/// GET /api/leads — list all leads.
pub async fn list_leads(
    State(app): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let db = app.db.clone();
    let result = tokio::task::spawn_blocking(move || {
        let leads = db.list_leads()?;
        Ok::<_, LeadflowError>(leads.iter().map(lead_json).collect::<Vec<_>>())
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(serde_json::json!(result)))
}

#[derive(serde::Deserialize)]
pub struct CreateLeadBody {
    pub name: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub assignee: Option<String>,
}

/// POST /api/leads — intake a new lead. Stage starts unset; only the engine
/// moves it after this.
pub async fn create_lead(
    State(app): State<AppState>,
    Json(body): Json<CreateLeadBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    if body.name.trim().is_empty() {
        return Err(AppError::bad_request("name must not be empty"));
    }

    let db = app.db.clone();
    let result = tokio::task::spawn_blocking(move || {
        let mut lead = Lead::new(body.name);
        lead.company = body.company;
        lead.assignee = body.assignee;
        db.insert_lead(&lead)?;
        Ok::<_, LeadflowError>(lead_json(&lead))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(result))
}

/// GET /api/leads/:id — full lead detail.
pub async fn get_lead(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let db = app.db.clone();
    let lead = tokio::task::spawn_blocking(move || db.get_lead(id))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    match lead {
        Some(lead) => Ok(Json(lead_json(&lead))),
        None => Err(AppError::not_found(format!("lead '{id}' not found"))),
    }
}

#[derive(serde::Deserialize)]
pub struct AdvanceBody {
    pub stage: String,
    #[serde(default)]
    pub trigger: Option<String>,
}

/// POST /api/leads/:id/advance — forward-only engine path. A rejected
/// transition is a successful no-op response, not an HTTP error.
pub async fn advance_lead(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<AdvanceBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let engine = app.engine.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let target: Stage = body.stage.parse()?;
        let trigger = body.trigger.unwrap_or_else(|| "api".to_string());
        engine.advance(id, target, &trigger)
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    match outcome {
        Outcome::Advanced { from, to } => Ok(Json(serde_json::json!({
            "id": id,
            "advanced": true,
            "from": from.map(Stage::as_str),
            "to": to.as_str(),
        }))),
        Outcome::Rejected { current, target } => Ok(Json(serde_json::json!({
            "id": id,
            "advanced": false,
            "current": current.map(Stage::as_str),
            "target": target.as_str(),
        }))),
        Outcome::NotFound => Err(AppError::not_found(format!("lead '{id}' not found"))),
    }
}

#[derive(serde::Deserialize)]
pub struct OverrideStageBody {
    pub stage: String,
    #[serde(default)]
    pub actor: Option<String>,
}

/// PUT /api/leads/:id/stage — manual correction path, always applies.
pub async fn override_stage(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<OverrideStageBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let engine = app.engine.clone();
    let (target, previous) = tokio::task::spawn_blocking(move || {
        let target: Stage = body.stage.parse()?;
        let actor = body.actor.unwrap_or_else(|| "user".to_string());
        let previous = engine.set_stage(id, target, &actor)?;
        Ok::<_, LeadflowError>((target, previous))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(serde_json::json!({
        "id": id,
        "stage": target.as_str(),
        "previous": previous.map(Stage::as_str),
    })))
}

/// GET /api/leads/:id/activity — audit trail, oldest first.
pub async fn get_activity(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let db = app.db.clone();
    let records = tokio::task::spawn_blocking(move || db.list_activity(id))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    let list: Vec<serde_json::Value> = records
        .iter()
        .map(|a| {
            serde_json::json!({
                "id": a.id,
                "actor": a.actor,
                "action": a.action,
                "metadata": a.metadata,
                "created_at": a.created_at,
            })
        })
        .collect();
    Ok(Json(serde_json::json!(list)))
}
