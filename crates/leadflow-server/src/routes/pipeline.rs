use axum::extract::State;
use axum::Json;
use leadflow_core::types::Stage;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/pipeline — stage order and the follow-up rule table.
pub async fn get_pipeline(
    State(app): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let stages: Vec<&str> = Stage::all().iter().map(|s| s.as_str()).collect();
    let followups: serde_json::Map<String, serde_json::Value> = app
        .config
        .followups
        .iter()
        .map(|(stage, rule)| {
            (
                stage.as_str().to_string(),
                serde_json::json!({
                    "delay_days": rule.delay_days,
                    "reason": rule.reason,
                }),
            )
        })
        .collect();

    Ok(Json(serde_json::json!({
        "stages": stages,
        "followups": followups,
    })))
}
