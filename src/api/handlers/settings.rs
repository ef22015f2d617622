use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::errors::ApiError;
use crate::execution::ControlCommand;
use crate::services::AlertSettings;
use crate::AppState;

/// GET /api/settings
pub async fn get_settings(State(state): State<AppState>) -> Json<AlertSettings> {
    Json(state.status.borrow().settings.clone())
}

/// PUT /api/settings — Replace alert settings. Missing keys take their
/// defaults; out-of-range values are clamped.
pub async fn update_settings(
    State(state): State<AppState>,
    body: Result<Json<AlertSettings>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(settings) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let settings = settings.sanitized();

    state
        .commands
        .send(ControlCommand::UpdateSettings(settings.clone()))
        .await?;

    Ok(Json(json!({ "success": true, "data": settings })))
}
