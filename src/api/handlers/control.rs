use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::errors::ApiError;
use crate::execution::ControlCommand;
use crate::AppState;

async fn send(state: &AppState, cmd: ControlCommand) -> Result<(), ApiError> {
    state.commands.send(cmd).await?;
    Ok(())
}

/// POST /api/connect — Start the feed connection (saves settings first).
pub async fn connect(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    send(&state, ControlCommand::Connect).await?;
    tracing::info!("Connect requested via control API");
    Ok(Json(json!({ "success": true, "status": "connecting" })))
}

/// POST /api/disconnect — Stop the feed connection; no further retries.
pub async fn disconnect(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    send(&state, ControlCommand::Disconnect).await?;
    tracing::info!("Disconnect requested via control API");
    Ok(Json(json!({ "success": true, "status": "disconnected" })))
}

/// POST /api/popup/dismiss — Close the live popup, if any.
pub async fn dismiss_popup(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    send(&state, ControlCommand::DismissPopup).await?;
    Ok(Json(json!({ "success": true })))
}

/// POST /api/test/sound — Play the configured sound once.
pub async fn test_sound(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    send(&state, ControlCommand::TestSound).await?;
    Ok(Json(json!({ "success": true })))
}

/// POST /api/test/signal — Push a synthetic EUR/USD alert through dispatch.
pub async fn test_signal(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    send(&state, ControlCommand::TestSignal).await?;
    Ok(Json(json!({ "success": true })))
}

/// GET /api/status — Connection state, alert counter, live popup and settings.
pub async fn status(State(state): State<AppState>) -> Json<Value> {
    let connection = *state.connection.borrow();
    let status = state.status.borrow().clone();

    Json(json!({
        "connection": connection,
        "alert_count": status.alert_count,
        "last_alert_at": status.last_alert_at,
        "payout_pairs": status.payout_pairs,
        "popup": status.popup,
        "settings": status.settings,
        "min_payout": state.thresholds.min_payout,
        "min_popup_win_rate": state.thresholds.min_popup_win_rate,
    }))
}
