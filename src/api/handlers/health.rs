use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::AppState;

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let connection = *state.connection.borrow();

    if state.commands.is_closed() {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unhealthy", "control": "stopped", "connection": connection })),
        )
    } else {
        (
            StatusCode::OK,
            Json(json!({ "status": "healthy", "connection": connection })),
        )
    }
}
