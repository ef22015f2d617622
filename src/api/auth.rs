use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::errors::ApiError;
use crate::AppState;

/// Bearer-token check for the control routes.
///
/// With no token configured every request passes. Otherwise the request must
/// carry `Authorization: Bearer <token>`.
pub async fn require_auth(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(expected) = state.api_token.as_deref().filter(|t| !t.is_empty()) else {
        return next.run(req).await;
    };

    let presented = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match presented {
        Some(token) if token == expected => next.run(req).await,
        _ => ApiError::Unauthorized.into_response(),
    }
}
